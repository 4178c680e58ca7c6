#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the problem map application.
//!
//! Thin HTTP glue over the engine: report ingestion, statistics, the
//! density map, and cached analyses. All state lives in one [`AppState`]
//! built at startup.

mod error;
mod handlers;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use problem_map_ai::{TextGenerator, create_provider_from_env};
use problem_map_analysis::{AnalysisCache, AnalysisConfig};
use problem_map_database::{PostgisStore, ProblemStore, db, run_migrations};
use problem_map_density::DensityMapCache;
use problem_map_spatial::SwapRepair;

pub use error::ApiError;

/// Districts used for the pop forecast when a request names none.
pub const DEFAULT_POP_DISTRICTS: (i64, i64) = (3_072_217, 3_390_291);

/// Shared application state.
pub struct AppState {
    /// Report and district store.
    pub store: Arc<dyn ProblemStore>,
    /// Per-scope analysis cache.
    pub analysis: Arc<AnalysisCache>,
    /// Density map snapshot.
    pub density: DensityMapCache,
    /// Coordinate swap repair applied to new reports.
    pub swap_repair: SwapRepair,
    /// Default pair of districts for the pop forecast.
    pub pop_districts: (i64, i64),
}

impl AppState {
    /// Wires the engine components over one store and one generator.
    #[must_use]
    pub fn new(
        store: Arc<dyn ProblemStore>,
        generator: Arc<dyn TextGenerator>,
        config: AnalysisConfig,
        swap_repair: SwapRepair,
        pop_districts: (i64, i64),
    ) -> Self {
        Self {
            analysis: Arc::new(AnalysisCache::new(store.clone(), generator, config)),
            density: DensityMapCache::new(store.clone()),
            store,
            swap_repair,
            pop_districts,
        }
    }
}

/// Parses `POP_DISTRICTS` (`"3072217,3390291"`).
fn parse_pop_districts(value: &str) -> Option<(i64, i64)> {
    let (first, second) = value.split_once(',')?;
    Some((first.trim().parse().ok()?, second.trim().parse().ok()?))
}

/// Registers the `/api` routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .route("/categories", web::get().to(handlers::categories))
            .route("/heatmap", web::get().to(handlers::heatmap))
            .route("/heatmap", web::post().to(handlers::pop_analysis))
            .route(
                "/analysis/district/{id}",
                web::get().to(handlers::district_analysis),
            )
            .route(
                "/analysis/category/{id}",
                web::get().to(handlers::category_analysis),
            )
            .route("/analysis/city", web::get().to(handlers::city_analysis))
            .route(
                "/stats/district/{id}",
                web::get().to(handlers::district_stats),
            )
            .route(
                "/stats/category/{id}",
                web::get().to(handlers::category_stats),
            )
            .route("/stats/city", web::get().to(handlers::city_stats))
            .route("/problems", web::post().to(handlers::create_problem))
            .route("/problems/{id}", web::get().to(handlers::problem))
            .route(
                "/districts/{id}/problems",
                web::get().to(handlers::district_problems),
            ),
    );
}

/// Starts the problem map API server.
///
/// Connects to the `PostGIS` database, runs migrations, creates the text
/// generation provider, and starts the Actix-Web HTTP server. The caller
/// provides the async runtime (e.g. via `#[actix_web::main]`).
///
/// # Errors
///
/// Returns an `std::io::Result` error if the database connection,
/// migrations, or provider setup fail, or if the HTTP server fails to bind
/// or encounters a runtime error.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> std::io::Result<()> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    log::info!("Connecting to database...");
    let db_conn = db::connect_from_env()
        .await
        .map_err(|e| std::io::Error::other(format!("Failed to connect to database: {e}")))?;

    log::info!("Running migrations...");
    run_migrations(db_conn.as_ref())
        .await
        .map_err(|e| std::io::Error::other(format!("Failed to run migrations: {e}")))?;

    let generator = create_provider_from_env()
        .map_err(|e| std::io::Error::other(format!("Failed to create AI provider: {e}")))?;

    let pop_districts = std::env::var("POP_DISTRICTS")
        .ok()
        .and_then(|v| parse_pop_districts(&v))
        .unwrap_or(DEFAULT_POP_DISTRICTS);

    let state = web::Data::new(AppState::new(
        Arc::new(PostgisStore::new(db_conn)),
        Arc::from(generator),
        AnalysisConfig::from_env(),
        SwapRepair::from_env(),
        pop_districts,
    ));

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((bind_addr, port))?
    .run()
    .await
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use actix_web::http::StatusCode;
    use actix_web::test;
    use geo::{LineString, MultiPolygon, Polygon};
    use problem_map_ai::{AiError, GenerationRequest, ResponseSchema};
    use problem_map_database::MemoryStore;
    use problem_map_server_models::{ApiCategory, ApiProblem};

    use super::*;

    struct CannedGenerator;

    #[async_trait::async_trait]
    impl TextGenerator for CannedGenerator {
        async fn generate(&self, request: &GenerationRequest) -> Result<String, AiError> {
            Ok(match request.schema {
                ResponseSchema::Extended => {
                    r#"{"extended_answer": "Roads need attention.", "status": "ok"}"#
                }
                ResponseSchema::Brief => r#"{"brief_answer": "expected: potholes, high"}"#,
            }
            .to_string())
        }
    }

    fn square(min_x: f64, min_y: f64, size: f64) -> MultiPolygon<f64> {
        let ring = LineString::from(vec![
            (min_x, min_y),
            (min_x + size, min_y),
            (min_x + size, min_y + size),
            (min_x, min_y + size),
            (min_x, min_y),
        ]);
        MultiPolygon(vec![Polygon::new(ring, vec![])])
    }

    fn state() -> web::Data<AppState> {
        let store = MemoryStore::new();
        store.add_district(3_072_217, "Almaly", square(76.90, 43.20, 0.05));
        store.add_district(3_390_291, "Bostandyk", square(76.85, 43.15, 0.05));

        web::Data::new(AppState::new(
            Arc::new(store),
            Arc::new(CannedGenerator),
            AnalysisConfig {
                pop_timeout: Duration::from_secs(5),
                ..AnalysisConfig::default()
            },
            SwapRepair::default(),
            DEFAULT_POP_DISTRICTS,
        ))
    }

    macro_rules! app {
        () => {
            test::init_service(App::new().app_data(state()).configure(configure)).await
        };
    }

    #[::core::prelude::v1::test]
    fn parses_pop_districts() {
        assert_eq!(parse_pop_districts("1, 2"), Some((1, 2)));
        assert_eq!(parse_pop_districts("1"), None);
        assert_eq!(parse_pop_districts("a,2"), None);
    }

    #[actix_web::test]
    async fn health_and_categories() {
        let app = app!();

        let resp = test::call_service(&app, test::TestRequest::get().uri("/api/health").to_request())
            .await;
        assert_eq!(resp.status(), StatusCode::OK);

        let categories: Vec<ApiCategory> = test::call_and_read_body_json(
            &app,
            test::TestRequest::get().uri("/api/categories").to_request(),
        )
        .await;
        assert_eq!(categories.len(), 4);
        assert_eq!(categories[0].name, "Housing & utilities");
    }

    #[actix_web::test]
    async fn created_problem_can_be_read_back() {
        let app = app!();

        let req = test::TestRequest::post()
            .uri("/api/problems")
            .set_json(serde_json::json!({
                "longitude": 76.92,
                "latitude": 43.22,
                "name": "Broken bench",
                "categoryId": 3,
                "importance": 4
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created: ApiProblem = test::read_body_json(resp).await;
        assert_eq!(created.district_id, 3_072_217);
        assert_eq!(created.status, problem_map_problem_models::ProblemStatus::Created);

        let fetched: ApiProblem = test::call_and_read_body_json(
            &app,
            test::TestRequest::get()
                .uri(&format!("/api/problems/{}", created.id))
                .to_request(),
        )
        .await;
        assert_eq!(fetched, created);

        let listed: Vec<ApiProblem> = test::call_and_read_body_json(
            &app,
            test::TestRequest::get()
                .uri("/api/districts/3072217/problems")
                .to_request(),
        )
        .await;
        assert_eq!(listed, vec![created]);
    }

    #[actix_web::test]
    async fn validation_errors_are_400_with_timestamp() {
        let app = app!();

        let req = test::TestRequest::post()
            .uri("/api/problems")
            .set_json(serde_json::json!({
                "longitude": 76.92,
                "latitude": 43.22,
                "name": "Broken bench",
                "categoryId": 99
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert!(body["message"].as_str().unwrap().contains("unknown category"));
        assert!(body["time"].as_str().is_some());
    }

    #[actix_web::test]
    async fn point_outside_every_district_is_404() {
        let app = app!();

        let req = test::TestRequest::post()
            .uri("/api/problems")
            .set_json(serde_json::json!({
                "longitude": 10.0,
                "latitude": 10.0,
                "name": "Pothole",
                "categoryId": 2
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn unknown_scopes_are_404() {
        let app = app!();

        for uri in [
            "/api/analysis/district/42",
            "/api/analysis/category/99",
            "/api/stats/district/42",
            "/api/stats/category/0",
            "/api/problems/1",
        ] {
            let resp = test::call_service(&app, test::TestRequest::get().uri(uri).to_request())
                .await;
            assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{uri}");
        }
    }

    #[actix_web::test]
    async fn analysis_and_stats_endpoints() {
        let app = app!();

        let analysis: serde_json::Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get().uri("/api/analysis/city").to_request(),
        )
        .await;
        assert_eq!(analysis["text"], "Roads need attention.");
        assert_eq!(analysis["scope"]["kind"], "city");

        let stats: serde_json::Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get().uri("/api/stats/city").to_request(),
        )
        .await;
        assert_eq!(stats["count"], 0);

        let resp = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/api/stats/district/3072217?category=9")
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn heatmap_and_pop_forecast() {
        let app = app!();

        let map: serde_json::Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get().uri("/api/heatmap").to_request(),
        )
        .await;
        assert_eq!(map["max_points"], 0);

        let pop: serde_json::Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::post().uri("/api/heatmap").to_request(),
        )
        .await;
        assert_eq!(pop["first"]["text"], "expected: potholes, high");
        assert_eq!(pop["second"]["scope"]["id"], 3_390_291);
    }
}
