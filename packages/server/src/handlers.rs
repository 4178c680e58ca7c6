//! HTTP handler functions for the problem map API.

use actix_web::{HttpResponse, web};
use problem_map_analysis::AnalysisError;
use problem_map_analytics::{stats_by_category, stats_by_city, stats_by_district};
use problem_map_database::ProblemStore as _;
use problem_map_ingest_models::CreateProblemRequest;
use problem_map_problem_models::{ProblemCategory, Scope};
use problem_map_server_models::{
    ApiCategory, ApiHealth, ApiProblem, PopRequest, StatsQueryParams,
};

use crate::AppState;
use crate::error::ApiError;

fn category(id: i32) -> Result<ProblemCategory, ApiError> {
    ProblemCategory::from_id(id).ok_or_else(|| {
        AnalysisError::UnknownScope {
            kind: "category",
            id: i64::from(id),
        }
        .into()
    })
}

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /api/categories`
pub async fn categories() -> HttpResponse {
    let categories: Vec<ApiCategory> = ProblemCategory::all()
        .iter()
        .copied()
        .map(ApiCategory::from)
        .collect();

    HttpResponse::Ok().json(categories)
}

/// `GET /api/heatmap`
///
/// Returns the cached density map, building it on a miss.
pub async fn heatmap(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let map = state.density.get().await?;
    Ok(HttpResponse::Ok().json(map))
}

/// `POST /api/heatmap`
///
/// Short forecasts for two districts: the body's pair, or the configured
/// default pair when no body is sent.
pub async fn pop_analysis(
    state: web::Data<AppState>,
    body: Option<web::Json<PopRequest>>,
) -> Result<HttpResponse, ApiError> {
    let (first, second) = body.map_or(state.pop_districts, |body| {
        (body.first_district_id, body.second_district_id)
    });

    let pop = state
        .analysis
        .pop_analysis_with_timeout(
            Scope::District(first),
            Scope::District(second),
            state.analysis.config().pop_timeout,
        )
        .await?;

    Ok(HttpResponse::Ok().json(pop))
}

/// `GET /api/analysis/district/{id}`
pub async fn district_analysis(
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let analysis = state
        .analysis
        .get_analysis(Scope::District(path.into_inner()))
        .await?;
    Ok(HttpResponse::Ok().json(analysis))
}

/// `GET /api/analysis/category/{id}`
pub async fn category_analysis(
    state: web::Data<AppState>,
    path: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    let category = category(path.into_inner())?;
    let analysis = state
        .analysis
        .get_analysis(Scope::Category(category))
        .await?;
    Ok(HttpResponse::Ok().json(analysis))
}

/// `GET /api/analysis/city`
pub async fn city_analysis(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let analysis = state.analysis.get_analysis(Scope::City).await?;
    Ok(HttpResponse::Ok().json(analysis))
}

/// `GET /api/stats/district/{id}?category=`
pub async fn district_stats(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    params: web::Query<StatsQueryParams>,
) -> Result<HttpResponse, ApiError> {
    let district_id = path.into_inner();
    let filter = params
        .category
        .map(|id| {
            ProblemCategory::from_id(id).ok_or_else(|| ApiError::BadRequest {
                message: format!("unknown category {id}"),
            })
        })
        .transpose()?;

    if !state.store.district_exists(district_id).await? {
        return Err(AnalysisError::UnknownScope {
            kind: "district",
            id: district_id,
        }
        .into());
    }

    let stats = stats_by_district(state.store.as_ref(), district_id, filter).await?;
    Ok(HttpResponse::Ok().json(stats))
}

/// `GET /api/stats/category/{id}`
pub async fn category_stats(
    state: web::Data<AppState>,
    path: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    let category = category(path.into_inner())?;
    let stats = stats_by_category(state.store.as_ref(), category).await?;
    Ok(HttpResponse::Ok().json(stats))
}

/// `GET /api/stats/city`
pub async fn city_stats(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let stats = stats_by_city(state.store.as_ref()).await?;
    Ok(HttpResponse::Ok().json(stats))
}

/// `GET /api/problems/{id}`
pub async fn problem(
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let row = problem_map_ingest::get(state.store.as_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiProblem::from(row)))
}

/// `GET /api/districts/{id}/problems`
pub async fn district_problems(
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let rows = problem_map_ingest::list_by_district(state.store.as_ref(), path.into_inner()).await?;
    let problems: Vec<ApiProblem> = rows.into_iter().map(ApiProblem::from).collect();
    Ok(HttpResponse::Ok().json(problems))
}

/// `POST /api/problems`
///
/// Validates the report, resolves its district, and stores it.
pub async fn create_problem(
    state: web::Data<AppState>,
    body: web::Json<CreateProblemRequest>,
) -> Result<HttpResponse, ApiError> {
    let row = problem_map_ingest::create(
        state.store.as_ref(),
        &state.swap_repair,
        body.into_inner(),
    )
    .await?;

    log::info!(
        "Created problem {} in district {} ({})",
        row.id,
        row.district_id,
        row.category.display_name()
    );

    Ok(HttpResponse::Created().json(ApiProblem::from(row)))
}
