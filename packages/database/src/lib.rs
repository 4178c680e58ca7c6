#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Persistent store for districts, reports, and cached analyses.
//!
//! [`ProblemStore`] is the seam every other crate talks to. Two
//! implementations are provided:
//!
//! - [`PostgisStore`] runs against `PostgreSQL` + `PostGIS` through
//!   `switchy_database`, delegating point-in-polygon tests to
//!   `ST_Contains` and rollups to SQL aggregates.
//! - [`MemoryStore`] keeps everything in process, using an R-tree for
//!   containment. It backs local runs and tests.

pub mod db;
pub mod memory;
pub mod postgis;

use async_trait::async_trait;
use include_dir::{Dir, include_dir};
use problem_map_database_models::{
    CachedAnalysisRow, DensityMap, DistrictRef, DistrictRow, NewDistrict, NewProblem, ProblemRow,
    RollupFilter, RollupRow,
};
use problem_map_problem_models::Scope;
use switchy_database::Database;
use switchy_schema::discovery::embedded::EmbeddedMigrationSource;
use switchy_schema::runner::MigrationRunner;

pub use memory::MemoryStore;
pub use postgis::PostgisStore;

/// Embedded SQL migrations from the `migrations/` directory.
static MIGRATIONS_DIR: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/../../migrations");

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// Database query error.
    #[error("Database error: {0}")]
    Database(#[from] switchy_database::DatabaseError),

    /// Migration error.
    #[error("Migration error: {0}")]
    Migration(#[from] switchy_schema::MigrationError),

    /// A stored JSON payload could not be (de)serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Data conversion error.
    #[error("Data conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },
}

/// Operations the engine needs from the persistent store.
#[async_trait]
pub trait ProblemStore: Send + Sync {
    /// Returns every district whose boundary contains the point, ordered by
    /// id. `point_wkt` is `POINT(<lon> <lat>)` in SRID 4326.
    async fn find_districts(&self, point_wkt: &str) -> Result<Vec<DistrictRef>, DbError>;

    /// Whether a district with this id exists.
    async fn district_exists(&self, district_id: i64) -> Result<bool, DbError>;

    /// Lists all districts ordered by id.
    async fn list_districts(&self) -> Result<Vec<DistrictRow>, DbError>;

    /// Inserts a district or replaces its name and boundary.
    async fn upsert_district(&self, district: &NewDistrict) -> Result<(), DbError>;

    /// Persists a report and returns it with its assigned id.
    async fn insert_problem(&self, problem: &NewProblem) -> Result<ProblemRow, DbError>;

    /// Fetches a report by id.
    async fn get_problem(&self, id: i64) -> Result<Option<ProblemRow>, DbError>;

    /// Lists every report ordered by id.
    async fn list_problems(&self) -> Result<Vec<ProblemRow>, DbError>;

    /// Lists the reports of one district ordered by id.
    async fn list_problems_by_district(&self, district_id: i64)
    -> Result<Vec<ProblemRow>, DbError>;

    /// Aggregates report counts and importance for the filter.
    ///
    /// Averages are rounded to two decimals. The city rollup always yields
    /// exactly one row.
    async fn rollup(&self, filter: RollupFilter) -> Result<Vec<RollupRow>, DbError>;

    /// Reads the persisted analysis for a scope.
    async fn get_cached_analysis(&self, scope: Scope)
    -> Result<Option<CachedAnalysisRow>, DbError>;

    /// Stores an analysis unless one already exists for the scope, then
    /// returns whichever row is persisted.
    async fn put_cached_analysis(
        &self,
        scope: Scope,
        text: &str,
        status: &str,
    ) -> Result<CachedAnalysisRow, DbError>;

    /// Removes the persisted analysis for a scope. Returns whether a row
    /// was removed.
    async fn delete_cached_analysis(&self, scope: Scope) -> Result<bool, DbError>;

    /// Reads the persisted density map snapshot.
    async fn get_density_map(&self) -> Result<Option<DensityMap>, DbError>;

    /// Replaces the persisted density map snapshot.
    async fn put_density_map(&self, map: &DensityMap) -> Result<(), DbError>;
}

/// Runs all pending database migrations.
///
/// # Errors
///
/// Returns [`DbError`] if any migration fails to apply.
pub async fn run_migrations(db: &dyn Database) -> Result<(), DbError> {
    let source = EmbeddedMigrationSource::new(&MIGRATIONS_DIR);
    let runner = MigrationRunner::new(Box::new(source));
    runner.run(db).await?;
    log::info!("Database migrations completed successfully");
    Ok(())
}

/// Rounds to two decimals, matching `ROUND(x::numeric, 2)`.
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
