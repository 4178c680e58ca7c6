#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Report ingestion.
//!
//! Validates a new report, resolves its district from the coordinate, and
//! persists it with status `created`. Validation runs before any store
//! access, in this order: name, category, importance, coordinates.

use problem_map_database::{DbError, ProblemStore};
use problem_map_database_models::{NewProblem, ProblemRow};
use problem_map_districts::DistrictError;
use problem_map_ingest_models::CreateProblemRequest;
use problem_map_problem_models::{
    DEFAULT_IMPORTANCE, ProblemCategory, ProblemStatus, validate_importance,
};
use problem_map_spatial::{CodecError, SwapRepair};
use thiserror::Error;

/// Errors that can occur while creating or reading reports.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The request is malformed.
    #[error("Validation error: {message}")]
    Validation {
        /// What is wrong with the request.
        message: String,
    },

    /// The coordinate pair is not a usable point.
    #[error("Invalid coordinates: {0}")]
    Coordinates(#[from] CodecError),

    /// District resolution failed or found nothing.
    #[error(transparent)]
    District(#[from] DistrictError),

    /// No report with this id.
    #[error("Problem {id} not found")]
    ProblemNotFound {
        /// The requested id.
        id: i64,
    },

    /// No district with this id.
    #[error("District {id} not found")]
    UnknownDistrict {
        /// The requested id.
        id: i64,
    },

    /// Store operation failed.
    #[error("Store error: {0}")]
    Store(#[from] DbError),
}

fn invalid(message: impl Into<String>) -> IngestError {
    IngestError::Validation {
        message: message.into(),
    }
}

/// Validates, resolves, and persists a new report.
///
/// Coordinates that look swapped are corrected by `swap_repair` before
/// resolution.
///
/// # Errors
///
/// * [`IngestError::Validation`] for an empty name, an unknown category,
///   or an importance off the 1–10 scale
/// * [`IngestError::Coordinates`] for non-finite or out-of-range
///   coordinates
/// * [`IngestError::District`] when no district contains the point or the
///   containment query fails
/// * [`IngestError::Store`] if persisting fails
pub async fn create(
    store: &dyn ProblemStore,
    swap_repair: &SwapRepair,
    request: CreateProblemRequest,
) -> Result<ProblemRow, IngestError> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err(invalid("empty name"));
    }

    let category = ProblemCategory::from_id(request.category_id)
        .ok_or_else(|| invalid(format!("unknown category {}", request.category_id)))?;

    let importance = request
        .importance
        .map_or(Ok(DEFAULT_IMPORTANCE), validate_importance)
        .map_err(|e| invalid(e.to_string()))?;

    let repaired = swap_repair.repair(request.longitude, request.latitude)?;

    let district = problem_map_districts::resolve(store, repaired.point).await?;

    let problem = store
        .insert_problem(&NewProblem {
            district_id: district.id,
            longitude: repaired.point.longitude,
            latitude: repaired.point.latitude,
            name: name.to_string(),
            description: request.description,
            category,
            importance,
            status: ProblemStatus::Created,
            image_ref: request.image_ref.filter(|r| !r.trim().is_empty()),
        })
        .await?;

    log::info!(
        "Created problem {} in district {} ({}), category {category}",
        problem.id,
        district.id,
        district.name
    );

    Ok(problem)
}

/// Fetches one report.
///
/// # Errors
///
/// Returns [`IngestError::ProblemNotFound`] if no report has this id, or
/// [`IngestError::Store`] if the query fails.
pub async fn get(store: &dyn ProblemStore, id: i64) -> Result<ProblemRow, IngestError> {
    store
        .get_problem(id)
        .await?
        .ok_or(IngestError::ProblemNotFound { id })
}

/// Lists the reports of one district.
///
/// # Errors
///
/// Returns [`IngestError::UnknownDistrict`] if the district does not exist,
/// or [`IngestError::Store`] if a query fails.
pub async fn list_by_district(
    store: &dyn ProblemStore,
    district_id: i64,
) -> Result<Vec<ProblemRow>, IngestError> {
    if !store.district_exists(district_id).await? {
        return Err(IngestError::UnknownDistrict { id: district_id });
    }

    Ok(store.list_problems_by_district(district_id).await?)
}
