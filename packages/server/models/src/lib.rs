#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the problem map server.
//!
//! These types are serialized to JSON for the REST API. They are separate
//! from the database row types to allow independent evolution of the API
//! contract.

use chrono::{DateTime, Utc};
use problem_map_database_models::ProblemRow;
use problem_map_problem_models::{ProblemCategory, ProblemStatus};
use serde::{Deserialize, Serialize};

/// A problem report as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiProblem {
    /// Unique report ID.
    pub id: i64,
    /// District the report was resolved to.
    pub district_id: i64,
    /// Longitude.
    pub longitude: f64,
    /// Latitude.
    pub latitude: f64,
    /// Short title.
    pub name: String,
    /// Free-text description.
    pub description: String,
    /// Numeric category id.
    pub category_id: i32,
    /// Category display name.
    pub category_name: String,
    /// Importance on the 1–10 scale.
    pub importance: f64,
    /// Lifecycle status.
    pub status: ProblemStatus,
    /// Reference to an attached image.
    pub image_ref: Option<String>,
}

impl From<ProblemRow> for ApiProblem {
    fn from(row: ProblemRow) -> Self {
        Self {
            id: row.id,
            district_id: row.district_id,
            longitude: row.longitude,
            latitude: row.latitude,
            name: row.name,
            description: row.description,
            category_id: row.category.id(),
            category_name: row.category.display_name().to_string(),
            importance: row.importance,
            status: row.status,
            image_ref: row.image_ref,
        }
    }
}

/// One entry of the category list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiCategory {
    /// Numeric category id.
    pub id: i32,
    /// Display name.
    pub name: String,
}

impl From<ProblemCategory> for ApiCategory {
    fn from(category: ProblemCategory) -> Self {
        Self {
            id: category.id(),
            name: category.display_name().to_string(),
        }
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Whether the server is healthy.
    pub healthy: bool,
    /// Server version.
    pub version: String,
}

/// Body of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    /// What went wrong.
    pub message: String,
    /// When the error was produced (RFC 3339).
    pub time: DateTime<Utc>,
}

/// Query parameters for the district statistics endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsQueryParams {
    /// Restrict the rollup to one category id.
    pub category: Option<i32>,
}

/// Optional body of `POST /api/heatmap`.
///
/// Without it the server's configured pair of districts is used.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PopRequest {
    /// First district id.
    pub first_district_id: i64,
    /// Second district id.
    pub second_district_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn problem_serializes_category_and_status() {
        let problem = ApiProblem::from(ProblemRow {
            id: 12,
            district_id: 3_072_217,
            longitude: 76.9,
            latitude: 43.2,
            name: "Pothole".to_string(),
            description: String::new(),
            category: ProblemCategory::RoadsTransport,
            importance: 5.0,
            status: ProblemStatus::Created,
            image_ref: None,
        });
        let json = serde_json::to_value(&problem).unwrap();
        assert_eq!(json["categoryId"], 2);
        assert_eq!(json["categoryName"], "Roads & transport");
        assert_eq!(json["status"], "created");
        assert_eq!(json["districtId"], 3_072_217);
    }

    #[test]
    fn error_body_time_is_rfc3339() {
        let body = ApiErrorBody {
            message: "empty name".to_string(),
            time: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["time"], "2023-11-14T22:13:20Z");
    }
}
