#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Row types and rollup filters for the problem store.
//!
//! These types represent the shapes of data as stored in and retrieved from
//! the store. They are distinct from the API response types in
//! `problem_map_server_models` and the rollup results in
//! `problem_map_analytics_models`.

use chrono::{DateTime, Utc};
use problem_map_problem_models::{ProblemCategory, ProblemStatus, Scope};
use serde::{Deserialize, Serialize};

/// Identity of a district returned by a containment query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistrictRef {
    /// External district id.
    pub id: i64,
    /// Display name.
    pub name: String,
}

/// A district as stored, without its boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistrictRow {
    /// External district id.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Local-language name.
    pub local_name: Option<String>,
    /// Optional reputation score.
    pub reputation: Option<f64>,
}

/// Boundary payload for inserting or replacing a district.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDistrict {
    /// External district id.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Local-language name.
    pub local_name: Option<String>,
    /// Boundary as `GeoJSON` geometry text.
    pub boundary_geojson: String,
}

/// A validated, district-resolved report ready to be persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProblem {
    /// District that contains the point.
    pub district_id: i64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Short title.
    pub name: String,
    /// Free-text description.
    pub description: String,
    /// Problem category.
    pub category: ProblemCategory,
    /// Importance on the 1–10 scale.
    pub importance: f64,
    /// Initial status.
    pub status: ProblemStatus,
    /// Reference to an already stored image.
    pub image_ref: Option<String>,
}

/// A report row as retrieved from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemRow {
    /// Primary key.
    pub id: i64,
    /// Owning district.
    pub district_id: i64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Short title.
    pub name: String,
    /// Free-text description.
    pub description: String,
    /// Problem category.
    pub category: ProblemCategory,
    /// Importance on the 1–10 scale.
    pub importance: f64,
    /// Current status.
    pub status: ProblemStatus,
    /// Reference to an attached image.
    pub image_ref: Option<String>,
}

/// Grouping and filtering for a statistics rollup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollupFilter {
    /// Reports in one district, grouped by category.
    District {
        /// District to roll up.
        district_id: i64,
        /// Restrict to one category.
        category: Option<ProblemCategory>,
    },
    /// Reports of one category, grouped by district, largest first.
    Category(ProblemCategory),
    /// Every report, as a single group.
    City,
}

/// One group of a rollup.
///
/// `group_id` is the category id for district rollups, the district id for
/// category rollups, and `None` for the city rollup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollupRow {
    /// Grouping key.
    pub group_id: Option<i64>,
    /// Display name of the group.
    pub group_name: Option<String>,
    /// Number of reports in any status.
    pub count: u64,
    /// Number of reports with status `solved`.
    pub solved_count: u64,
    /// Average importance rounded to two decimals; `None` for no rows.
    pub avg_importance: Option<f64>,
}

/// A generated analysis stored for one scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedAnalysisRow {
    /// Scope the text was generated for.
    pub scope: Scope,
    /// Generated commentary.
    pub text: String,
    /// Status flag reported by the generator.
    pub status: String,
    /// When the row was first written.
    pub created_at: DateTime<Utc>,
}

/// Location and weight of one point on the density map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatPointLocation {
    /// Owning district.
    pub district_id: i64,
    /// Report id.
    pub problem_id: i64,
    /// Longitude in degrees.
    pub lon: f64,
    /// Latitude in degrees.
    pub lat: f64,
    /// Report importance.
    pub importance: f64,
}

/// One report on the density map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatPoint {
    /// Category id.
    pub category: i32,
    /// Location and weight.
    pub point: HeatPointLocation,
}

/// Weighted point cloud over every report in the city.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DensityMap {
    /// Number of points.
    pub max_points: usize,
    /// The points, in store order.
    pub heat_points: Vec<HeatPoint>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn density_map_json_shape() {
        let map = DensityMap {
            max_points: 1,
            heat_points: vec![HeatPoint {
                category: 2,
                point: HeatPointLocation {
                    district_id: 3_072_217,
                    problem_id: 5,
                    lon: 76.9,
                    lat: 43.2,
                    importance: 3.0,
                },
            }],
        };

        let json = serde_json::to_value(&map).unwrap();
        assert_eq!(json["max_points"], 1);
        assert_eq!(json["heat_points"][0]["category"], 2);
        assert_eq!(json["heat_points"][0]["point"]["problem_id"], 5);
        assert_eq!(json["heat_points"][0]["point"]["lon"], 76.9);
    }
}
