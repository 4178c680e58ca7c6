#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Report creation request types.

use serde::{Deserialize, Serialize};

/// A new problem report as submitted by a resident.
///
/// Nothing here is trusted: the category id, importance, and coordinates
/// are validated and the district is resolved from the point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProblemRequest {
    /// Longitude in degrees.
    pub longitude: f64,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Short title.
    pub name: String,
    /// Free-text description.
    #[serde(default)]
    pub description: String,
    /// Numeric category id.
    pub category_id: i32,
    /// Reference to an already uploaded image.
    #[serde(default)]
    pub image_ref: Option<String>,
    /// Importance on the 1–10 scale.
    #[serde(default)]
    pub importance: Option<f64>,
}
