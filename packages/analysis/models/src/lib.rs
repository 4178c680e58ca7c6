#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Analysis result types.
//!
//! A [`CachedAnalysis`] is the long-form commentary for one scope, generated
//! once and then served from the cache. A [`PopAnalysis`] is the pair of
//! short forecasts shown as pop-up labels on the map.

use chrono::{DateTime, Utc};
use problem_map_problem_models::Scope;
use serde::{Deserialize, Serialize};

/// Generated commentary for one scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedAnalysis {
    /// What the commentary is about.
    pub scope: Scope,
    /// The commentary.
    pub text: String,
    /// Status flag returned alongside the commentary.
    pub status: String,
    /// When the commentary was first persisted.
    pub created_at: DateTime<Utc>,
}

/// A few-word forecast for one scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BriefForecast {
    /// What the forecast is about.
    pub scope: Scope,
    /// The forecast, e.g. `expected: road repairs, high`.
    pub text: String,
}

/// Forecasts for two scopes produced concurrently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PopAnalysis {
    /// Forecast for the first scope.
    pub first: BriefForecast,
    /// Forecast for the second scope.
    pub second: BriefForecast,
}
