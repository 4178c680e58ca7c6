#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Geometry primitives for district attribution.
//!
//! - [`codec`] converts `(longitude, latitude)` pairs to the `WKT` text the
//!   spatial store's containment operator consumes, and back.
//! - [`index`] is an in-memory R-tree over district polygons providing the
//!   same point-in-polygon answer the store gives, for local runs and tests.
//! - [`dataset`] parses the static district `GeoJSON` feature collection
//!   loaded at setup time.

pub mod codec;
pub mod dataset;
pub mod index;

pub use codec::{GeoPoint, RepairedPoint, SwapRepair};
pub use dataset::DistrictFeature;
pub use index::DistrictIndex;

use thiserror::Error;

/// Errors produced while encoding or decoding point geometry.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodecError {
    /// A coordinate was NaN or infinite.
    #[error("Non-finite coordinate ({longitude}, {latitude})")]
    NonFinite {
        /// Longitude as received.
        longitude: f64,
        /// Latitude as received.
        latitude: f64,
    },

    /// A coordinate is outside the valid WGS84 range even after repair.
    #[error("Coordinate out of range ({longitude}, {latitude})")]
    OutOfRange {
        /// Longitude after repair.
        longitude: f64,
        /// Latitude after repair.
        latitude: f64,
    },

    /// Encoding produced text that does not describe the input point.
    #[error("Encoding error: {message}")]
    Encoding {
        /// Description of what went wrong.
        message: String,
    },

    /// The text is not a `POINT(x y)` geometry.
    #[error("Decoding error: {message}")]
    Decoding {
        /// Description of what went wrong.
        message: String,
    },
}

/// Errors produced while reading the district dataset.
#[derive(Debug, Error)]
pub enum SpatialError {
    /// The document is not valid `GeoJSON`.
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A feature is missing required data.
    #[error("Invalid feature: {message}")]
    InvalidFeature {
        /// Description of what went wrong.
        message: String,
    },
}
