#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! District resolution and reference boundary loading.
//!
//! [`resolve`] maps a coordinate to the district whose boundary contains
//! it, delegating the point-in-polygon test to the store. [`load`] reads
//! the static district `GeoJSON` dataset into the store at setup time.

pub mod load;
pub mod resolver;

pub use load::{load_districts, load_file};
pub use resolver::resolve;

use problem_map_database::DbError;
use problem_map_spatial::{CodecError, GeoPoint, SpatialError};
use thiserror::Error;

/// Errors that can occur while resolving or loading districts.
#[derive(Debug, Error)]
pub enum DistrictError {
    /// No district boundary contains the point.
    #[error("No district contains point {point}")]
    NotFound {
        /// The point that was looked up.
        point: GeoPoint,
    },

    /// The containment query failed. Not retried.
    #[error("District resolution failed: {0}")]
    ResolutionFailed(#[source] DbError),

    /// The point could not be encoded for the query.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// The district dataset could not be parsed.
    #[error("Dataset error: {0}")]
    Dataset(#[from] SpatialError),

    /// Writing districts to the store failed.
    #[error("Store error: {0}")]
    Store(#[from] DbError),

    /// The dataset file could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
