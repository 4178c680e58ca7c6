#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Problem category and status reference types.
//!
//! Categories are a small closed set shared by every part of the system:
//! ingestion validates against it, the aggregation engine groups by it,
//! and the analysis cache uses it as a scope key.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Lowest importance a report may carry.
pub const MIN_IMPORTANCE: f64 = 1.0;

/// Highest importance a report may carry.
pub const MAX_IMPORTANCE: f64 = 10.0;

/// Importance assigned when the reporter does not provide one.
pub const DEFAULT_IMPORTANCE: f64 = MIN_IMPORTANCE;

/// Kind of city problem a report describes.
///
/// The numeric ids are the ones stored in `problems.type_id` and exposed
/// through the API, so they must never be renumbered.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ProblemCategory {
    /// Housing and communal utilities (heating, water, waste).
    HousingUtilities = 1,
    /// Roads, sidewalks, public transport.
    RoadsTransport = 2,
    /// Government and public services.
    PublicServices = 3,
    /// Anything that does not fit the other categories.
    Other = 4,
}

impl ProblemCategory {
    /// Returns the stable numeric id of this category.
    #[must_use]
    pub const fn id(self) -> i32 {
        self as i32
    }

    /// Looks up a category by its numeric id.
    #[must_use]
    pub const fn from_id(id: i32) -> Option<Self> {
        match id {
            1 => Some(Self::HousingUtilities),
            2 => Some(Self::RoadsTransport),
            3 => Some(Self::PublicServices),
            4 => Some(Self::Other),
            _ => None,
        }
    }

    /// Human-readable name used in prompts and API responses.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::HousingUtilities => "Housing & utilities",
            Self::RoadsTransport => "Roads & transport",
            Self::PublicServices => "Public services",
            Self::Other => "Other",
        }
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::HousingUtilities,
            Self::RoadsTransport,
            Self::PublicServices,
            Self::Other,
        ]
    }
}

/// Lifecycle status of a report.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProblemStatus {
    /// Newly reported, nobody has picked it up yet.
    Created,
    /// Someone is working on it.
    Processing,
    /// Resolved. Only this status counts towards `solved_count`.
    Solved,
}

/// Id used for the city-wide scope wherever a numeric scope id is needed.
pub const CITY_SCOPE_ID: i64 = -1;

/// What a rollup or cached analysis is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Scope {
    /// One district, by external id.
    District(i64),
    /// One problem category.
    Category(ProblemCategory),
    /// The whole city.
    City,
}

impl Scope {
    /// Storage name of the scope kind.
    #[must_use]
    pub const fn kind(self) -> &'static str {
        match self {
            Self::District(_) => "district",
            Self::Category(_) => "category",
            Self::City => "city",
        }
    }

    /// Numeric id within the scope kind ([`CITY_SCOPE_ID`] for the city).
    #[must_use]
    pub fn id(self) -> i64 {
        match self {
            Self::District(id) => id,
            Self::Category(category) => i64::from(category.id()),
            Self::City => CITY_SCOPE_ID,
        }
    }

    /// Rebuilds a scope from its storage representation.
    #[must_use]
    pub fn from_parts(kind: &str, id: i64) -> Option<Self> {
        match kind {
            "district" => Some(Self::District(id)),
            "category" => i32::try_from(id)
                .ok()
                .and_then(ProblemCategory::from_id)
                .map(Self::Category),
            "city" if id == CITY_SCOPE_ID => Some(Self::City),
            _ => None,
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::District(id) => write!(f, "district {id}"),
            Self::Category(category) => write!(f, "category {category}"),
            Self::City => f.write_str("city"),
        }
    }
}

/// Error returned when an importance value falls outside
/// [`MIN_IMPORTANCE`]..=[`MAX_IMPORTANCE`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InvalidImportanceError {
    /// The rejected value.
    pub value: f64,
}

impl std::fmt::Display for InvalidImportanceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid importance {}: expected {MIN_IMPORTANCE}-{MAX_IMPORTANCE}",
            self.value
        )
    }
}

impl std::error::Error for InvalidImportanceError {}

/// Checks that an importance value is finite and on the 1–10 scale.
///
/// # Errors
///
/// Returns [`InvalidImportanceError`] for values off the scale.
pub fn validate_importance(value: f64) -> Result<f64, InvalidImportanceError> {
    if value.is_finite() && (MIN_IMPORTANCE..=MAX_IMPORTANCE).contains(&value) {
        Ok(value)
    } else {
        Err(InvalidImportanceError { value })
    }
}
