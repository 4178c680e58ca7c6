#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Statistics rollup result types.
//!
//! Every rollup carries the same three numbers ([`AggregateStat`]); the
//! shapes differ only in what they are grouped by. These types are
//! serialized both into API responses and into text-generation prompts.

use problem_map_problem_models::{ProblemCategory, Scope};
use serde::{Deserialize, Serialize};

/// Count, solved count, and average importance of a group of reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateStat {
    /// Reports in any status.
    pub count: u64,
    /// Reports with status `solved`.
    pub solved_count: u64,
    /// Mean importance rounded to two decimals, `0.0` for no reports.
    pub average_importance: f64,
}

/// One category's share of a district.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryStat {
    /// Category the row describes.
    pub category: ProblemCategory,
    /// Display name of the category.
    pub category_name: String,
    /// Aggregates for the category.
    #[serde(flatten)]
    pub stat: AggregateStat,
}

/// Per-category rollup of one district.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistrictStats {
    /// District the rollup covers.
    pub district_id: i64,
    /// Category filter, if one was applied.
    pub category: Option<ProblemCategory>,
    /// One row per category present, ordered by category id.
    pub by_category: Vec<CategoryStat>,
}

/// One district's share of a category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistrictStat {
    /// District the row describes.
    pub district_id: i64,
    /// Display name of the district.
    pub district_name: String,
    /// Aggregates for the district.
    #[serde(flatten)]
    pub stat: AggregateStat,
}

/// Per-district rollup of one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryStats {
    /// Category the rollup covers.
    pub category: ProblemCategory,
    /// One row per district with reports, largest count first.
    pub by_district: Vec<DistrictStat>,
}

/// City-wide rollup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CityStats {
    /// Aggregates over every report.
    #[serde(flatten)]
    pub stat: AggregateStat,
}

/// Rollup for any [`Scope`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum ScopeStats {
    /// A district rollup.
    District(DistrictStats),
    /// A category rollup.
    Category(CategoryStats),
    /// The city rollup.
    City(CityStats),
}

impl ScopeStats {
    /// The scope this rollup describes.
    #[must_use]
    pub const fn scope(&self) -> Scope {
        match self {
            Self::District(stats) => Scope::District(stats.district_id),
            Self::Category(stats) => Scope::Category(stats.category),
            Self::City(_) => Scope::City,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_row_flattens_aggregate() {
        let row = CategoryStat {
            category: ProblemCategory::Other,
            category_name: ProblemCategory::Other.display_name().to_string(),
            stat: AggregateStat {
                count: 3,
                solved_count: 1,
                average_importance: 2.5,
            },
        };

        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["count"], 3);
        assert_eq!(json["solvedCount"], 1);
        assert_eq!(json["averageImportance"], 2.5);
        assert!(json.get("stat").is_none());
    }

    #[test]
    fn scope_stats_report_their_scope() {
        let stats = ScopeStats::District(DistrictStats {
            district_id: 7,
            category: None,
            by_category: vec![],
        });
        assert_eq!(stats.scope(), Scope::District(7));
        assert_eq!(ScopeStats::City(CityStats::default()).scope(), Scope::City);
    }
}
