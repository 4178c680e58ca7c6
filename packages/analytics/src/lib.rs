#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Aggregation engine.
//!
//! Rolls persisted reports up by district, by category, or for the whole
//! city. Each function issues one store rollup and shapes the rows into the
//! typed results of `problem_map_analytics_models`. Empty results are valid
//! answers; an absent average becomes `0.0`.

use problem_map_analytics_models::{
    AggregateStat, CategoryStat, CategoryStats, CityStats, DistrictStat, DistrictStats, ScopeStats,
};
use problem_map_database::{DbError, ProblemStore};
use problem_map_database_models::{RollupFilter, RollupRow};
use problem_map_problem_models::{ProblemCategory, Scope};
use thiserror::Error;

/// Errors that can occur during analytics operations.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// Store operation failed.
    #[error("Store error: {0}")]
    Store(#[from] DbError),

    /// A rollup row did not have the expected shape.
    #[error("Conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },
}

fn aggregate(row: &RollupRow) -> AggregateStat {
    AggregateStat {
        count: row.count,
        solved_count: row.solved_count,
        average_importance: row.avg_importance.unwrap_or(0.0),
    }
}

fn group_id(row: &RollupRow) -> Result<i64, AnalyticsError> {
    row.group_id.ok_or_else(|| AnalyticsError::Conversion {
        message: "rollup row without a group id".to_string(),
    })
}

/// Per-category statistics for one district, optionally restricted to a
/// single category.
///
/// # Errors
///
/// Returns [`AnalyticsError`] if the store query fails or returns a row
/// for an unknown category.
pub async fn stats_by_district(
    store: &dyn ProblemStore,
    district_id: i64,
    category: Option<ProblemCategory>,
) -> Result<DistrictStats, AnalyticsError> {
    let rows = store
        .rollup(RollupFilter::District {
            district_id,
            category,
        })
        .await?;

    let by_category = rows
        .iter()
        .map(|row| {
            let id = group_id(row)?;
            let category = i32::try_from(id)
                .ok()
                .and_then(ProblemCategory::from_id)
                .ok_or_else(|| AnalyticsError::Conversion {
                    message: format!("unknown category id {id}"),
                })?;
            Ok(CategoryStat {
                category,
                category_name: row
                    .group_name
                    .clone()
                    .unwrap_or_else(|| category.display_name().to_string()),
                stat: aggregate(row),
            })
        })
        .collect::<Result<Vec<_>, AnalyticsError>>()?;

    log::debug!(
        "District {district_id} rollup: {} categories",
        by_category.len()
    );

    Ok(DistrictStats {
        district_id,
        category,
        by_category,
    })
}

/// Per-district statistics for one category, largest count first.
///
/// # Errors
///
/// Returns [`AnalyticsError`] if the store query fails.
pub async fn stats_by_category(
    store: &dyn ProblemStore,
    category: ProblemCategory,
) -> Result<CategoryStats, AnalyticsError> {
    let rows = store.rollup(RollupFilter::Category(category)).await?;

    let by_district = rows
        .iter()
        .map(|row| {
            Ok(DistrictStat {
                district_id: group_id(row)?,
                district_name: row.group_name.clone().unwrap_or_default(),
                stat: aggregate(row),
            })
        })
        .collect::<Result<Vec<_>, AnalyticsError>>()?;

    log::debug!(
        "Category {category} rollup: {} districts",
        by_district.len()
    );

    Ok(CategoryStats {
        category,
        by_district,
    })
}

/// City-wide statistics.
///
/// # Errors
///
/// Returns [`AnalyticsError`] if the store query fails.
pub async fn stats_by_city(store: &dyn ProblemStore) -> Result<CityStats, AnalyticsError> {
    let rows = store.rollup(RollupFilter::City).await?;

    Ok(CityStats {
        stat: rows.first().map(aggregate).unwrap_or_default(),
    })
}

/// Statistics for any scope. District scopes are not filtered by category.
///
/// # Errors
///
/// Returns [`AnalyticsError`] if the store query fails.
pub async fn stats_for_scope(
    store: &dyn ProblemStore,
    scope: Scope,
) -> Result<ScopeStats, AnalyticsError> {
    Ok(match scope {
        Scope::District(id) => ScopeStats::District(stats_by_district(store, id, None).await?),
        Scope::Category(category) => {
            ScopeStats::Category(stats_by_category(store, category).await?)
        }
        Scope::City => ScopeStats::City(stats_by_city(store).await?),
    })
}
