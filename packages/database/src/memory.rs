//! In-process implementation of [`ProblemStore`].
//!
//! Containment goes through an R-tree over district boundaries; rollups
//! are computed in Rust with the same grouping, ordering and rounding as
//! the SQL queries in [`crate::postgis`].

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use geo::MultiPolygon;
use problem_map_database_models::{
    CachedAnalysisRow, DensityMap, DistrictRef, DistrictRow, NewDistrict, NewProblem, ProblemRow,
    RollupFilter, RollupRow,
};
use problem_map_problem_models::{ProblemStatus, Scope};
use problem_map_spatial::codec::decode_wkt;
use problem_map_spatial::dataset::parse_boundary;
use problem_map_spatial::DistrictIndex;

use crate::{DbError, ProblemStore, round2};

struct StoredDistrict {
    row: DistrictRow,
    boundary: MultiPolygon<f64>,
}

#[derive(Default)]
struct MemoryState {
    districts: BTreeMap<i64, StoredDistrict>,
    index: Option<DistrictIndex>,
    problems: Vec<ProblemRow>,
    analyses: BTreeMap<Scope, CachedAnalysisRow>,
    density_map: Option<DensityMap>,
}

impl MemoryState {
    fn index(&mut self) -> &DistrictIndex {
        let districts = &self.districts;
        self.index.get_or_insert_with(|| {
            DistrictIndex::build(districts.iter().map(|(id, stored)| {
                (*id, stored.row.name.clone(), stored.boundary.clone())
            }))
        })
    }
}

/// Store that keeps districts, reports, and cache rows in memory.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a district from an already parsed boundary.
    pub fn add_district(&self, id: i64, name: &str, boundary: MultiPolygon<f64>) {
        let mut state = self.lock();
        state.districts.insert(
            id,
            StoredDistrict {
                row: DistrictRow {
                    id,
                    name: name.to_string(),
                    local_name: None,
                    reputation: None,
                },
                boundary,
            },
        );
        state.index = None;
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

fn group(
    problems: &[&ProblemRow],
    group_id: Option<i64>,
    group_name: Option<String>,
) -> RollupRow {
    let count = problems.len() as u64;
    let solved_count = problems
        .iter()
        .filter(|p| p.status == ProblemStatus::Solved)
        .count() as u64;

    #[allow(clippy::cast_precision_loss)]
    let avg_importance = (!problems.is_empty()).then(|| {
        round2(problems.iter().map(|p| p.importance).sum::<f64>() / problems.len() as f64)
    });

    RollupRow {
        group_id,
        group_name,
        count,
        solved_count,
        avg_importance,
    }
}

#[async_trait]
impl ProblemStore for MemoryStore {
    async fn find_districts(&self, point_wkt: &str) -> Result<Vec<DistrictRef>, DbError> {
        let point = decode_wkt(point_wkt).map_err(|e| DbError::Conversion {
            message: e.to_string(),
        })?;

        let mut state = self.lock();
        Ok(state
            .index()
            .containing(point)
            .into_iter()
            .map(|hit| DistrictRef {
                id: hit.district_id,
                name: hit.name.to_string(),
            })
            .collect())
    }

    async fn district_exists(&self, district_id: i64) -> Result<bool, DbError> {
        Ok(self.lock().districts.contains_key(&district_id))
    }

    async fn list_districts(&self) -> Result<Vec<DistrictRow>, DbError> {
        Ok(self
            .lock()
            .districts
            .values()
            .map(|d| d.row.clone())
            .collect())
    }

    async fn upsert_district(&self, district: &NewDistrict) -> Result<(), DbError> {
        let boundary =
            parse_boundary(&district.boundary_geojson).map_err(|e| DbError::Conversion {
                message: format!("Invalid boundary for district {}: {e}", district.id),
            })?;

        let mut state = self.lock();
        let reputation = state
            .districts
            .get(&district.id)
            .and_then(|d| d.row.reputation);
        state.districts.insert(
            district.id,
            StoredDistrict {
                row: DistrictRow {
                    id: district.id,
                    name: district.name.clone(),
                    local_name: district.local_name.clone(),
                    reputation,
                },
                boundary,
            },
        );
        state.index = None;

        Ok(())
    }

    async fn insert_problem(&self, problem: &NewProblem) -> Result<ProblemRow, DbError> {
        let mut state = self.lock();
        let id = state.problems.last().map_or(1, |p| p.id + 1);

        let row = ProblemRow {
            id,
            district_id: problem.district_id,
            longitude: problem.longitude,
            latitude: problem.latitude,
            name: problem.name.clone(),
            description: problem.description.clone(),
            category: problem.category,
            importance: problem.importance,
            status: problem.status,
            image_ref: problem.image_ref.clone(),
        };
        state.problems.push(row.clone());

        Ok(row)
    }

    async fn get_problem(&self, id: i64) -> Result<Option<ProblemRow>, DbError> {
        Ok(self.lock().problems.iter().find(|p| p.id == id).cloned())
    }

    async fn list_problems(&self) -> Result<Vec<ProblemRow>, DbError> {
        Ok(self.lock().problems.clone())
    }

    async fn list_problems_by_district(
        &self,
        district_id: i64,
    ) -> Result<Vec<ProblemRow>, DbError> {
        Ok(self
            .lock()
            .problems
            .iter()
            .filter(|p| p.district_id == district_id)
            .cloned()
            .collect())
    }

    async fn rollup(&self, filter: RollupFilter) -> Result<Vec<RollupRow>, DbError> {
        let state = self.lock();

        let rows = match filter {
            RollupFilter::District {
                district_id,
                category,
            } => {
                let mut groups: BTreeMap<i32, Vec<&ProblemRow>> = BTreeMap::new();
                for problem in state.problems.iter().filter(|p| {
                    p.district_id == district_id && category.is_none_or(|c| p.category == c)
                }) {
                    groups.entry(problem.category.id()).or_default().push(problem);
                }
                groups
                    .into_values()
                    .map(|problems| {
                        let category = problems[0].category;
                        group(
                            &problems,
                            Some(i64::from(category.id())),
                            Some(category.display_name().to_string()),
                        )
                    })
                    .collect()
            }
            RollupFilter::Category(category) => {
                let mut groups: BTreeMap<i64, Vec<&ProblemRow>> = BTreeMap::new();
                for problem in state.problems.iter().filter(|p| p.category == category) {
                    groups.entry(problem.district_id).or_default().push(problem);
                }
                let mut rows: Vec<RollupRow> = groups
                    .into_iter()
                    .map(|(district_id, problems)| {
                        let name = state
                            .districts
                            .get(&district_id)
                            .map(|d| d.row.name.clone());
                        group(&problems, Some(district_id), name)
                    })
                    .collect();
                rows.sort_by(|a, b| b.count.cmp(&a.count));
                rows
            }
            RollupFilter::City => {
                let all: Vec<&ProblemRow> = state.problems.iter().collect();
                vec![group(&all, None, None)]
            }
        };

        Ok(rows)
    }

    async fn get_cached_analysis(
        &self,
        scope: Scope,
    ) -> Result<Option<CachedAnalysisRow>, DbError> {
        Ok(self.lock().analyses.get(&scope).cloned())
    }

    async fn put_cached_analysis(
        &self,
        scope: Scope,
        text: &str,
        status: &str,
    ) -> Result<CachedAnalysisRow, DbError> {
        Ok(self
            .lock()
            .analyses
            .entry(scope)
            .or_insert_with(|| CachedAnalysisRow {
                scope,
                text: text.to_string(),
                status: status.to_string(),
                created_at: Utc::now(),
            })
            .clone())
    }

    async fn delete_cached_analysis(&self, scope: Scope) -> Result<bool, DbError> {
        Ok(self.lock().analyses.remove(&scope).is_some())
    }

    async fn get_density_map(&self) -> Result<Option<DensityMap>, DbError> {
        Ok(self.lock().density_map.clone())
    }

    async fn put_density_map(&self, map: &DensityMap) -> Result<(), DbError> {
        self.lock().density_map = Some(map.clone());
        Ok(())
    }
}
