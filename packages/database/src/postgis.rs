//! `PostgreSQL` + `PostGIS` implementation of [`ProblemStore`].
//!
//! All queries are raw SQL through `query_raw_params()`; containment and
//! aggregation run inside the database.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use moosicbox_json_utils::database::ToValue as _;
use problem_map_database_models::{
    CachedAnalysisRow, DensityMap, DistrictRef, DistrictRow, NewDistrict, NewProblem, ProblemRow,
    RollupFilter, RollupRow,
};
use problem_map_problem_models::{ProblemCategory, ProblemStatus, Scope};
use switchy_database::{Database, DatabaseValue};

use crate::{DbError, ProblemStore};

const PROBLEM_COLUMNS: &str = "p.id, p.district_id, p.name, p.description, p.category_id,
     p.importance, p.status, p.image_ref,
     ST_X(p.location) AS longitude, ST_Y(p.location) AS latitude";

/// Store backed by a `PostGIS`-enabled `PostgreSQL` database.
pub struct PostgisStore {
    db: Box<dyn Database>,
}

impl PostgisStore {
    /// Wraps an open connection.
    #[must_use]
    pub fn new(db: Box<dyn Database>) -> Self {
        Self { db }
    }

    /// The underlying connection, for migrations and ad-hoc queries.
    #[must_use]
    pub fn database(&self) -> &dyn Database {
        &*self.db
    }
}

fn conversion(column: &str, e: impl std::fmt::Display) -> DbError {
    DbError::Conversion {
        message: format!("Failed to read column {column}: {e}"),
    }
}

fn count(row: &switchy_database::Row, column: &str) -> Result<u64, DbError> {
    let value: i64 = row.to_value(column).map_err(|e| conversion(column, e))?;
    u64::try_from(value).map_err(|e| conversion(column, e))
}

fn row_to_problem(row: &switchy_database::Row) -> Result<ProblemRow, DbError> {
    let longitude: f64 = row
        .to_value("longitude")
        .map_err(|e| conversion("longitude", e))?;
    let latitude: f64 = row
        .to_value("latitude")
        .map_err(|e| conversion("latitude", e))?;
    let importance: f64 = row
        .to_value("importance")
        .map_err(|e| conversion("importance", e))?;

    let category_id: i32 = row
        .to_value("category_id")
        .map_err(|e| conversion("category_id", e))?;
    let category = ProblemCategory::from_id(category_id).ok_or_else(|| DbError::Conversion {
        message: format!("Unknown category id {category_id}"),
    })?;

    let status_name: String = row.to_value("status").map_err(|e| conversion("status", e))?;
    let status = status_name
        .parse::<ProblemStatus>()
        .map_err(|e| conversion("status", e))?;

    Ok(ProblemRow {
        id: row.to_value("id").map_err(|e| conversion("id", e))?,
        district_id: row
            .to_value("district_id")
            .map_err(|e| conversion("district_id", e))?,
        longitude,
        latitude,
        name: row.to_value("name").map_err(|e| conversion("name", e))?,
        description: row
            .to_value("description")
            .map_err(|e| conversion("description", e))?,
        category,
        importance,
        status,
        image_ref: row.to_value("image_ref").unwrap_or(None),
    })
}

fn row_to_rollup(row: &switchy_database::Row) -> Result<RollupRow, DbError> {
    Ok(RollupRow {
        group_id: row.to_value("group_id").unwrap_or(None),
        group_name: row.to_value("group_name").unwrap_or(None),
        count: count(row, "prb_count")?,
        solved_count: count(row, "solved_count")?,
        avg_importance: row.to_value("avg_importance").unwrap_or(None),
    })
}

fn row_to_analysis(scope: Scope, row: &switchy_database::Row) -> Result<CachedAnalysisRow, DbError> {
    let created_at: NaiveDateTime = row
        .to_value("created_at")
        .map_err(|e| conversion("created_at", e))?;

    Ok(CachedAnalysisRow {
        scope,
        text: row
            .to_value("response_text")
            .map_err(|e| conversion("response_text", e))?,
        status: row.to_value("status").unwrap_or_default(),
        created_at: DateTime::<Utc>::from_naive_utc_and_offset(created_at, Utc),
    })
}

fn scope_params(scope: Scope) -> [DatabaseValue; 2] {
    [
        DatabaseValue::String(scope.kind().to_string()),
        DatabaseValue::Int64(scope.id()),
    ]
}

#[async_trait]
impl ProblemStore for PostgisStore {
    async fn find_districts(&self, point_wkt: &str) -> Result<Vec<DistrictRef>, DbError> {
        let rows = self
            .db
            .query_raw_params(
                "SELECT id, name FROM districts
                 WHERE ST_Contains(boundary, ST_SetSRID(ST_GeomFromText($1), 4326))
                 ORDER BY id",
                &[DatabaseValue::String(point_wkt.to_string())],
            )
            .await?;

        rows.iter()
            .map(|row| {
                Ok(DistrictRef {
                    id: row.to_value("id").map_err(|e| conversion("id", e))?,
                    name: row.to_value("name").unwrap_or_default(),
                })
            })
            .collect()
    }

    async fn district_exists(&self, district_id: i64) -> Result<bool, DbError> {
        let rows = self
            .db
            .query_raw_params(
                "SELECT 1 AS found FROM districts WHERE id = $1",
                &[DatabaseValue::Int64(district_id)],
            )
            .await?;

        Ok(!rows.is_empty())
    }

    async fn list_districts(&self) -> Result<Vec<DistrictRow>, DbError> {
        let rows = self
            .db
            .query_raw_params(
                "SELECT id, name, local_name, reputation FROM districts ORDER BY id",
                &[],
            )
            .await?;

        rows.iter()
            .map(|row| {
                Ok(DistrictRow {
                    id: row.to_value("id").map_err(|e| conversion("id", e))?,
                    name: row.to_value("name").unwrap_or_default(),
                    local_name: row.to_value("local_name").unwrap_or(None),
                    reputation: row.to_value("reputation").unwrap_or(None),
                })
            })
            .collect()
    }

    async fn upsert_district(&self, district: &NewDistrict) -> Result<(), DbError> {
        self.db
            .exec_raw_params(
                "INSERT INTO districts (id, name, local_name, boundary)
                 VALUES ($1, $2, $3, ST_Multi(ST_SetSRID(ST_GeomFromGeoJSON($4), 4326)))
                 ON CONFLICT (id) DO UPDATE SET
                     name = EXCLUDED.name,
                     local_name = EXCLUDED.local_name,
                     boundary = EXCLUDED.boundary",
                &[
                    DatabaseValue::Int64(district.id),
                    DatabaseValue::String(district.name.clone()),
                    district
                        .local_name
                        .as_ref()
                        .map_or(DatabaseValue::Null, |n| DatabaseValue::String(n.clone())),
                    DatabaseValue::String(district.boundary_geojson.clone()),
                ],
            )
            .await?;

        Ok(())
    }

    async fn insert_problem(&self, problem: &NewProblem) -> Result<ProblemRow, DbError> {
        let rows = self
            .db
            .query_raw_params(
                "INSERT INTO problems (
                    district_id, location, name, description, category_id,
                    importance, status, image_ref
                 ) VALUES (
                    $1, ST_SetSRID(ST_MakePoint($2, $3), 4326),
                    $4, $5, $6, $7, $8, $9
                 )
                 RETURNING id",
                &[
                    DatabaseValue::Int64(problem.district_id),
                    DatabaseValue::Real64(problem.longitude),
                    DatabaseValue::Real64(problem.latitude),
                    DatabaseValue::String(problem.name.clone()),
                    DatabaseValue::String(problem.description.clone()),
                    DatabaseValue::Int32(problem.category.id()),
                    DatabaseValue::Real64(problem.importance),
                    DatabaseValue::String(problem.status.as_ref().to_string()),
                    problem
                        .image_ref
                        .as_ref()
                        .map_or(DatabaseValue::Null, |r| DatabaseValue::String(r.clone())),
                ],
            )
            .await?;

        let row = rows.first().ok_or_else(|| DbError::Conversion {
            message: "Failed to get problem id from insert".to_string(),
        })?;
        let id: i64 = row.to_value("id").map_err(|e| conversion("id", e))?;

        Ok(ProblemRow {
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
        })
    }

    async fn get_problem(&self, id: i64) -> Result<Option<ProblemRow>, DbError> {
        let rows = self
            .db
            .query_raw_params(
                &format!("SELECT {PROBLEM_COLUMNS} FROM problems p WHERE p.id = $1"),
                &[DatabaseValue::Int64(id)],
            )
            .await?;

        rows.first().map(row_to_problem).transpose()
    }

    async fn list_problems(&self) -> Result<Vec<ProblemRow>, DbError> {
        let rows = self
            .db
            .query_raw_params(
                &format!("SELECT {PROBLEM_COLUMNS} FROM problems p ORDER BY p.id"),
                &[],
            )
            .await?;

        rows.iter().map(row_to_problem).collect()
    }

    async fn list_problems_by_district(
        &self,
        district_id: i64,
    ) -> Result<Vec<ProblemRow>, DbError> {
        let rows = self
            .db
            .query_raw_params(
                &format!(
                    "SELECT {PROBLEM_COLUMNS} FROM problems p
                     WHERE p.district_id = $1 ORDER BY p.id"
                ),
                &[DatabaseValue::Int64(district_id)],
            )
            .await?;

        rows.iter().map(row_to_problem).collect()
    }

    async fn rollup(&self, filter: RollupFilter) -> Result<Vec<RollupRow>, DbError> {
        const AGGREGATES: &str = "COUNT(*) AS prb_count,
             COUNT(*) FILTER (WHERE p.status = 'solved') AS solved_count,
             ROUND(AVG(p.importance)::numeric, 2)::float8 AS avg_importance";

        let mut params: Vec<DatabaseValue> = Vec::new();
        let sql = match filter {
            RollupFilter::District {
                district_id,
                category,
            } => {
                let mut sql = format!(
                    "SELECT p.category_id::bigint AS group_id, c.name AS group_name, {AGGREGATES}
                     FROM problems p
                     JOIN problem_categories c ON c.id = p.category_id
                     WHERE p.district_id = $1"
                );
                params.push(DatabaseValue::Int64(district_id));
                if let Some(category) = category {
                    sql.push_str(" AND p.category_id = $2");
                    params.push(DatabaseValue::Int32(category.id()));
                }
                sql.push_str(" GROUP BY p.category_id, c.name ORDER BY p.category_id");
                sql
            }
            RollupFilter::Category(category) => {
                params.push(DatabaseValue::Int32(category.id()));
                format!(
                    "SELECT p.district_id AS group_id, d.name AS group_name, {AGGREGATES}
                     FROM problems p
                     JOIN districts d ON d.id = p.district_id
                     WHERE p.category_id = $1
                     GROUP BY p.district_id, d.name
                     ORDER BY prb_count DESC"
                )
            }
            RollupFilter::City => format!(
                "SELECT NULL::bigint AS group_id, NULL::text AS group_name, {AGGREGATES}
                 FROM problems p"
            ),
        };

        let rows = self.db.query_raw_params(&sql, &params).await?;

        rows.iter().map(row_to_rollup).collect()
    }

    async fn get_cached_analysis(
        &self,
        scope: Scope,
    ) -> Result<Option<CachedAnalysisRow>, DbError> {
        let rows = self
            .db
            .query_raw_params(
                "SELECT response_text, status, created_at FROM cached_analyses
                 WHERE scope_kind = $1 AND scope_id = $2",
                &scope_params(scope),
            )
            .await?;

        rows.first()
            .map(|row| row_to_analysis(scope, row))
            .transpose()
    }

    async fn put_cached_analysis(
        &self,
        scope: Scope,
        text: &str,
        status: &str,
    ) -> Result<CachedAnalysisRow, DbError> {
        let [kind, id] = scope_params(scope);
        self.db
            .exec_raw_params(
                "INSERT INTO cached_analyses (scope_kind, scope_id, response_text, status, created_at)
                 VALUES ($1, $2, $3, $4, $5)
                 ON CONFLICT (scope_kind, scope_id) DO NOTHING",
                &[
                    kind,
                    id,
                    DatabaseValue::String(text.to_string()),
                    DatabaseValue::String(status.to_string()),
                    DatabaseValue::DateTime(Utc::now().naive_utc()),
                ],
            )
            .await?;

        self.get_cached_analysis(scope)
            .await?
            .ok_or_else(|| DbError::Conversion {
                message: format!("Cached analysis for {scope} missing after insert"),
            })
    }

    async fn delete_cached_analysis(&self, scope: Scope) -> Result<bool, DbError> {
        let deleted = self
            .db
            .exec_raw_params(
                "DELETE FROM cached_analyses WHERE scope_kind = $1 AND scope_id = $2",
                &scope_params(scope),
            )
            .await?;

        Ok(deleted > 0)
    }

    async fn get_density_map(&self) -> Result<Option<DensityMap>, DbError> {
        let rows = self
            .db
            .query_raw_params("SELECT payload FROM cached_density_maps WHERE id = 1", &[])
            .await?;

        let Some(row) = rows.first() else {
            return Ok(None);
        };

        let payload: String = row.to_value("payload").map_err(|e| conversion("payload", e))?;
        Ok(Some(serde_json::from_str(&payload)?))
    }

    async fn put_density_map(&self, map: &DensityMap) -> Result<(), DbError> {
        let payload = serde_json::to_string(map)?;

        self.db
            .exec_raw_params(
                "INSERT INTO cached_density_maps (id, payload, built_at)
                 VALUES (1, $1, $2)
                 ON CONFLICT (id) DO UPDATE SET
                     payload = EXCLUDED.payload,
                     built_at = EXCLUDED.built_at",
                &[
                    DatabaseValue::String(payload),
                    DatabaseValue::DateTime(Utc::now().naive_utc()),
                ],
            )
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use switchy_database::Row;

    use super::*;

    fn message(err: DbError) -> String {
        match err {
            DbError::Conversion { message } => message,
            other => panic!("expected a conversion error, got {other}"),
        }
    }

    #[test]
    fn missing_location_is_a_conversion_error() {
        let row = Row { columns: vec![] };
        let err = row_to_problem(&row).unwrap_err();
        assert!(message(err).contains("longitude"));
    }

    #[test]
    fn null_importance_is_a_conversion_error() {
        let row = Row {
            columns: vec![
                ("longitude".to_string(), DatabaseValue::Real64(76.92)),
                ("latitude".to_string(), DatabaseValue::Real64(43.25)),
                ("importance".to_string(), DatabaseValue::Null),
            ],
        };
        let err = row_to_problem(&row).unwrap_err();
        assert!(message(err).contains("importance"));
    }
}
