//! Point-in-district resolution.

use problem_map_database::ProblemStore;
use problem_map_database_models::DistrictRef;
use problem_map_spatial::{GeoPoint, codec::encode_wkt};

use crate::DistrictError;

/// Finds the district containing `point`.
///
/// Districts are expected not to overlap. When the store reports more than
/// one match the lowest id wins and the overlap is logged.
///
/// # Errors
///
/// * [`DistrictError::NotFound`] if no boundary contains the point
/// * [`DistrictError::ResolutionFailed`] if the store query fails
/// * [`DistrictError::Codec`] if the point cannot be encoded
pub async fn resolve(
    store: &dyn ProblemStore,
    point: GeoPoint,
) -> Result<DistrictRef, DistrictError> {
    let wkt = encode_wkt(point)?;

    let mut matches = store
        .find_districts(&wkt)
        .await
        .map_err(DistrictError::ResolutionFailed)?;

    if matches.len() > 1 {
        let ids: Vec<i64> = matches.iter().map(|d| d.id).collect();
        log::warn!(
            "Point {point} lies in {} districts {ids:?}; using {}",
            matches.len(),
            ids[0]
        );
    }

    if matches.is_empty() {
        return Err(DistrictError::NotFound { point });
    }

    let district = matches.swap_remove(0);
    log::debug!("Resolved {point} to district {} ({})", district.id, district.name);

    Ok(district)
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use geo::{LineString, MultiPolygon, Polygon};
    use problem_map_database::{DbError, MemoryStore};
    use problem_map_database_models::{
        CachedAnalysisRow, DensityMap, DistrictRow, NewDistrict, NewProblem, ProblemRow,
        RollupFilter, RollupRow,
    };
    use problem_map_problem_models::Scope;

    use super::*;

    fn square(min_x: f64, min_y: f64, size: f64) -> MultiPolygon<f64> {
        let ring = LineString::from(vec![
            (min_x, min_y),
            (min_x + size, min_y),
            (min_x + size, min_y + size),
            (min_x, min_y + size),
            (min_x, min_y),
        ]);
        MultiPolygon(vec![Polygon::new(ring, vec![])])
    }

    /// Store whose every query fails, as if the connection were down.
    struct UnreachableStore;

    fn down() -> DbError {
        DbError::Conversion {
            message: "connection refused".to_string(),
        }
    }

    #[async_trait]
    impl ProblemStore for UnreachableStore {
        async fn find_districts(&self, _: &str) -> Result<Vec<DistrictRef>, DbError> {
            Err(down())
        }
        async fn district_exists(&self, _: i64) -> Result<bool, DbError> {
            Err(down())
        }
        async fn list_districts(&self) -> Result<Vec<DistrictRow>, DbError> {
            Err(down())
        }
        async fn upsert_district(&self, _: &NewDistrict) -> Result<(), DbError> {
            Err(down())
        }
        async fn insert_problem(&self, _: &NewProblem) -> Result<ProblemRow, DbError> {
            Err(down())
        }
        async fn get_problem(&self, _: i64) -> Result<Option<ProblemRow>, DbError> {
            Err(down())
        }
        async fn list_problems(&self) -> Result<Vec<ProblemRow>, DbError> {
            Err(down())
        }
        async fn list_problems_by_district(&self, _: i64) -> Result<Vec<ProblemRow>, DbError> {
            Err(down())
        }
        async fn rollup(&self, _: RollupFilter) -> Result<Vec<RollupRow>, DbError> {
            Err(down())
        }
        async fn get_cached_analysis(&self, _: Scope) -> Result<Option<CachedAnalysisRow>, DbError> {
            Err(down())
        }
        async fn put_cached_analysis(
            &self,
            _: Scope,
            _: &str,
            _: &str,
        ) -> Result<CachedAnalysisRow, DbError> {
            Err(down())
        }
        async fn delete_cached_analysis(&self, _: Scope) -> Result<bool, DbError> {
            Err(down())
        }
        async fn get_density_map(&self) -> Result<Option<DensityMap>, DbError> {
            Err(down())
        }
        async fn put_density_map(&self, _: &DensityMap) -> Result<(), DbError> {
            Err(down())
        }
    }

    #[tokio::test]
    async fn resolves_point_inside_district() {
        let store = MemoryStore::new();
        store.add_district(3_072_217, "Almaly", square(76.90, 43.24, 0.04));
        store.add_district(3_390_291, "Bostandyq", square(76.88, 43.18, 0.06));

        let district = resolve(&store, GeoPoint::new(76.92, 43.25)).await.unwrap();
        assert_eq!(district.id, 3_072_217);
        assert_eq!(district.name, "Almaly");
    }

    #[tokio::test]
    async fn point_outside_every_district_is_not_found() {
        let store = MemoryStore::new();
        store.add_district(1, "Only", square(0.0, 0.0, 1.0));

        let err = resolve(&store, GeoPoint::new(5.0, 5.0)).await.unwrap_err();
        assert!(matches!(err, DistrictError::NotFound { point } if point == GeoPoint::new(5.0, 5.0)));
    }

    #[tokio::test]
    async fn overlap_takes_lowest_id() {
        let store = MemoryStore::new();
        store.add_district(9, "Later", square(0.0, 0.0, 2.0));
        store.add_district(4, "Earlier", square(0.0, 0.0, 2.0));

        let district = resolve(&store, GeoPoint::new(1.0, 1.0)).await.unwrap();
        assert_eq!(district.id, 4);
    }

    #[tokio::test]
    async fn store_failure_is_resolution_failed() {
        let err = resolve(&UnreachableStore, GeoPoint::new(1.0, 1.0))
            .await
            .unwrap_err();
        assert!(matches!(err, DistrictError::ResolutionFailed(_)));
    }

    #[tokio::test]
    async fn non_finite_point_fails_before_query() {
        let err = resolve(&UnreachableStore, GeoPoint::new(f64::NAN, 1.0))
            .await
            .unwrap_err();
        assert!(matches!(err, DistrictError::Codec(_)));
    }
}
