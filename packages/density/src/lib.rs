#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Density map builder.
//!
//! Flattens every persisted report into a weighted point (location,
//! category, importance) for client-side heatmap rendering. The map is a
//! full rebuild with no clustering, cached as a single snapshot that is
//! only rebuilt on a miss or when explicitly asked.

use std::sync::Arc;

use problem_map_database::{DbError, ProblemStore};
use problem_map_database_models::{DensityMap, HeatPoint, HeatPointLocation, ProblemRow};
use thiserror::Error;
use tokio::sync::Mutex;

/// Errors that can occur while building the density map.
#[derive(Debug, Error)]
pub enum DensityError {
    /// Store operation failed.
    #[error("Store error: {0}")]
    Store(#[from] DbError),
}

fn heat_point(row: &ProblemRow) -> HeatPoint {
    HeatPoint {
        category: row.category.id(),
        point: HeatPointLocation {
            district_id: row.district_id,
            problem_id: row.id,
            lon: row.longitude,
            lat: row.latitude,
            importance: row.importance,
        },
    }
}

/// Builds the density map from every persisted report.
///
/// # Errors
///
/// Returns [`DensityError::Store`] if the reports cannot be read.
pub async fn build(store: &dyn ProblemStore) -> Result<DensityMap, DensityError> {
    let rows = store.list_problems().await?;
    let heat_points: Vec<HeatPoint> = rows.iter().map(heat_point).collect();

    log::info!("Built density map with {} points", heat_points.len());

    Ok(DensityMap {
        max_points: heat_points.len(),
        heat_points,
    })
}

/// Cached density map snapshot.
///
/// The lock is held across the build so concurrent cold readers trigger a
/// single rebuild.
pub struct DensityMapCache {
    store: Arc<dyn ProblemStore>,
    snapshot: Mutex<Option<DensityMap>>,
}

impl DensityMapCache {
    /// Creates an empty cache over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn ProblemStore>) -> Self {
        Self {
            store,
            snapshot: Mutex::new(None),
        }
    }

    /// Returns the cached map, loading the persisted snapshot or building
    /// and persisting a new one on a miss.
    ///
    /// # Errors
    ///
    /// Returns [`DensityError::Store`] if reading or persisting fails.
    pub async fn get(&self) -> Result<DensityMap, DensityError> {
        let mut snapshot = self.snapshot.lock().await;
        if let Some(map) = snapshot.as_ref() {
            return Ok(map.clone());
        }

        let map = if let Some(map) = self.store.get_density_map().await? {
            log::debug!("Loaded persisted density map ({} points)", map.max_points);
            map
        } else {
            let map = build(self.store.as_ref()).await?;
            self.store.put_density_map(&map).await?;
            map
        };

        *snapshot = Some(map.clone());
        Ok(map)
    }

    /// Rebuilds the map from the current reports and replaces both the
    /// in-memory and persisted snapshots.
    ///
    /// # Errors
    ///
    /// Returns [`DensityError::Store`] if reading or persisting fails. The
    /// previous snapshot is kept in that case.
    pub async fn rebuild(&self) -> Result<DensityMap, DensityError> {
        let mut snapshot = self.snapshot.lock().await;
        let map = build(self.store.as_ref()).await?;
        self.store.put_density_map(&map).await?;
        *snapshot = Some(map.clone());
        Ok(map)
    }
}
