//! Loading the district reference dataset into the store.

use std::path::Path;

use problem_map_database::ProblemStore;
use problem_map_database_models::NewDistrict;
use problem_map_spatial::dataset::parse_feature_collection;

use crate::DistrictError;

/// Parses a district `FeatureCollection` and upserts every valid feature.
///
/// Returns the number of districts written. Loading the same dataset twice
/// leaves the store unchanged.
///
/// # Errors
///
/// Returns [`DistrictError`] if the text is not a feature collection or a
/// store write fails.
pub async fn load_districts(store: &dyn ProblemStore, text: &str) -> Result<u64, DistrictError> {
    let features = parse_feature_collection(text)?;

    let mut written = 0u64;
    for feature in features {
        store
            .upsert_district(&NewDistrict {
                id: feature.id,
                name: feature.name,
                local_name: feature.local_name,
                boundary_geojson: feature.boundary_geojson,
            })
            .await?;
        written += 1;
    }

    log::info!("Loaded {written} districts");

    Ok(written)
}

/// Reads a `GeoJSON` file and loads it with [`load_districts`].
///
/// # Errors
///
/// Returns [`DistrictError::Io`] if the file cannot be read, otherwise the
/// same errors as [`load_districts`].
pub async fn load_file(store: &dyn ProblemStore, path: &Path) -> Result<u64, DistrictError> {
    log::info!("Reading districts from {}", path.display());
    let text = tokio::fs::read_to_string(path).await?;
    load_districts(store, &text).await
}
