//! District reference dataset parsing.
//!
//! Districts come from a static `GeoJSON` `FeatureCollection` exported from
//! `OpenStreetMap`. Each feature carries the relation id, an English and a
//! local name, and a `Polygon` or `MultiPolygon` boundary.

use geo::MultiPolygon;
use geojson::{Feature, GeoJson, Geometry};

use crate::SpatialError;

/// Property holding the `OpenStreetMap` relation id (string or number).
const ID_PROPERTY: &str = "osm-relation-id";

/// Property holding the district's English name.
const NAME_PROPERTY: &str = "name";

/// Property holding the district's local-language name.
const LOCAL_NAME_PROPERTY: &str = "nameRu";

/// A district parsed from the reference dataset.
#[derive(Debug, Clone)]
pub struct DistrictFeature {
    /// External, stable district id.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Local-language name, if the dataset has one.
    pub local_name: Option<String>,
    /// Boundary as a multi-polygon (single polygons are wrapped).
    pub boundary: MultiPolygon<f64>,
    /// Boundary as `GeoJSON` text, for `ST_GeomFromGeoJSON`.
    pub boundary_geojson: String,
}

/// Parses a district `FeatureCollection`.
///
/// Features without an id, a name, or a polygonal geometry are skipped
/// with a warning.
///
/// # Errors
///
/// Returns [`SpatialError`] if the text is not `GeoJSON` or is not a
/// `FeatureCollection`.
pub fn parse_feature_collection(text: &str) -> Result<Vec<DistrictFeature>, SpatialError> {
    let geojson: GeoJson = text.parse()?;

    let GeoJson::FeatureCollection(collection) = geojson else {
        return Err(SpatialError::InvalidFeature {
            message: "expected a FeatureCollection at the top level".to_string(),
        });
    };

    let total = collection.features.len();
    let districts: Vec<DistrictFeature> = collection
        .features
        .iter()
        .enumerate()
        .filter_map(|(i, feature)| match parse_feature(feature) {
            Ok(district) => Some(district),
            Err(e) => {
                log::warn!("Skipping district feature #{i}: {e}");
                None
            }
        })
        .collect();

    log::info!("Parsed {} of {total} district features", districts.len());

    Ok(districts)
}

fn parse_feature(feature: &Feature) -> Result<DistrictFeature, SpatialError> {
    let invalid = |message: &str| SpatialError::InvalidFeature {
        message: message.to_string(),
    };

    let id = match feature.property(ID_PROPERTY) {
        Some(serde_json::Value::String(s)) => s.trim().parse::<i64>().ok(),
        Some(serde_json::Value::Number(n)) => n.as_i64(),
        _ => None,
    }
    .ok_or_else(|| invalid("missing or non-integer osm-relation-id"))?;

    let name = feature
        .property(NAME_PROPERTY)
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| invalid("missing name"))?
        .to_string();

    let local_name = feature
        .property(LOCAL_NAME_PROPERTY)
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string);

    let geometry = feature
        .geometry
        .as_ref()
        .ok_or_else(|| invalid("missing geometry"))?;

    Ok(DistrictFeature {
        id,
        name,
        local_name,
        boundary: to_multi_polygon(geometry)?,
        boundary_geojson: serde_json::to_string(geometry)?,
    })
}

/// Parses `GeoJSON` geometry text into a multi-polygon boundary.
///
/// # Errors
///
/// Returns [`SpatialError`] if the text is not a `GeoJSON` geometry or is
/// not polygonal.
pub fn parse_boundary(text: &str) -> Result<MultiPolygon<f64>, SpatialError> {
    let geometry: Geometry = serde_json::from_str(text)?;
    to_multi_polygon(&geometry)
}

fn to_multi_polygon(geometry: &Geometry) -> Result<MultiPolygon<f64>, SpatialError> {
    let geo_geom: geo::Geometry<f64> = geometry.clone().try_into()?;
    match geo_geom {
        geo::Geometry::MultiPolygon(mp) => Ok(mp),
        geo::Geometry::Polygon(p) => Ok(MultiPolygon(vec![p])),
        _ => Err(SpatialError::InvalidFeature {
            message: "geometry is not a Polygon or MultiPolygon".to_string(),
        }),
    }
}
