//! Point encoding for the spatial store.
//!
//! Points travel to the store as `POINT(<lon> <lat>)` well-known text and
//! get SRID 4326 applied by the query itself. Longitude always comes first.

use crate::CodecError;

/// Latitude magnitude above which a pair is assumed to be swapped when
/// the longitude is below it. Tuned for cities east of 60°E and south of
/// 60°N.
pub const DEFAULT_SWAP_THRESHOLD: f64 = 60.0;

/// A WGS84 coordinate, longitude first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    /// Longitude in degrees.
    pub longitude: f64,
    /// Latitude in degrees.
    pub latitude: f64,
}

impl GeoPoint {
    /// Creates a point from a `(longitude, latitude)` pair.
    #[must_use]
    pub const fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }

    /// Returns the point as a `geo` point (x = longitude, y = latitude).
    #[must_use]
    pub fn to_geo(self) -> geo::Point<f64> {
        geo::Point::new(self.longitude, self.latitude)
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.longitude, self.latitude)
    }
}

/// Outcome of [`SwapRepair::repair`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RepairedPoint {
    /// The point in `(longitude, latitude)` order.
    pub point: GeoPoint,
    /// `true` when the input looked swapped and was corrected.
    pub swapped: bool,
}

/// Heuristic correction for callers that send `(latitude, longitude)`.
///
/// A pair is swapped back when its latitude cannot be a latitude (outside
/// ±90) while the longitude could be one, or when the latitude's magnitude
/// exceeds the locale threshold while the longitude's does not. This is a
/// guess, not a proof: a deployment north of the threshold must disable it
/// or raise the threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwapRepair {
    threshold: Option<f64>,
}

impl Default for SwapRepair {
    fn default() -> Self {
        Self::with_threshold(DEFAULT_SWAP_THRESHOLD)
    }
}

impl SwapRepair {
    /// Repairs pairs whose latitude magnitude exceeds `threshold`.
    #[must_use]
    pub const fn with_threshold(threshold: f64) -> Self {
        Self {
            threshold: Some(threshold),
        }
    }

    /// Only repairs pairs that are impossible as given (latitude beyond ±90).
    #[must_use]
    pub const fn disabled() -> Self {
        Self { threshold: None }
    }

    /// Reads `COORDINATE_SWAP_THRESHOLD` from the environment.
    ///
    /// `off` disables the threshold check; unset or unparsable values fall
    /// back to [`DEFAULT_SWAP_THRESHOLD`].
    #[must_use]
    pub fn from_env() -> Self {
        match std::env::var("COORDINATE_SWAP_THRESHOLD") {
            Ok(v) if v.eq_ignore_ascii_case("off") => Self::disabled(),
            Ok(v) => v.parse().map_or_else(
                |_| {
                    log::warn!("Ignoring invalid COORDINATE_SWAP_THRESHOLD={v}");
                    Self::default()
                },
                Self::with_threshold,
            ),
            Err(_) => Self::default(),
        }
    }

    /// Validates a raw pair and corrects an apparent swap.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::NonFinite`] for NaN/infinite input and
    /// [`CodecError::OutOfRange`] when the (repaired) pair is not a valid
    /// WGS84 coordinate.
    pub fn repair(&self, longitude: f64, latitude: f64) -> Result<RepairedPoint, CodecError> {
        if !longitude.is_finite() || !latitude.is_finite() {
            return Err(CodecError::NonFinite {
                longitude,
                latitude,
            });
        }

        let impossible = latitude.abs() > 90.0 && longitude.abs() <= 90.0;
        let implausible = self
            .threshold
            .is_some_and(|t| latitude.abs() > t && longitude.abs() <= t);

        let (point, swapped) = if impossible || implausible {
            (GeoPoint::new(latitude, longitude), true)
        } else {
            (GeoPoint::new(longitude, latitude), false)
        };

        if point.longitude.abs() > 180.0 || point.latitude.abs() > 90.0 {
            return Err(CodecError::OutOfRange {
                longitude: point.longitude,
                latitude: point.latitude,
            });
        }

        if swapped {
            log::warn!(
                "Coordinate pair ({longitude}, {latitude}) looks like (lat, lon); using {point}"
            );
        }

        Ok(RepairedPoint { point, swapped })
    }
}

/// Encodes a point as `POINT(<lon> <lat>)`.
///
/// # Errors
///
/// Returns [`CodecError::NonFinite`] for NaN/infinite coordinates and
/// [`CodecError::Encoding`] if the produced text does not decode back to
/// the same point.
pub fn encode_wkt(point: GeoPoint) -> Result<String, CodecError> {
    if !point.longitude.is_finite() || !point.latitude.is_finite() {
        return Err(CodecError::NonFinite {
            longitude: point.longitude,
            latitude: point.latitude,
        });
    }

    let text = format!("POINT({} {})", point.longitude, point.latitude);

    match decode_wkt(&text) {
        Ok(decoded) if decoded == point => Ok(text),
        Ok(decoded) => Err(CodecError::Encoding {
            message: format!("{text} decodes to {decoded}, expected {point}"),
        }),
        Err(e) => Err(CodecError::Encoding {
            message: format!("{text} is not valid WKT: {e}"),
        }),
    }
}

/// Decodes `POINT(<x> <y>)` text (case-insensitive, whitespace tolerant).
///
/// # Errors
///
/// Returns [`CodecError::Decoding`] if the text is not a two-dimensional
/// point.
pub fn decode_wkt(text: &str) -> Result<GeoPoint, CodecError> {
    let decoding = |message: &str| CodecError::Decoding {
        message: format!("{message}: {text:?}"),
    };

    let trimmed = text.trim();
    let Some(keyword) = trimmed.get(..5) else {
        return Err(decoding("too short"));
    };
    if !keyword.eq_ignore_ascii_case("POINT") {
        return Err(decoding("not a POINT"));
    }

    let body = trimmed[5..].trim();
    let inner = body
        .strip_prefix('(')
        .and_then(|b| b.strip_suffix(')'))
        .ok_or_else(|| decoding("missing parentheses"))?;

    let mut parts = inner.split_whitespace();
    let (Some(x), Some(y), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(decoding("expected exactly two ordinates"));
    };

    let x: f64 = x.parse().map_err(|_| decoding("invalid x ordinate"))?;
    let y: f64 = y.parse().map_err(|_| decoding("invalid y ordinate"))?;

    Ok(GeoPoint::new(x, y))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_longitude_first() {
        let wkt = encode_wkt(GeoPoint::new(76.945, 43.255)).unwrap();
        assert_eq!(wkt, "POINT(76.945 43.255)");
    }

    #[test]
    fn decodes_loose_formatting() {
        let point = decode_wkt("  point ( -0.5   51.25 ) ").unwrap();
        assert_eq!(point, GeoPoint::new(-0.5, 51.25));
    }

    #[test]
    fn rejects_non_points() {
        assert!(decode_wkt("LINESTRING(0 0, 1 1)").is_err());
        assert!(decode_wkt("POINT(1)").is_err());
        assert!(decode_wkt("POINT(1 2 3)").is_err());
        assert!(decode_wkt("POINT 1 2").is_err());
    }

    #[test]
    fn encode_rejects_nan() {
        assert!(matches!(
            encode_wkt(GeoPoint::new(f64::NAN, 1.0)),
            Err(CodecError::NonFinite { .. })
        ));
    }

    #[test]
    fn repair_keeps_well_formed_pairs() {
        let repaired = SwapRepair::default().repair(76.9, 43.2).unwrap();
        assert!(!repaired.swapped);
        assert_eq!(repaired.point, GeoPoint::new(76.9, 43.2));
    }

    #[test]
    fn repair_swaps_pairs_above_threshold() {
        let repaired = SwapRepair::default().repair(43.2, 76.9).unwrap();
        assert!(repaired.swapped);
        assert_eq!(repaired.point, GeoPoint::new(76.9, 43.2));
    }

    #[test]
    fn disabled_repair_still_fixes_impossible_latitudes() {
        let repair = SwapRepair::disabled();
        assert!(!repair.repair(24.9, 60.2).unwrap().swapped);

        let repaired = repair.repair(43.2, 120.5).unwrap();
        assert!(repaired.swapped);
        assert_eq!(repaired.point, GeoPoint::new(120.5, 43.2));
    }

    #[test]
    fn repair_rejects_out_of_range() {
        assert!(matches!(
            SwapRepair::default().repair(200.0, 95.0),
            Err(CodecError::OutOfRange { .. })
        ));
        assert!(matches!(
            SwapRepair::default().repair(f64::INFINITY, 1.0),
            Err(CodecError::NonFinite { .. })
        ));
    }
}
