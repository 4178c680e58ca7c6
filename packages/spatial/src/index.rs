//! In-memory spatial index for district attribution.
//!
//! Builds an R-tree over district polygons and answers the same
//! "which district contains this point" question the `PostGIS` store does.

use geo::{BoundingRect, Contains, MultiPolygon};
use rstar::{AABB, RTree, RTreeObject};

use crate::GeoPoint;

/// A district polygon stored in the R-tree with its metadata.
struct DistrictEntry {
    district_id: i64,
    name: String,
    envelope: AABB<[f64; 2]>,
    polygon: MultiPolygon<f64>,
}

impl RTreeObject for DistrictEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// A district whose boundary contains a queried point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistrictHit<'a> {
    /// External district id.
    pub district_id: i64,
    /// District display name.
    pub name: &'a str,
}

/// Pre-built R-tree over district boundaries.
pub struct DistrictIndex {
    districts: RTree<DistrictEntry>,
}

impl DistrictIndex {
    /// Bulk-loads `(id, name, boundary)` triples into a new index.
    #[must_use]
    pub fn build(districts: impl IntoIterator<Item = (i64, String, MultiPolygon<f64>)>) -> Self {
        let entries: Vec<DistrictEntry> = districts
            .into_iter()
            .map(|(district_id, name, polygon)| DistrictEntry {
                district_id,
                name,
                envelope: compute_envelope(&polygon),
                polygon,
            })
            .collect();

        log::debug!("Building district index over {} polygons", entries.len());

        Self {
            districts: RTree::bulk_load(entries),
        }
    }

    /// Number of indexed districts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.districts.size()
    }

    /// Whether the index holds no districts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.districts.size() == 0
    }

    /// Returns every district containing the point, ordered by id.
    ///
    /// Districts are expected to tile the city without overlap, so more
    /// than one hit means the dataset is inconsistent; callers decide what
    /// to do with that.
    #[must_use]
    pub fn containing(&self, point: GeoPoint) -> Vec<DistrictHit<'_>> {
        let geo_point = point.to_geo();
        let query_env = AABB::from_point([point.longitude, point.latitude]);

        let mut hits: Vec<DistrictHit<'_>> = self
            .districts
            .locate_in_envelope_intersecting(&query_env)
            .filter(|entry| entry.polygon.contains(&geo_point))
            .map(|entry| DistrictHit {
                district_id: entry.district_id,
                name: &entry.name,
            })
            .collect();

        hits.sort_by_key(|hit| hit.district_id);
        hits
    }
}

/// Compute the bounding box envelope for a [`MultiPolygon`].
fn compute_envelope(mp: &MultiPolygon<f64>) -> AABB<[f64; 2]> {
    mp.bounding_rect().map_or_else(
        || AABB::from_point([0.0, 0.0]),
        |rect| AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
    )
}

#[cfg(test)]
mod tests {
    use geo::{LineString, Polygon};

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

    fn two_districts() -> DistrictIndex {
        DistrictIndex::build([
            (10, "West".to_string(), square(76.80, 43.20, 0.10)),
            (20, "East".to_string(), square(76.90, 43.20, 0.10)),
        ])
    }

    #[test]
    fn finds_containing_district() {
        let index = two_districts();
        let hits = index.containing(GeoPoint::new(76.95, 43.25));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].district_id, 20);
        assert_eq!(hits[0].name, "East");
    }

    #[test]
    fn misses_outside_every_district() {
        let index = two_districts();
        assert!(index.containing(GeoPoint::new(77.50, 43.25)).is_empty());
    }

    #[test]
    fn overlapping_hits_are_ordered_by_id() {
        let index = DistrictIndex::build([
            (7, "B".to_string(), square(0.0, 0.0, 2.0)),
            (3, "A".to_string(), square(0.0, 0.0, 2.0)),
        ]);
        let ids: Vec<i64> = index
            .containing(GeoPoint::new(1.0, 1.0))
            .iter()
            .map(|h| h.district_id)
            .collect();
        assert_eq!(ids, vec![3, 7]);
    }
}
