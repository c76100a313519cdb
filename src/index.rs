use std::cmp::{Ord, Ordering, PartialOrd};
use std::collections::HashSet;
use std::fmt;

use rstar::{RTree, RTreeObject, AABB};

use crate::network::NetworkDataset;
use crate::types::{BoundingCoordinates, Location};

pub const EARTH_RADIUS_M: f64 = 6371000.0;
/// Length of one degree of latitude (and of longitude at the equator).
pub const METERS_PER_DEGREE: f64 = EARTH_RADIUS_M * std::f64::consts::PI / 180.0;
// Keeps longitude scaling finite at the poles
const MIN_LONGITUDE_SCALE: f64 = 1e-6;

#[derive(Clone, Copy)]
pub(crate) struct OrderedFloat(pub f64);

impl Ord for OrderedFloat {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl PartialOrd for OrderedFloat {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for OrderedFloat {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OrderedFloat {}

impl fmt::Debug for OrderedFloat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OrderedFloat({})", self.0)
    }
}

/// Meters covered by one degree of longitude at `latitude`.
///
/// Shared by the index pre-filter and the exact distance computation so both
/// agree on what "within tolerance" means.
pub fn meters_per_degree_longitude(latitude: f64) -> f64 {
    METERS_PER_DEGREE * latitude.to_radians().cos().max(MIN_LONGITUDE_SCALE)
}

pub fn distance_meters(a: &Location, b: &Location) -> f64 {
    let ap = haversine_rs::point::Point {
        latitude: a.latitude,
        longitude: a.longitude,
    };
    let bp = haversine_rs::point::Point {
        latitude: b.latitude,
        longitude: b.longitude,
    };
    haversine_rs::distance(ap, bp, haversine_rs::units::Unit::Meters)
}

// One consecutive vertex pair of a feature's polyline
struct IndexedSegment {
    feature: usize,
    start: [f64; 2],
    end: [f64; 2],
}

impl RTreeObject for IndexedSegment {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.start, self.end)
    }
}

/// Read-only R-tree over every segment of a [`NetworkDataset`].
///
/// Each leaf holds a single segment and the tree is bulk loaded, so node
/// extents follow the dataset's own density and bounding box rather than a
/// hand-picked cell size. The index owns its dataset; a new dataset means a
/// new index.
pub struct SpatialIndex {
    dataset: NetworkDataset,
    tree: RTree<IndexedSegment>,
    feature_bounds: Vec<BoundingCoordinates>,
}

impl SpatialIndex {
    pub fn build(dataset: NetworkDataset) -> SpatialIndex {
        let segments: Vec<IndexedSegment> = dataset
            .features()
            .iter()
            .enumerate()
            .flat_map(|(feature, f)| {
                f.geometry().lines().map(move |line| IndexedSegment {
                    feature,
                    start: [line.start.x, line.start.y],
                    end: [line.end.x, line.end.y],
                })
            })
            .collect();
        let feature_bounds = dataset.features().iter().map(|f| f.bounds()).collect();

        log::info!("Indexed {} segments of {} features", segments.len(), dataset.len());
        SpatialIndex {
            tree: RTree::bulk_load(segments),
            feature_bounds,
            dataset,
        }
    }

    pub fn dataset(&self) -> &NetworkDataset {
        &self.dataset
    }

    /// Candidate features that may lie within `tolerance_meters` of `point`,
    /// nearest bounding box first, ties broken by feature index.
    ///
    /// Never misses a feature within tolerance; may return some that are not.
    pub fn query(&self, point: &Location, tolerance_meters: f64) -> Vec<usize> {
        if !point.is_finite() || !tolerance_meters.is_finite() || tolerance_meters < 0.0 {
            return Vec::new();
        }

        // Slightly wider than the tolerance to absorb rounding at the edge
        let padded = tolerance_meters * (1.0 + 1e-9) + 1e-6;
        let dlat = padded / METERS_PER_DEGREE;
        let dlng = padded / meters_per_degree_longitude(point.latitude);
        let envelope = AABB::from_corners(
            [point.longitude - dlng, point.latitude - dlat],
            [point.longitude + dlng, point.latitude + dlat],
        );

        let mut seen = HashSet::new();
        let mut candidates: Vec<(OrderedFloat, usize)> = self
            .tree
            .locate_in_envelope_intersecting(&envelope)
            .filter(|segment| seen.insert(segment.feature))
            .map(|segment| {
                let distance = self.bounds_distance(segment.feature, point);
                (OrderedFloat(distance), segment.feature)
            })
            .collect();
        candidates.sort();

        log::debug!(
            "Query at ({}, {}) within {}m: {} candidates",
            point.longitude,
            point.latitude,
            tolerance_meters,
            candidates.len()
        );
        candidates.into_iter().map(|(_, feature)| feature).collect()
    }

    fn bounds_distance(&self, feature: usize, point: &Location) -> f64 {
        let bounds = &self.feature_bounds[feature];
        distance_meters(point, &bounds.clamp(point))
    }
}
