use geo::{Closest, ClosestPoint, Coord, Line, LineString, Point};

use crate::index::{meters_per_degree_longitude, SpatialIndex, METERS_PER_DEGREE};
use crate::network::Feature;
use crate::types::Location;

/// The road segment a click resolved to.
#[derive(Clone, Copy, Debug)]
pub struct SelectionResult<'a> {
    pub feature: &'a Feature,
    /// Position of `feature` in the dataset.
    pub feature_index: usize,
    pub click: Location,
    pub distance_meters: f64,
}

/// Nearest feature to `point` within `tolerance_meters`, if any.
///
/// Equal distances go to the feature listed first in the dataset.
pub fn select(
    index: &SpatialIndex,
    point: Location,
    tolerance_meters: f64,
) -> Option<SelectionResult<'_>> {
    let mut best: Option<(usize, f64)> = None;
    for candidate in index.query(&point, tolerance_meters) {
        let Some(feature) = index.dataset().feature(candidate) else {
            continue;
        };
        let distance = polyline_distance_meters(&point, feature.geometry());
        if distance.is_nan() || distance > tolerance_meters {
            continue;
        }
        best = match best {
            Some((current, current_distance))
                if current_distance < distance
                    || (current_distance == distance && current < candidate) =>
            {
                Some((current, current_distance))
            }
            _ => Some((candidate, distance)),
        };
    }

    let (feature_index, distance_meters) = best?;
    Some(SelectionResult {
        feature: index.dataset().feature(feature_index)?,
        feature_index,
        click: point,
        distance_meters,
    })
}

/// Shortest perpendicular distance in meters from `point` to any segment of
/// `line_string`.
///
/// Works in a local equirectangular plane centred on `point`, accurate for
/// the street-scale tolerances clicks are resolved at.
pub fn polyline_distance_meters(point: &Location, line_string: &LineString<f64>) -> f64 {
    let lng_scale = meters_per_degree_longitude(point.latitude);
    let project = |c: Coord<f64>| Coord {
        x: (c.x - point.longitude) * lng_scale,
        y: (c.y - point.latitude) * METERS_PER_DEGREE,
    };
    let origin = Point::new(0.0, 0.0);

    line_string
        .lines()
        .map(|line| {
            let projected = Line::new(project(line.start), project(line.end));
            match projected.closest_point(&origin) {
                Closest::Intersection(p) | Closest::SinglePoint(p) => p.x().hypot(p.y()),
                // Zero-length segment
                Closest::Indeterminate => projected.start.x.hypot(projected.start.y),
            }
        })
        .fold(f64::INFINITY, f64::min)
}
