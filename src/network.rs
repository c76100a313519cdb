use geo::{BoundingRect, Coord, LineString};
use geojson::Value as GeometryValue;
use serde_json::Value;

use crate::error::LoadError;
use crate::types::{BoundingCoordinates, Properties};

/// A single road segment as read from the network file.
#[derive(Clone, Debug, PartialEq)]
pub struct Feature {
    geometry: LineString<f64>,
    properties: Properties,
}

impl Feature {
    /// Coordinates are `x = longitude`, `y = latitude`, always at least two.
    pub fn geometry(&self) -> &LineString<f64> {
        &self.geometry
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    pub fn bounds(&self) -> BoundingCoordinates {
        // Non-empty by construction, the fallback is never hit
        let rect = self
            .geometry
            .bounding_rect()
            .unwrap_or_else(|| geo::Rect::new(self.geometry.0[0], self.geometry.0[0]));
        BoundingCoordinates {
            north_latitude: rect.max().y,
            south_latitude: rect.min().y,
            east_longitude: rect.max().x,
            west_longitude: rect.min().x,
        }
    }
}

#[derive(Clone, Debug)]
pub struct NetworkDataset {
    features: Vec<Feature>,
    bounds: BoundingCoordinates,
    skipped: usize,
}

impl NetworkDataset {
    /// Parses a GeoJSON FeatureCollection of line strings.
    ///
    /// Anything that is not a line with at least two finite positions is
    /// skipped and counted, only a payload that is not a feature collection
    /// at all fails the load.
    pub fn load(payload: &[u8]) -> Result<NetworkDataset, LoadError> {
        let json: Value = serde_json::from_slice(payload)?;
        let raw_features = match &json {
            Value::Object(map) => {
                match map.get("type").and_then(Value::as_str) {
                    Some("FeatureCollection") => {}
                    other => {
                        return Err(LoadError::Parse(format!(
                            "expected a FeatureCollection, found {:?}",
                            other.unwrap_or("no type")
                        )))
                    }
                }
                map.get("features")
                    .and_then(Value::as_array)
                    .ok_or_else(|| LoadError::Parse("missing 'features' array".into()))?
            }
            _ => return Err(LoadError::Parse("payload is not a JSON object".into())),
        };

        let mut features = Vec::with_capacity(raw_features.len());
        let mut skipped = 0;
        for raw in raw_features {
            match parse_feature(raw) {
                Some(feature) => features.push(feature),
                None => skipped += 1,
            }
        }

        if skipped > 0 {
            log::warn!("Skipped {} features without a usable line geometry", skipped);
        }
        if features.is_empty() {
            return Err(LoadError::NoLineFeatures { skipped });
        }

        let bounds = features
            .iter()
            .map(Feature::bounds)
            .reduce(|a, b| BoundingCoordinates {
                north_latitude: a.north_latitude.max(b.north_latitude),
                south_latitude: a.south_latitude.min(b.south_latitude),
                east_longitude: a.east_longitude.max(b.east_longitude),
                west_longitude: a.west_longitude.min(b.west_longitude),
            })
            .ok_or(LoadError::NoLineFeatures { skipped })?;

        log::info!("Loaded road network with {} features", features.len());
        Ok(NetworkDataset {
            features,
            bounds,
            skipped,
        })
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn feature(&self, index: usize) -> Option<&Feature> {
        self.features.get(index)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn bounds(&self) -> BoundingCoordinates {
        self.bounds
    }

    /// Number of source features dropped while loading.
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

fn parse_feature(raw: &Value) -> Option<Feature> {
    let feature: geojson::Feature = serde_json::from_value(raw.clone()).ok()?;
    let positions = match feature.geometry.as_ref().map(|g| &g.value) {
        Some(GeometryValue::LineString(positions)) => positions,
        _ => return None,
    };
    if positions.len() < 2 {
        return None;
    }

    let mut coords = Vec::with_capacity(positions.len());
    for position in positions {
        match position.as_slice() {
            [lng, lat, ..] if lng.is_finite() && lat.is_finite() => {
                coords.push(Coord { x: *lng, y: *lat })
            }
            _ => return None,
        }
    }

    let properties = feature
        .properties
        .as_ref()
        .map(Properties::from_json)
        .unwrap_or_default();

    Some(Feature {
        geometry: LineString::new(coords),
        properties,
    })
}
