use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
// ** Coordinates **

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    /// Builds a location from a GeoJSON-ordered `[longitude, latitude]` pair.
    pub fn from_lng_lat(longitude: f64, latitude: f64) -> Self {
        Location {
            latitude,
            longitude,
        }
    }

    pub fn to_tuple(&self) -> [f64; 2] {
        [self.longitude, self.latitude]
    }

    pub fn is_finite(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingCoordinates {
    pub north_latitude: f64,
    pub south_latitude: f64,
    pub east_longitude: f64,
    pub west_longitude: f64,
}

impl BoundingCoordinates {
    pub fn contains(&self, location: &Location) -> bool {
        (self.south_latitude..=self.north_latitude).contains(&location.latitude)
            && (self.west_longitude..=self.east_longitude).contains(&location.longitude)
    }

    /// Closest location inside the box, the location itself when it is inside.
    pub fn clamp(&self, location: &Location) -> Location {
        Location {
            latitude: location.latitude.clamp(self.south_latitude, self.north_latitude),
            longitude: location.longitude.clamp(self.west_longitude, self.east_longitude),
        }
    }
}

// ** Feature attributes **

#[derive(Clone, Debug, PartialEq)]
pub enum PropertyValue {
    Text(String),
    Number(f64),
    Null,
}

impl From<&JsonValue> for PropertyValue {
    fn from(value: &JsonValue) -> Self {
        match value {
            JsonValue::Null => PropertyValue::Null,
            JsonValue::String(s) => PropertyValue::Text(s.clone()),
            JsonValue::Number(n) => match n.as_f64() {
                Some(number) => PropertyValue::Number(number),
                None => PropertyValue::Text(n.to_string()),
            },
            // Booleans and nested values are kept as their JSON text
            other => PropertyValue::Text(other.to_string()),
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Text(s) => f.write_str(s),
            PropertyValue::Number(n) => write!(f, "{}", n),
            PropertyValue::Null => f.write_str("null"),
        }
    }
}

/// Attribute bag of a road segment, in the order the source listed them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Properties(Vec<(String, PropertyValue)>);

impl Properties {
    pub fn from_json(object: &serde_json::Map<String, JsonValue>) -> Self {
        Properties(
            object
                .iter()
                .map(|(key, value)| (key.clone(), PropertyValue::from(value)))
                .collect(),
        )
    }

    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
