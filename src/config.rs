use serde::{Deserialize, Serialize};

pub const DEFAULT_SOURCE_URL: &str = "/map/road_network.geojson";
pub const DEFAULT_TOLERANCE_METERS: f64 = 15.0;
pub const DEFAULT_LABEL_PROPERTY: &str = "RD_NAME";

/// Camera settings handed through to the host map, untouched by this crate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    /// `[longitude, latitude]`
    pub center: [f64; 2],
    pub zoom: f64,
    pub style: String,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        ViewportConfig {
            // Singapore
            center: [103.8198, 1.3521],
            zoom: 11.0,
            style: "mapbox://styles/mapbox/streets-v11".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub source_url: String,
    pub base_url: Option<String>,
    pub tolerance_meters: f64,
    pub label_property: String,
    pub viewport: ViewportConfig,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        DashboardConfig {
            source_url: DEFAULT_SOURCE_URL.to_string(),
            base_url: None,
            tolerance_meters: DEFAULT_TOLERANCE_METERS,
            label_property: DEFAULT_LABEL_PROPERTY.to_string(),
            viewport: ViewportConfig::default(),
        }
    }
}

impl DashboardConfig {
    pub fn from_json(config_json: &str) -> Result<Self, String> {
        let config: DashboardConfig =
            serde_json::from_str(config_json).map_err(|e| e.to_string())?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.tolerance_meters.is_finite() || self.tolerance_meters < 0.0 {
            return Err(format!(
                "tolerance_meters must be a finite, non-negative distance, got {}",
                self.tolerance_meters
            ));
        }
        if self.source_url.trim().is_empty() {
            return Err("source_url must not be empty".to_string());
        }
        Ok(())
    }
}
