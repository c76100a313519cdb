use serde::Serialize;

use crate::config::DEFAULT_LABEL_PROPERTY;
use crate::selection::SelectionResult;

pub const DEFAULT_LABEL: &str = "Road Segment";
pub const PANEL_TITLE: &str = "Selected Road Segment";
pub const NO_PROPERTIES_MESSAGE: &str = "No additional properties available.";
pub const IDLE_MESSAGE: &str = "Click a road on the map to see details.";

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PopupPayload {
    pub title: String,
    /// `[longitude, latitude]` the popup is pinned to.
    pub anchor: [f64; 2],
    pub lines: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PanelEntry {
    pub key: String,
    pub value: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PanelPayload {
    pub title: String,
    pub label: String,
    pub entries: Vec<PanelEntry>,
}

/// What the popup and side panel should show.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DisplayPayload {
    Empty { message: String },
    Selected { popup: PopupPayload, panel: PanelPayload },
}

impl DisplayPayload {
    /// Panel content while nothing has been selected yet.
    pub fn idle() -> Self {
        DisplayPayload::Empty {
            message: IDLE_MESSAGE.to_string(),
        }
    }

    pub fn popup(&self) -> Option<&PopupPayload> {
        match self {
            DisplayPayload::Selected { popup, .. } => Some(popup),
            DisplayPayload::Empty { .. } => None,
        }
    }

    pub fn panel(&self) -> Option<&PanelPayload> {
        match self {
            DisplayPayload::Selected { panel, .. } => Some(panel),
            DisplayPayload::Empty { .. } => None,
        }
    }
}

pub struct SelectionPresenter {
    label_property: String,
}

impl Default for SelectionPresenter {
    fn default() -> Self {
        SelectionPresenter::new(DEFAULT_LABEL_PROPERTY)
    }
}

impl SelectionPresenter {
    pub fn new(label_property: &str) -> Self {
        SelectionPresenter {
            label_property: label_property.to_string(),
        }
    }

    pub fn present(&self, result: Option<&SelectionResult<'_>>) -> DisplayPayload {
        let Some(result) = result else {
            return DisplayPayload::Empty {
                message: NO_PROPERTIES_MESSAGE.to_string(),
            };
        };
        let properties = result.feature.properties();

        let label = properties
            .get(&self.label_property)
            .map(|value| value.to_string())
            .filter(|label| !label.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LABEL.to_string());

        let entries: Vec<PanelEntry> = properties
            .iter()
            .map(|(key, value)| PanelEntry {
                key: key.to_string(),
                value: value.to_string(),
            })
            .collect();

        let lines = if entries.is_empty() {
            vec![NO_PROPERTIES_MESSAGE.to_string()]
        } else {
            entries
                .iter()
                .map(|entry| format!("{}: {}", entry.key, entry.value))
                .collect()
        };

        DisplayPayload::Selected {
            popup: PopupPayload {
                title: label.clone(),
                anchor: result.click.to_tuple(),
                lines,
            },
            panel: PanelPayload {
                title: PANEL_TITLE.to_string(),
                label,
                entries,
            },
        }
    }
}
