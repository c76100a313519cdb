use std::cell::RefCell;
use std::rc::Rc;
use std::str::FromStr;

use log::Level;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;
use wasm_bindgen_futures::js_sys;

pub mod config;
pub mod error;
pub mod index;
pub mod network;
pub mod network_fetcher;
pub mod presenter;
pub mod selection;
pub mod session;
pub mod types;

use self::config::DashboardConfig;
use self::network_fetcher::load_network;
use self::presenter::DisplayPayload;
use self::session::{ClickEvent, DashboardSession, LoadOutcome, SelectionChange, SelectionListener};
use self::types::Location;

pub use self::error::LoadError;
pub use self::index::SpatialIndex;
pub use self::network::{Feature, NetworkDataset};
pub use self::presenter::SelectionPresenter;
pub use self::selection::{select, SelectionResult};

/// Installs the browser console logger, `level` defaults to "info".
#[wasm_bindgen]
pub fn rust_init(level: Option<String>) {
    let level = level
        .as_deref()
        .and_then(|l| Level::from_str(l).ok())
        .unwrap_or(Level::Info);
    if console_log::init_with_level(level).is_ok() {
        log::info!("Logger initialized from library");
    }
}

// Forwards selection changes to the page's `onSelect` callback
#[derive(Clone)]
struct JsSelectionListener {
    callback: js_sys::Function,
}

impl SelectionListener for JsSelectionListener {
    fn on_select(&mut self, payload: Option<&DisplayPayload>) {
        let value = match payload.map(serde_wasm_bindgen::to_value).transpose() {
            Ok(value) => value.unwrap_or(JsValue::NULL),
            Err(e) => {
                log::error!("Could not convert selection for the page: {}", e);
                return;
            }
        };
        if let Err(e) = self.callback.call1(&JsValue::NULL, &value) {
            log::error!("onSelect callback failed: {:?}", e);
        }
    }
}

fn to_js_error(e: impl ToString) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Handle the page keeps for one mounted map.
///
/// The session is never borrowed while `onSelect` runs, so the callback may
/// call straight back into the dashboard.
#[wasm_bindgen]
pub struct RoadDashboard {
    session: Rc<RefCell<DashboardSession>>,
    listener: JsSelectionListener,
}

#[wasm_bindgen]
impl RoadDashboard {
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str, on_select: js_sys::Function) -> Result<RoadDashboard, JsValue> {
        let config = DashboardConfig::from_json(config_json).map_err(to_js_error)?;
        Ok(RoadDashboard {
            session: Rc::new(RefCell::new(DashboardSession::new(config))),
            listener: JsSelectionListener {
                callback: on_select,
            },
        })
    }

    /// Camera settings for the host map as a JS object.
    pub fn viewport(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.session.borrow().config().viewport).map_err(to_js_error)
    }

    /// Extent of the loaded road network, `null` before the first load.
    pub fn bounds(&self) -> Result<JsValue, JsValue> {
        match self.session.borrow().bounds() {
            Some(bounds) => serde_wasm_bindgen::to_value(&bounds).map_err(to_js_error),
            None => Ok(JsValue::NULL),
        }
    }

    /// Fetches and installs the road network. Resolves to the number of
    /// features, or `null` when a newer load or a teardown replaced this one.
    pub fn load(&self) -> js_sys::Promise {
        let session = Rc::clone(&self.session);
        let mut listener = self.listener.clone();
        let ticket = session.borrow_mut().begin_load();
        let config = session.borrow().config().clone();
        future_to_promise(async move {
            let result = load_network(&config).await;
            let outcome = session.borrow_mut().finish_load(ticket, result);
            match outcome {
                Ok(LoadOutcome::Installed {
                    features,
                    selection_cleared,
                    ..
                }) => {
                    if selection_cleared {
                        SelectionChange::Cleared.notify(&mut listener);
                    }
                    Ok(JsValue::from_f64(features as f64))
                }
                Ok(LoadOutcome::Stale) => Ok(JsValue::NULL),
                Err(e) => Err(to_js_error(e)),
            }
        })
    }

    /// Returns whether the click selected a road segment.
    pub fn click(&self, lng: f64, lat: f64, rendered_feature: Option<u32>) -> bool {
        let event = ClickEvent {
            location: Location::from_lng_lat(lng, lat),
            rendered_feature: rendered_feature.map(|i| i as usize),
        };
        let change = self.session.borrow_mut().click(event);
        match change {
            Some(change) => {
                change.notify(&mut self.listener.clone());
                true
            }
            None => false,
        }
    }

    /// CSS cursor for the pointer at `lng`/`lat`.
    pub fn hover(&self, lng: f64, lat: f64) -> String {
        self.session
            .borrow()
            .hover(Location::from_lng_lat(lng, lat))
            .as_css()
            .to_string()
    }

    /// Panel content for the current selection, or the idle message.
    pub fn panel(&self) -> Result<JsValue, JsValue> {
        let session = self.session.borrow();
        let idle = DisplayPayload::idle();
        let payload = session.selection().payload().unwrap_or(&idle);
        serde_wasm_bindgen::to_value(payload).map_err(to_js_error)
    }

    pub fn teardown(&self) {
        let change = self.session.borrow_mut().teardown();
        if let Some(change) = change {
            change.notify(&mut self.listener.clone());
        }
    }
}
