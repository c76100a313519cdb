use crate::config::DashboardConfig;
use crate::error::LoadError;
use crate::index::SpatialIndex;
use crate::network::NetworkDataset;
use crate::presenter::{DisplayPayload, SelectionPresenter};
use crate::selection::select;
use crate::types::{BoundingCoordinates, Location};

/// Receives every change of the current selection; `None` clears it.
pub trait SelectionListener {
    fn on_select(&mut self, payload: Option<&DisplayPayload>);
}

impl<F> SelectionListener for F
where
    F: FnMut(Option<&DisplayPayload>),
{
    fn on_select(&mut self, payload: Option<&DisplayPayload>) {
        self(payload)
    }
}

/// What the page has to be told after a session call.
///
/// The session never calls a listener itself, so callers can release any
/// lock on the session before notifying.
#[derive(Clone, Debug, PartialEq)]
pub enum SelectionChange {
    Selected(DisplayPayload),
    Cleared,
}

impl SelectionChange {
    pub fn payload(&self) -> Option<&DisplayPayload> {
        match self {
            SelectionChange::Selected(payload) => Some(payload),
            SelectionChange::Cleared => None,
        }
    }

    pub fn notify<L: SelectionListener + ?Sized>(&self, listener: &mut L) {
        listener.on_select(self.payload());
    }
}

/// A pointer click on the map.
#[derive(Clone, Copy, Debug)]
pub struct ClickEvent {
    pub location: Location,
    /// Feature the renderer's own hit test picked, compared but never trusted.
    pub rendered_feature: Option<usize>,
}

impl ClickEvent {
    pub fn at(location: Location) -> Self {
        ClickEvent {
            location,
            rendered_feature: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Selection {
    pub feature_index: usize,
    pub click: Location,
    pub distance_meters: f64,
    pub payload: DisplayPayload,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub enum SelectionSlot {
    #[default]
    Empty,
    Selected(Selection),
}

impl SelectionSlot {
    pub fn payload(&self) -> Option<&DisplayPayload> {
        match self {
            SelectionSlot::Selected(selection) => Some(&selection.payload),
            SelectionSlot::Empty => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoadTicket(u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadOutcome {
    Installed {
        features: usize,
        skipped: usize,
        /// A selection from the previous network was dropped.
        selection_cleared: bool,
    },
    /// A newer load or a teardown came after this one; the result was dropped.
    Stale,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CursorStyle {
    Default,
    Pointer,
}

impl CursorStyle {
    pub fn as_css(&self) -> &'static str {
        match self {
            CursorStyle::Default => "",
            CursorStyle::Pointer => "pointer",
        }
    }
}

/// Everything one mounted map owns: network, index and the current selection.
pub struct DashboardSession {
    config: DashboardConfig,
    presenter: SelectionPresenter,
    index: Option<SpatialIndex>,
    slot: SelectionSlot,
    latest_ticket: u64,
    pending: Option<LoadTicket>,
}

impl DashboardSession {
    pub fn new(config: DashboardConfig) -> Self {
        DashboardSession {
            presenter: SelectionPresenter::new(&config.label_property),
            config,
            index: None,
            slot: SelectionSlot::Empty,
            latest_ticket: 0,
            pending: None,
        }
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn dataset(&self) -> Option<&NetworkDataset> {
        self.index.as_ref().map(SpatialIndex::dataset)
    }

    /// Extent of the installed network, for fitting the camera.
    pub fn bounds(&self) -> Option<BoundingCoordinates> {
        self.dataset().map(NetworkDataset::bounds)
    }

    pub fn is_ready(&self) -> bool {
        self.index.is_some()
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    pub fn selection(&self) -> &SelectionSlot {
        &self.slot
    }

    /// Starts a (re)load; any load still in flight becomes stale.
    pub fn begin_load(&mut self) -> LoadTicket {
        self.latest_ticket += 1;
        let ticket = LoadTicket(self.latest_ticket);
        if self.pending.replace(ticket).is_some() {
            log::info!("Superseding pending road network load");
        }
        ticket
    }

    /// Installs the outcome of the load `ticket` was issued for.
    ///
    /// Results for superseded tickets are dropped, errors included. A failed
    /// load leaves the previous network, index and selection in place.
    pub fn finish_load(
        &mut self,
        ticket: LoadTicket,
        result: Result<NetworkDataset, LoadError>,
    ) -> Result<LoadOutcome, LoadError> {
        if ticket.0 != self.latest_ticket {
            log::info!("Discarding stale road network load {}", ticket.0);
            return Ok(LoadOutcome::Stale);
        }
        self.pending = None;

        let dataset = match result {
            Ok(dataset) => dataset,
            Err(e) => {
                if e.is_fatal() {
                    log::error!("Road network load failed: {}", e);
                } else {
                    log::warn!("Road network load failed: {}", e);
                }
                return Err(e);
            }
        };

        let features = dataset.len();
        let skipped = dataset.skipped();
        self.index = Some(SpatialIndex::build(dataset));
        Ok(LoadOutcome::Installed {
            features,
            skipped,
            selection_cleared: self.clear_selection().is_some(),
        })
    }

    /// Resolves a click against the network and records the new selection.
    ///
    /// Ignored until a network is installed. A click that hits nothing keeps
    /// the current selection and returns `None`.
    pub fn click(&mut self, event: ClickEvent) -> Option<SelectionChange> {
        let Some(index) = self.index.as_ref() else {
            log::debug!("Click ignored, road network not loaded yet");
            return None;
        };
        let result = select(index, event.location, self.config.tolerance_meters)?;

        if let Some(rendered) = event.rendered_feature {
            if rendered != result.feature_index {
                log::debug!(
                    "Renderer picked feature {}, nearest within tolerance is {}",
                    rendered,
                    result.feature_index
                );
            }
        }

        let payload = self.presenter.present(Some(&result));
        self.slot = SelectionSlot::Selected(Selection {
            feature_index: result.feature_index,
            click: result.click,
            distance_meters: result.distance_meters,
            payload: payload.clone(),
        });
        Some(SelectionChange::Selected(payload))
    }

    /// Cursor to show while the pointer is over `location`.
    pub fn hover(&self, location: Location) -> CursorStyle {
        match self.index.as_ref() {
            Some(index) if select(index, location, self.config.tolerance_meters).is_some() => {
                CursorStyle::Pointer
            }
            _ => CursorStyle::Default,
        }
    }

    /// The map is going away: drop the network and clear the selection.
    ///
    /// Loads still in flight finish as [`LoadOutcome::Stale`].
    pub fn teardown(&mut self) -> Option<SelectionChange> {
        self.latest_ticket += 1;
        self.index = None;
        self.pending = None;
        self.clear_selection()
    }

    fn clear_selection(&mut self) -> Option<SelectionChange> {
        match std::mem::take(&mut self.slot) {
            SelectionSlot::Empty => None,
            SelectionSlot::Selected(_) => Some(SelectionChange::Cleared),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    const ROADS: &str = r#"{"type": "FeatureCollection", "features": [
        {"type": "Feature", "geometry": {"type": "LineString", "coordinates": [[103.80, 1.30], [103.80, 1.31]]},
         "properties": {"RD_NAME": "ALPHA ROAD"}},
        {"type": "Feature", "geometry": {"type": "LineString", "coordinates": [[103.81, 1.30], [103.81, 1.31]]},
         "properties": {"RD_NAME": "BETA ROAD"}}
    ]}"#;

    const SINGLE: &[u8] = br#"{"type": "FeatureCollection", "features": [
        {"type": "Feature", "geometry": {"type": "LineString", "coordinates": [[0, 0], [0, 1]]}, "properties": {}}
    ]}"#;

    fn session() -> DashboardSession {
        DashboardSession::new(DashboardConfig::default())
    }

    fn roads() -> NetworkDataset {
        NetworkDataset::load(ROADS.as_bytes()).unwrap()
    }

    fn loaded() -> DashboardSession {
        let mut session = session();
        let ticket = session.begin_load();
        session.finish_load(ticket, Ok(roads())).unwrap();
        session
    }

    fn on_alpha() -> ClickEvent {
        ClickEvent::at(Location::from_lng_lat(103.80, 1.305))
    }

    fn selected_index(session: &DashboardSession) -> Option<usize> {
        match session.selection() {
            SelectionSlot::Selected(selection) => Some(selection.feature_index),
            SelectionSlot::Empty => None,
        }
    }

    #[test]
    fn test_click_before_load_is_ignored() {
        let mut session = session();
        let _ticket = session.begin_load();
        assert!(session.is_loading());
        assert!(session.click(on_alpha()).is_none());
        assert_eq!(session.selection(), &SelectionSlot::Empty);
    }

    #[test]
    fn test_click_selects_and_reports_payload() {
        let mut session = loaded();
        let change = session.click(on_alpha()).unwrap();
        assert_eq!(selected_index(&session), Some(0));
        assert_eq!(change.payload().unwrap().popup().unwrap().title, "ALPHA ROAD");
        assert_eq!(change.payload(), session.selection().payload());
    }

    #[test]
    fn test_new_selection_replaces_previous() {
        let mut session = loaded();
        session.click(on_alpha());
        let change = session.click(ClickEvent::at(Location::from_lng_lat(103.81, 1.305)));
        assert_eq!(selected_index(&session), Some(1));
        assert_eq!(change.unwrap().payload().unwrap().popup().unwrap().title, "BETA ROAD");
    }

    #[test]
    fn test_miss_keeps_selection() {
        let mut session = loaded();
        session.click(on_alpha());
        let before = session.selection().clone();
        let miss = ClickEvent::at(Location::from_lng_lat(103.805, 1.305));
        assert!(session.click(miss).is_none());
        assert_eq!(session.selection(), &before);
    }

    #[test]
    fn test_renderer_hint_is_not_trusted() {
        let mut session = loaded();
        let event = ClickEvent {
            location: Location::from_lng_lat(103.80, 1.305),
            rendered_feature: Some(1),
        };
        session.click(event).unwrap();
        assert_eq!(selected_index(&session), Some(0));
    }

    #[test]
    fn test_reload_resets_selection() {
        let mut session = loaded();
        session.click(on_alpha());
        let ticket = session.begin_load();
        let outcome = session.finish_load(ticket, Ok(roads())).unwrap();
        assert_eq!(
            outcome,
            LoadOutcome::Installed {
                features: 2,
                skipped: 0,
                selection_cleared: true
            }
        );
        assert_eq!(session.selection(), &SelectionSlot::Empty);
    }

    #[test]
    fn test_failed_reload_keeps_previous_state() {
        let mut session = loaded();
        session.click(on_alpha());
        let ticket = session.begin_load();
        let err = session
            .finish_load(
                ticket,
                Err(LoadError::SourceUnavailable {
                    source_url: "http://localhost/map/road_network.geojson".into(),
                    reason: "connection refused".into(),
                }),
            )
            .unwrap_err();
        assert!(!err.is_fatal());
        assert!(session.is_ready());
        assert!(!session.is_loading());
        assert_eq!(selected_index(&session), Some(0));
        assert_eq!(session.dataset().unwrap().len(), 2);
    }

    #[test]
    fn test_last_load_wins() {
        let mut session = session();
        let first = session.begin_load();
        let second = session.begin_load();

        let single = NetworkDataset::load(SINGLE).unwrap();
        assert_eq!(
            session.finish_load(second, Ok(roads())).unwrap(),
            LoadOutcome::Installed {
                features: 2,
                skipped: 0,
                selection_cleared: false
            }
        );
        // The older load completes afterwards and must not overwrite
        assert_eq!(session.finish_load(first, Ok(single)).unwrap(), LoadOutcome::Stale);
        assert_eq!(session.dataset().unwrap().len(), 2);
    }

    #[test]
    fn test_stale_error_is_dropped() {
        let mut session = loaded();
        let first = session.begin_load();
        let _second = session.begin_load();
        let outcome = session.finish_load(first, Err(LoadError::Parse("truncated".into())));
        assert_eq!(outcome.unwrap(), LoadOutcome::Stale);
        assert!(session.is_loading());
    }

    #[test]
    fn test_load_finishing_after_teardown_is_stale() {
        let mut session = session();
        let ticket = session.begin_load();
        session.teardown();

        let single = NetworkDataset::load(SINGLE).unwrap();
        assert_eq!(session.finish_load(ticket, Ok(single)).unwrap(), LoadOutcome::Stale);
        assert!(!session.is_ready());
        assert!(session.click(ClickEvent::at(Location::from_lng_lat(0.0, 0.5))).is_none());
        assert_eq!(session.selection(), &SelectionSlot::Empty);
    }

    #[test]
    fn test_hover_cursor() {
        let session = loaded();
        assert_eq!(session.hover(on_alpha().location), CursorStyle::Pointer);
        assert_eq!(session.hover(Location::from_lng_lat(0.0, 0.0)), CursorStyle::Default);
        assert_eq!(CursorStyle::Pointer.as_css(), "pointer");
    }

    #[test]
    fn test_bounds_follow_installed_network() {
        let mut session = session();
        assert!(session.bounds().is_none());
        let ticket = session.begin_load();
        session.finish_load(ticket, Ok(roads())).unwrap();
        let bounds = session.bounds().unwrap();
        assert_eq!(bounds.west_longitude, 103.80);
        assert_eq!(bounds.east_longitude, 103.81);
        session.teardown();
        assert!(session.bounds().is_none());
    }

    #[test]
    fn test_teardown_empties_session() {
        let mut session = loaded();
        session.click(on_alpha());
        assert_eq!(session.teardown(), Some(SelectionChange::Cleared));
        assert!(!session.is_ready());
        assert_eq!(session.selection(), &SelectionSlot::Empty);
        assert!(session.click(on_alpha()).is_none());
        // Nothing left to clear
        assert_eq!(session.teardown(), None);
    }

    #[test]
    fn test_listener_can_read_session_while_notified() {
        let shared = Rc::new(RefCell::new(loaded()));
        let seen: Rc<RefCell<Vec<Option<DisplayPayload>>>> = Rc::default();

        let reader = Rc::clone(&shared);
        let sink = Rc::clone(&seen);
        let mut listener = move |payload: Option<&DisplayPayload>| {
            // A panel handler reading the session back; panics if still borrowed
            let session = reader.borrow();
            assert_eq!(payload, session.selection().payload());
            sink.borrow_mut().push(payload.cloned());
        };

        let change = shared.borrow_mut().click(on_alpha()).unwrap();
        change.notify(&mut listener);
        let cleared = shared.borrow_mut().teardown().unwrap();
        cleared.notify(&mut listener);

        let seen = seen.borrow();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].as_ref().unwrap().popup().unwrap().title, "ALPHA ROAD");
        assert_eq!(seen[1], None);
    }
}
