use livemap_messages::{ConnectionState, Event};
use log::info;

use crate::overlay::OverlaySet;
use crate::viewport::ViewportHub;

/// Local UI state derived from feed events.
///
/// The vehicle list has a single writer: [`UiState::handle_event`], which is
/// only ever fed from the feed channel.
#[derive(Debug, Default)]
pub struct UiState {
    /// Registry of viewport move listeners
    pub hub: ViewportHub,

    /// Overlays for the most recent snapshot list
    pub vehicles: OverlaySet,

    /// Last reported feed state. Logged only, never drawn.
    pub connection: Option<ConnectionState>,
}

impl UiState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::Snapshot(vehicles) => {
                self.vehicles.replace(vehicles, &self.hub);
            }
            Event::Connection(state) => {
                info!("Feed {}", state);
                self.connection = Some(state);
            }
        }
    }
}
