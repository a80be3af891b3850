mod icons;
mod map;
mod overlay;
mod state;
mod viewport;

use std::time::Duration;

use livemap_messages::Event;
use log::warn;
use walkers::{HttpTiles, Map, MapMemory, sources::OpenStreetMap};

pub use icons::{IconKind, icon_rotation, icon_shapes};
pub use map::{HOME, INITIAL_ZOOM};
pub use overlay::{
    AMBER, ICON_ORDER, ICON_SIZE, OverlaySet, TOOLTIP_ORDER, TooltipState, VehicleOverlay,
    status_color,
};
pub use state::UiState;
pub use viewport::{MercatorViewport, ScreenAnchor, Subscription, Viewport, ViewportHub, ViewportKey};

/// How often the UI wakes up to drain the feed channel when nothing else
/// triggers a repaint.
const FEED_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Main application struct implementing the egui App trait.
pub struct LiveMapApp {
    /// Receiver for events from the feed
    event_rx: flume::Receiver<Event>,

    /// Local application state
    state: UiState,

    /// Base tile layer
    tiles: HttpTiles,

    map_memory: MapMemory,
}

impl LiveMapApp {
    fn new(egui_ctx: eframe::egui::Context, event_rx: flume::Receiver<Event>) -> Self {
        let mut map_memory = MapMemory::default();
        if let Err(e) = map_memory.set_zoom(INITIAL_ZOOM) {
            warn!("Failed to set initial zoom level: {:?}", e);
        }

        Self {
            event_rx,
            state: UiState::new(),
            tiles: HttpTiles::new(OpenStreetMap, egui_ctx),
            map_memory,
        }
    }
}

impl eframe::App for LiveMapApp {
    fn update(&mut self, ctx: &eframe::egui::Context, _frame: &mut eframe::Frame) {
        // Only the newest list matters, but every event goes through the one
        // update entry point.
        while let Ok(event) = self.event_rx.try_recv() {
            self.state.handle_event(event);
        }

        ctx.request_repaint_after(FEED_POLL_INTERVAL);

        eframe::egui::CentralPanel::default()
            .frame(eframe::egui::Frame::NONE)
            .show(ctx, |ui| {
                let map = Map::new(Some(&mut self.tiles), &mut self.map_memory, map::home_position())
                    .with_plugin(map::VehicleLayer::new(&mut self.state));

                map.show(ui, |_ui, _response, _projector| {});
            });
    }
}

/// Entry point for the UI module.
///
/// Runs the eframe application on the main thread (blocking).
pub fn run(event_rx: flume::Receiver<Event>) -> anyhow::Result<()> {
    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_inner_size([1024.0, 768.0])
            .with_title("livemap"),
        ..Default::default()
    };

    eframe::run_native(
        "livemap",
        options,
        Box::new(|cc| Ok(Box::new(LiveMapApp::new(cc.egui_ctx.clone(), event_rx)))),
    )
    .map_err(|e| anyhow::anyhow!("{}", e))?;

    Ok(())
}
