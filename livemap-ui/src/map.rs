use eframe::egui::{self, Pos2, Response, Ui, pos2};
use livemap_messages::GeoPoint;
use walkers::{MapMemory, Plugin, Projector};

use crate::state::UiState;
use crate::viewport::{Viewport, ViewportKey};

/// Where the map opens, and the reference point used to detect pans.
pub const HOME: GeoPoint = GeoPoint::new(51.505, -0.09);
pub const INITIAL_ZOOM: f64 = 13.0;

fn to_walkers(point: GeoPoint) -> walkers::Position {
    walkers::lat_lon(point.lat, point.lng)
}

/// The live map widget's transform, seen through the [`Viewport`] trait.
pub struct ProjectorViewport<'a> {
    projector: &'a Projector,
    zoom: f64,
    rect: egui::Rect,
}

impl<'a> ProjectorViewport<'a> {
    pub fn new(projector: &'a Projector, map_memory: &MapMemory, rect: egui::Rect) -> Self {
        Self {
            projector,
            zoom: map_memory.zoom(),
            rect,
        }
    }
}

impl Viewport for ProjectorViewport<'_> {
    fn project(&self, point: GeoPoint) -> Pos2 {
        let screen = self.projector.project(to_walkers(point));
        pos2(screen.x, screen.y)
    }

    fn key(&self) -> ViewportKey {
        ViewportKey {
            zoom: self.zoom,
            origin: self.project(HOME),
            rect: self.rect,
        }
    }
}

/// Map plugin that draws one overlay per vehicle.
pub struct VehicleLayer<'a> {
    state: &'a mut UiState,
}

impl<'a> VehicleLayer<'a> {
    pub fn new(state: &'a mut UiState) -> Self {
        Self { state }
    }
}

impl Plugin for VehicleLayer<'_> {
    fn run(
        self: Box<Self>,
        ui: &mut Ui,
        _response: &Response,
        projector: &Projector,
        map_memory: &MapMemory,
    ) {
        let viewport = ProjectorViewport::new(projector, map_memory, ui.clip_rect());
        self.state.hub.observe(&viewport);
        self.state.vehicles.show(ui, &viewport);
    }
}

pub fn home_position() -> walkers::Position {
    to_walkers(HOME)
}
