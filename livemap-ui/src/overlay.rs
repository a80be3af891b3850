use std::collections::HashMap;

use eframe::egui::{self, Align2, Frame, Id, LayerId, Order, Rect, Sense, Ui, vec2};
use eframe::epaint::Color32;
use livemap_messages::{VehicleSnapshot, VehicleStatus};
use log::debug;

use crate::icons::{IconKind, icon_shapes};
use crate::viewport::{ScreenAnchor, Viewport, ViewportHub};

/// Edge length of the square a vehicle icon is drawn into.
pub const ICON_SIZE: f32 = 50.0;

/// Icons paint above the map tiles and below tooltips.
pub const ICON_ORDER: Order = Order::Middle;
pub const TOOLTIP_ORDER: Order = Order::Foreground;

/// Tooltips sit this many of their own heights below the vehicle.
const TOOLTIP_DROP: f32 = 1.1;

/// Used until a tooltip has been laid out once.
const TOOLTIP_HEIGHT_GUESS: f32 = 40.0;

pub const AMBER: Color32 = Color32::from_rgb(0xfb, 0xa6, 0x09);

/// Icon tint for a vehicle status.
pub fn status_color(status: VehicleStatus) -> Color32 {
    match status {
        VehicleStatus::Warn => AMBER,
        VehicleStatus::Error => Color32::RED,
        VehicleStatus::Ok | VehicleStatus::Unknown => Color32::BLACK,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TooltipState {
    #[default]
    Hidden,
    Shown,
}

/// Icon plus detail panel tracking one vehicle on screen.
#[derive(Debug)]
pub struct VehicleOverlay {
    info: VehicleSnapshot,
    tooltip: TooltipState,
    icon_anchor: ScreenAnchor,
    tooltip_anchor: ScreenAnchor,
    tooltip_height: f32,
}

impl VehicleOverlay {
    pub fn mount(info: VehicleSnapshot, hub: &ViewportHub) -> Self {
        let position = info.position();
        Self {
            info,
            tooltip: TooltipState::Hidden,
            icon_anchor: ScreenAnchor::mount(hub, position),
            tooltip_anchor: ScreenAnchor::mount(hub, position),
            tooltip_height: TOOLTIP_HEIGHT_GUESS,
        }
    }

    /// Take the latest snapshot for this vehicle. Tooltip state is kept.
    fn update(&mut self, info: VehicleSnapshot) {
        let position = info.position();
        self.icon_anchor.set_coordinate(position);
        self.tooltip_anchor.set_coordinate(position);
        self.info = info;
    }

    pub fn info(&self) -> &VehicleSnapshot {
        &self.info
    }

    pub fn tooltip(&self) -> TooltipState {
        self.tooltip
    }

    pub fn icon_kind(&self) -> IconKind {
        self.info.kind.into()
    }

    pub fn icon_color(&self) -> Color32 {
        status_color(self.info.status)
    }

    /// Text shown in the detail panel.
    pub fn tooltip_lines(&self) -> [String; 2] {
        [
            format!("ID: {}", self.info.id),
            format!("Alt: {}", self.info.alt),
        ]
    }

    pub fn on_icon_click(&mut self) {
        self.tooltip = match self.tooltip {
            TooltipState::Hidden => TooltipState::Shown,
            TooltipState::Shown => TooltipState::Hidden,
        };
    }

    pub fn on_tooltip_click(&mut self) {
        self.tooltip = TooltipState::Hidden;
    }

    /// Screen rect the icon occupies in `viewport`.
    pub fn icon_rect(&mut self, viewport: &dyn Viewport) -> Rect {
        Rect::from_center_size(
            self.icon_anchor.position(viewport),
            vec2(ICON_SIZE, ICON_SIZE),
        )
    }

    /// Draw the icon and, when shown, the tooltip. Handles clicks on both.
    pub fn show(&mut self, ui: &mut Ui, viewport: &dyn Viewport, key: Id) {
        let icon_rect = self.icon_rect(viewport);
        let response = ui.interact(icon_rect, key.with("icon"), Sense::click());

        let painter = ui
            .ctx()
            .layer_painter(LayerId::new(ICON_ORDER, ui.id().with("vehicle-icons")))
            .with_clip_rect(ui.clip_rect());
        painter.extend(icon_shapes(
            self.icon_kind(),
            self.info.hdg,
            self.icon_color(),
            icon_rect,
        ));

        if response.clicked() {
            self.on_icon_click();
        }

        if self.tooltip == TooltipState::Shown {
            self.show_tooltip(ui.ctx(), viewport, key);
        }
    }

    fn show_tooltip(&mut self, ctx: &egui::Context, viewport: &dyn Viewport, key: Id) {
        let anchor = self.tooltip_anchor.position(viewport);
        let area = egui::Area::new(key.with("tooltip"))
            .order(TOOLTIP_ORDER)
            .pivot(Align2::CENTER_CENTER)
            .fixed_pos(anchor + vec2(0.0, self.tooltip_height * TOOLTIP_DROP))
            .show(ctx, |ui| {
                Frame::popup(ui.style()).show(ui, |ui| {
                    for line in self.tooltip_lines() {
                        ui.label(line);
                    }
                });
            });

        self.tooltip_height = area.response.rect.height();
        if area.response.interact(Sense::click()).clicked() {
            self.on_tooltip_click();
        }
    }
}

/// One overlay per vehicle in the most recent snapshot list.
#[derive(Debug, Default)]
pub struct OverlaySet {
    overlays: Vec<VehicleOverlay>,
}

impl OverlaySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Show exactly `vehicles`. Overlays whose id appears again keep their
    /// tooltip state; the rest are unmounted and release their listeners.
    pub fn replace(&mut self, vehicles: Vec<VehicleSnapshot>, hub: &ViewportHub) {
        let mut previous: HashMap<String, VehicleOverlay> = HashMap::with_capacity(self.overlays.len());
        for overlay in self.overlays.drain(..) {
            previous.entry(overlay.info.id.clone()).or_insert(overlay);
        }

        self.overlays = vehicles
            .into_iter()
            .map(|info| match previous.remove(&info.id) {
                Some(mut overlay) => {
                    overlay.update(info);
                    overlay
                }
                None => VehicleOverlay::mount(info, hub),
            })
            .collect();

        if !previous.is_empty() {
            debug!("Unmounting {} vehicles", previous.len());
        }
    }

    pub fn len(&self) -> usize {
        self.overlays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overlays.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &VehicleOverlay> {
        self.overlays.iter()
    }

    pub fn get(&self, id: &str) -> Option<&VehicleOverlay> {
        self.overlays.iter().find(|overlay| overlay.info.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut VehicleOverlay> {
        self.overlays.iter_mut().find(|overlay| overlay.info.id == id)
    }

    pub fn show(&mut self, ui: &mut Ui, viewport: &dyn Viewport) {
        for (index, overlay) in self.overlays.iter_mut().enumerate() {
            // Duplicate ids still need distinct widget ids.
            let key = Id::new(("vehicle", &overlay.info.id, index));
            overlay.show(ui, viewport, key);
        }
    }
}
