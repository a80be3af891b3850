use std::cell::RefCell;
use std::f64::consts::PI;
use std::rc::Rc;

use eframe::egui::{Pos2, Rect, Vec2, pos2};
use livemap_messages::GeoPoint;
use log::trace;

/// Edge length of one map tile in pixels.
const TILE_SIZE: f64 = 256.0;

/// The map's current pan/zoom transform.
pub trait Viewport {
    /// Pixel position of `point` in screen space.
    fn project(&self, point: GeoPoint) -> Pos2;

    /// Changes whenever the transform changes.
    fn key(&self) -> ViewportKey;
}

/// Fingerprint of a viewport transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportKey {
    pub zoom: f64,
    /// Where a fixed reference coordinate lands on screen.
    pub origin: Pos2,
    pub rect: Rect,
}

/// Web Mercator viewport that does not depend on a live map widget.
#[derive(Debug, Clone, PartialEq)]
pub struct MercatorViewport {
    center: GeoPoint,
    zoom: f64,
    rect: Rect,
}

impl MercatorViewport {
    pub fn new(center: GeoPoint, zoom: f64, rect: Rect) -> Self {
        Self { center, zoom, rect }
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = zoom;
    }

    /// Move the map contents by `delta` pixels, like a drag would.
    pub fn pan_by(&mut self, delta: Vec2) {
        let (x, y) = self.world_pixels(self.center);
        self.center = self.unproject_world(x - delta.x as f64, y - delta.y as f64);
    }

    fn world_size(&self) -> f64 {
        TILE_SIZE * 2f64.powf(self.zoom)
    }

    fn world_pixels(&self, point: GeoPoint) -> (f64, f64) {
        let size = self.world_size();
        let x = (point.lng + 180.0) / 360.0 * size;
        let lat = point.lat.to_radians();
        let y = (1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / PI) / 2.0 * size;
        (x, y)
    }

    fn unproject_world(&self, x: f64, y: f64) -> GeoPoint {
        let size = self.world_size();
        let lng = x / size * 360.0 - 180.0;
        let lat = (PI * (1.0 - 2.0 * y / size)).sinh().atan().to_degrees();
        GeoPoint::new(lat, lng)
    }
}

impl Viewport for MercatorViewport {
    fn project(&self, point: GeoPoint) -> Pos2 {
        let (cx, cy) = self.world_pixels(self.center);
        let (x, y) = self.world_pixels(point);
        let screen_center = self.rect.center();
        pos2(
            screen_center.x + (x - cx) as f32,
            screen_center.y + (y - cy) as f32,
        )
    }

    fn key(&self) -> ViewportKey {
        ViewportKey {
            zoom: self.zoom,
            origin: self.project(GeoPoint::default()),
            rect: self.rect,
        }
    }
}

#[derive(Debug, Default)]
struct Listener {
    stale: bool,
}

/// Slots for move listeners. Freed slots are reused.
#[derive(Debug, Default)]
struct Registry {
    slots: Vec<Option<Listener>>,
    free: Vec<usize>,
}

impl Registry {
    fn insert(&mut self) -> usize {
        match self.free.pop() {
            Some(index) => {
                self.slots[index] = Some(Listener::default());
                index
            }
            None => {
                self.slots.push(Some(Listener::default()));
                self.slots.len() - 1
            }
        }
    }

    fn remove(&mut self, index: usize) {
        if self.slots[index].take().is_some() {
            self.free.push(index);
        }
    }

    fn live(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }
}

/// Watches the viewport and tells every subscribed anchor when it moved.
///
/// Subscriptions are handed out as [`Subscription`] guards; dropping a guard
/// is the only way to leave the registry, so every subscribe is matched by
/// exactly one unsubscribe.
#[derive(Debug, Default)]
pub struct ViewportHub {
    registry: Rc<RefCell<Registry>>,
    last_key: Option<ViewportKey>,
}

impl ViewportHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Subscription {
        let index = self.registry.borrow_mut().insert();
        trace!("Viewport listener {} registered", index);
        Subscription {
            registry: Rc::clone(&self.registry),
            index,
        }
    }

    /// Compare the viewport against the last one seen and broadcast a move if
    /// it changed. Returns whether a move was broadcast.
    pub fn observe(&mut self, viewport: &dyn Viewport) -> bool {
        let key = viewport.key();
        if self.last_key == Some(key) {
            return false;
        }
        self.last_key = Some(key);
        self.notify_move();
        true
    }

    /// Mark every listener as needing to recompute its position.
    pub fn notify_move(&self) {
        for listener in self.registry.borrow_mut().slots.iter_mut().flatten() {
            listener.stale = true;
        }
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.registry.borrow().live()
    }
}

/// A registered move listener. Deregisters itself when dropped.
#[derive(Debug)]
pub struct Subscription {
    registry: Rc<RefCell<Registry>>,
    index: usize,
}

impl Subscription {
    /// Whether a move happened since the last call. Clears the flag.
    fn take_stale(&self) -> bool {
        self.registry.borrow_mut().slots[self.index]
            .as_mut()
            .is_some_and(|listener| std::mem::take(&mut listener.stale))
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        trace!("Viewport listener {} released", self.index);
        self.registry.borrow_mut().remove(self.index);
    }
}

/// Keeps the screen position of one coordinate current as the viewport moves.
#[derive(Debug)]
pub struct ScreenAnchor {
    coordinate: GeoPoint,
    cached: Option<Pos2>,
    subscription: Subscription,
}

impl ScreenAnchor {
    pub fn mount(hub: &ViewportHub, coordinate: GeoPoint) -> Self {
        Self {
            coordinate,
            cached: None,
            subscription: hub.subscribe(),
        }
    }

    /// Point the anchor at a (possibly identical) coordinate. The position is
    /// recomputed on the next [`ScreenAnchor::position`] call either way.
    pub fn set_coordinate(&mut self, coordinate: GeoPoint) {
        self.coordinate = coordinate;
        self.cached = None;
    }

    /// Current pixel position, reprojecting only if the viewport moved or the
    /// coordinate was set since the last call.
    pub fn position(&mut self, viewport: &dyn Viewport) -> Pos2 {
        let moved = self.subscription.take_stale();
        match self.cached {
            Some(position) if !moved => position,
            _ => {
                let position = viewport.project(self.coordinate);
                self.cached = Some(position);
                position
            }
        }
    }
}
