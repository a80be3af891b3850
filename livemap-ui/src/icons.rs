use eframe::egui::emath::Rot2;
use eframe::egui::{Pos2, Rect, Shape, Stroke, Vec2, vec2};
use eframe::epaint::Color32;
use livemap_messages::{Degrees, VehicleKind};

/// Which glyph to draw for a vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IconKind {
    FixedWing,
    MultiRotor,
}

impl From<VehicleKind> for IconKind {
    fn from(kind: VehicleKind) -> Self {
        match kind {
            VehicleKind::FixedWing => Self::FixedWing,
            VehicleKind::MultiRotor | VehicleKind::Unknown => Self::MultiRotor,
        }
    }
}

impl IconKind {
    /// Direction the artwork's nose points before any rotation is applied.
    pub fn artwork_bearing(self) -> Degrees {
        match self {
            Self::FixedWing => Degrees(45.0),
            Self::MultiRotor => Degrees(0.0),
        }
    }
}

/// Rotation to apply to the artwork so its nose points along `heading`.
/// Not normalised: a heading of 400 yields 400 (or 355 for fixed-wing).
pub fn icon_rotation(kind: IconKind, heading: Degrees) -> Degrees {
    heading - kind.artwork_bearing()
}

// Artwork lives in a [-1, 1] box with y growing downwards. Every part is
// convex so it can be filled directly.

const FIXED_WING_PARTS: [&[Vec2]; 5] = [
    // fuselage
    &[
        vec2(0.672, -0.672),
        vec2(0.601, -0.46),
        vec2(-0.424, 0.566),
        vec2(-0.566, 0.566),
        vec2(-0.566, 0.424),
        vec2(0.46, -0.601),
    ],
    // starboard wing
    &[
        vec2(0.177, -0.106),
        vec2(0.601, 0.742),
        vec2(0.495, 0.849),
        vec2(-0.035, 0.106),
    ],
    // port wing
    &[
        vec2(0.106, -0.177),
        vec2(-0.106, 0.035),
        vec2(-0.849, -0.495),
        vec2(-0.742, -0.601),
    ],
    // tailplane
    &[
        vec2(-0.318, 0.389),
        vec2(-0.212, 0.778),
        vec2(-0.283, 0.849),
        vec2(-0.495, 0.566),
    ],
    &[
        vec2(-0.389, 0.318),
        vec2(-0.566, 0.495),
        vec2(-0.849, 0.283),
        vec2(-0.778, 0.212),
    ],
];

const MULTI_ROTOR_BODY: &[Vec2] = &[
    vec2(-0.2, -0.3),
    vec2(0.2, -0.3),
    vec2(0.2, 0.3),
    vec2(-0.2, 0.3),
];

const MULTI_ROTOR_NOSE: &[Vec2] = &[vec2(0.0, -0.55), vec2(0.15, -0.3), vec2(-0.15, -0.3)];

const MULTI_ROTOR_ARMS: [&[Vec2]; 2] = [
    &[
        vec2(-0.58, -0.52),
        vec2(-0.52, -0.58),
        vec2(0.58, 0.52),
        vec2(0.52, 0.58),
    ],
    &[
        vec2(0.52, -0.58),
        vec2(0.58, -0.52),
        vec2(-0.52, 0.58),
        vec2(-0.58, 0.52),
    ],
];

const ROTOR_HUBS: [Vec2; 4] = [
    vec2(-0.5, -0.5),
    vec2(0.5, -0.5),
    vec2(0.5, 0.5),
    vec2(-0.5, 0.5),
];

const ROTOR_RADIUS: f32 = 0.25;

/// Maps artwork coordinates into a screen rect.
struct Placement {
    center: Pos2,
    scale: f32,
    rotation: Rot2,
}

impl Placement {
    fn new(rect: Rect, rotation: Degrees) -> Self {
        Self {
            center: rect.center(),
            scale: rect.width().min(rect.height()) / 2.0,
            rotation: Rot2::from_angle(rotation.to_radians() as f32),
        }
    }

    fn place(&self, point: Vec2) -> Pos2 {
        self.center + self.rotation * (point * self.scale)
    }

    fn polygon(&self, points: &[Vec2], color: Color32) -> Shape {
        Shape::convex_polygon(
            points.iter().map(|&p| self.place(p)).collect(),
            color,
            Stroke::NONE,
        )
    }
}

/// Build the glyph for `kind`, tinted with `color`, fitted into `rect` and
/// rotated so the nose points along `heading`.
pub fn icon_shapes(kind: IconKind, heading: Degrees, color: Color32, rect: Rect) -> Vec<Shape> {
    let placement = Placement::new(rect, icon_rotation(kind, heading));

    match kind {
        IconKind::FixedWing => FIXED_WING_PARTS
            .iter()
            .map(|part| placement.polygon(part, color))
            .collect(),
        IconKind::MultiRotor => {
            let mut shapes: Vec<Shape> = MULTI_ROTOR_ARMS
                .iter()
                .map(|arm| placement.polygon(arm, color))
                .collect();
            shapes.push(placement.polygon(MULTI_ROTOR_BODY, color));
            shapes.push(placement.polygon(MULTI_ROTOR_NOSE, color));

            let rotor_stroke = Stroke::new((placement.scale * 0.08).max(1.0), color);
            shapes.extend(ROTOR_HUBS.iter().map(|&hub| {
                Shape::circle_stroke(
                    placement.place(hub),
                    ROTOR_RADIUS * placement.scale,
                    rotor_stroke,
                )
            }));
            shapes
        }
    }
}
