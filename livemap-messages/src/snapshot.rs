use serde::{Deserialize, Serialize};

use crate::{Degrees, GeoPoint, Metres};

/// Health reported by a vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VehicleStatus {
    #[default]
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "WARN")]
    Warn,
    #[serde(rename = "ERROR")]
    Error,
    /// Anything the feed sends that is not one of the above.
    #[serde(other)]
    Unknown,
}

/// Airframe family, which picks the icon drawn for the vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VehicleKind {
    #[serde(rename = "fixedwing")]
    FixedWing,
    #[default]
    #[serde(rename = "multirotor")]
    MultiRotor,
    #[serde(other)]
    Unknown,
}

/// State of one vehicle as carried in a feed message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleSnapshot {
    /// Unique within one snapshot list. Only used to key overlays.
    pub id: String,
    pub lat: f64,
    pub lng: f64,
    pub alt: Metres,
    pub hdg: Degrees,
    pub status: VehicleStatus,
    #[serde(rename = "type")]
    pub kind: VehicleKind,
}

impl VehicleSnapshot {
    pub fn position(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lng)
    }
}

/// Decode one feed payload: a JSON array holding the complete vehicle list.
pub fn decode_snapshot_list(payload: &str) -> Result<Vec<VehicleSnapshot>, serde_json::Error> {
    serde_json::from_str(payload)
}
