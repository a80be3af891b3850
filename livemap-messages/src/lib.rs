mod command;
mod config;
mod event;
mod snapshot;
mod units;

pub use command::Command;
pub use config::{DEFAULT_ENDPOINT, FeedConfig, ReconnectPolicy};
pub use event::{ConnectionState, Event};
pub use snapshot::{VehicleKind, VehicleSnapshot, VehicleStatus, decode_snapshot_list};
pub use units::{Degrees, GeoPoint, Metres};
