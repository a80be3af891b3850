use crate::VehicleSnapshot;

/// Where the feed client currently is in its connect/read/reconnect cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Closed,
    Errored,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Closed => "closed",
            Self::Errored => "errored",
        };
        f.write_str(label)
    }
}

/// Events sent from the feed client to the UI.
#[derive(Debug)]
pub enum Event {
    /// A complete vehicle list. Replaces whatever the UI is showing.
    Snapshot(Vec<VehicleSnapshot>),
    /// The feed moved to a new connection state.
    Connection(ConnectionState),
}
