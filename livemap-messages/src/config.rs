use std::time::Duration;

/// Endpoint the viewer subscribes to when nothing else is configured.
pub const DEFAULT_ENDPOINT: &str = "ws://localhost:8000";

/// How long the feed waits before opening a new connection after a close or error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReconnectPolicy {
    /// Reconnect straight away, forever.
    #[default]
    Immediate,
    /// Capped exponential backoff. The delay doubles after every failed
    /// attempt and resets once a connection is established.
    Backoff { initial: Duration, max: Duration },
}

impl ReconnectPolicy {
    /// Delay before reconnect attempt number `attempt` (0 = first retry).
    pub fn delay(&self, attempt: u32) -> Duration {
        match *self {
            Self::Immediate => Duration::ZERO,
            Self::Backoff { initial, max } => {
                initial.saturating_mul(1 << attempt.min(31)).min(max)
            }
        }
    }
}

/// Configuration for the live feed client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedConfig {
    /// WebSocket URL of the vehicle feed.
    pub endpoint: String,
    pub reconnect: ReconnectPolicy,
}

impl Default for FeedConfig {
    fn default() -> Self {
        FeedConfig {
            endpoint: DEFAULT_ENDPOINT.to_owned(),
            reconnect: ReconnectPolicy::default(),
        }
    }
}
