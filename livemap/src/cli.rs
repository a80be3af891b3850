use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use livemap_messages::{DEFAULT_ENDPOINT, FeedConfig, ReconnectPolicy};

/// Live map of vehicle positions streamed over a WebSocket.
#[derive(Debug, Parser)]
#[command(name = "livemap", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Mode>,

    #[command(flatten)]
    pub view: ViewArgs,
}

#[derive(Debug, Subcommand)]
pub enum Mode {
    /// Open the map and follow the feed (default)
    View(ViewArgs),
    /// Serve a simulated feed of three circling vehicles
    Demo(DemoArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Reconnect {
    /// Retry straight away, forever
    Immediate,
    /// Capped exponential backoff between attempts
    Backoff,
}

#[derive(Debug, Clone, Args)]
pub struct ViewArgs {
    /// WebSocket URL of the vehicle feed
    #[arg(long, env = "LIVEMAP_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// What to do after the connection closes or fails
    #[arg(long, value_enum, default_value_t = Reconnect::Immediate)]
    pub reconnect: Reconnect,

    /// First backoff delay in milliseconds
    #[arg(long, default_value_t = 250)]
    pub backoff_initial_ms: u64,

    /// Longest backoff delay in milliseconds
    #[arg(long, default_value_t = 10_000)]
    pub backoff_max_ms: u64,
}

impl ViewArgs {
    pub fn feed_config(&self) -> anyhow::Result<FeedConfig> {
        // Built without TLS support, so only plain WebSocket endpoints work.
        if !self.endpoint.starts_with("ws://") {
            anyhow::bail!("Feed endpoint must be a ws:// URL, got {}", self.endpoint);
        }

        let reconnect = match self.reconnect {
            Reconnect::Immediate => ReconnectPolicy::Immediate,
            Reconnect::Backoff => {
                if self.backoff_initial_ms == 0 || self.backoff_initial_ms > self.backoff_max_ms {
                    anyhow::bail!(
                        "Backoff needs 0 < --backoff-initial-ms <= --backoff-max-ms ({} / {})",
                        self.backoff_initial_ms,
                        self.backoff_max_ms
                    );
                }
                ReconnectPolicy::Backoff {
                    initial: Duration::from_millis(self.backoff_initial_ms),
                    max: Duration::from_millis(self.backoff_max_ms),
                }
            }
        };

        Ok(FeedConfig {
            endpoint: self.endpoint.clone(),
            reconnect,
        })
    }
}

#[derive(Debug, Clone, Args)]
pub struct DemoArgs {
    /// Address to accept feed subscribers on
    #[arg(long, env = "LIVEMAP_BIND", default_value = "localhost:8000")]
    pub bind: String,

    /// Milliseconds between lists sent to each subscriber
    #[arg(long, default_value_t = 500)]
    pub interval_ms: u64,
}
