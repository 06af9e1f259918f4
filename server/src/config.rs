//! Runtime settings for the server.

use clap::ValueEnum;
use shared::{BROADCAST_EVERY, DEFAULT_PORT, TICK_MS};
use std::time::Duration;

/// What a broadcast event puts on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum BroadcastMode {
    /// Full `ServerState` snapshots.
    #[default]
    State,
    /// `ServerBroadcast` heartbeats carrying only tick and wall-clock time.
    Heartbeat,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Ticks between broadcasts; values below 1 are treated as 1.
    pub broadcast_every: u32,
    pub mode: BroadcastMode,
    /// How long a fresh connection may take to start its optional hello.
    pub hello_timeout_ms: u64,
    /// Upper bound for reading one frame once its first byte arrived, and
    /// for writing one frame.
    pub frame_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            broadcast_every: BROADCAST_EVERY,
            mode: BroadcastMode::State,
            hello_timeout_ms: 500,
            frame_timeout_ms: 250,
        }
    }
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn tick_duration(&self) -> Duration {
        Duration::from_millis(TICK_MS)
    }

    pub fn hello_timeout(&self) -> Duration {
        Duration::from_millis(self.hello_timeout_ms)
    }

    pub fn frame_timeout(&self) -> Duration {
        Duration::from_millis(self.frame_timeout_ms)
    }
}
