use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

// Get current timestamp in milliseconds
pub fn get_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis() as u64
}

/// Time source for the handshake and pong timestamps.
#[derive(Debug, Clone, Copy)]
pub struct ServerClock {
    started: Instant,
}

impl Default for ServerClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerClock {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    // Milliseconds since the server started, wrapping after ~49 days
    pub fn uptime_ms(&self) -> u32 {
        self.started.elapsed().as_millis() as u32
    }

    pub fn unix_ms(&self) -> u64 {
        get_timestamp()
    }
}
