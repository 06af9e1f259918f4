//! What the client currently believes about the match.
//!
//! The receive task writes here and the console renderer reads copies. The
//! lock is only ever held to copy a value in or out, never across I/O.

use shared::{ServerBroadcast, ServerHello, ServerState};
use std::sync::{Arc, Mutex, MutexGuard};

/// Plain copy of everything the client has heard from the server.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GameView {
    pub hello: Option<ServerHello>,
    /// Latest authoritative state, if the server sends full states.
    pub state: Option<ServerState>,
    /// Latest heartbeat, if the server runs in heartbeat mode.
    pub heartbeat: Option<ServerBroadcast>,
    /// Round trip of the most recent answered ping.
    pub rtt_ms: Option<u64>,
    pub states_received: u64,
}

impl GameView {
    /// Newest tick the server has told us about.
    pub fn tick(&self) -> Option<u32> {
        match (self.state, self.heartbeat) {
            (Some(state), Some(beat)) => Some(state.tick.max(beat.tick)),
            (Some(state), None) => Some(state.tick),
            (None, Some(beat)) => Some(beat.tick),
            (None, None) => None,
        }
    }
}

/// Shared, mutex-guarded handle to a [`GameView`].
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    inner: Arc<Mutex<GameView>>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock cannot leave a half-written Copy value,
    // so a poisoned lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, GameView> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Copy of the current view.
    pub fn read(&self) -> GameView {
        *self.lock()
    }

    pub fn set_hello(&self, hello: ServerHello) {
        self.lock().hello = Some(hello);
    }

    pub fn apply_state(&self, state: ServerState) {
        let mut view = self.lock();
        view.state = Some(state);
        view.states_received += 1;
    }

    pub fn apply_heartbeat(&self, heartbeat: ServerBroadcast) {
        self.lock().heartbeat = Some(heartbeat);
    }

    pub fn record_rtt(&self, rtt_ms: u64) {
        self.lock().rtt_ms = Some(rtt_ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(tick: u32) -> ServerState {
        ServerState {
            tick,
            ball_x: 400.0,
            ball_y: 225.0,
            ..ServerState::default()
        }
    }

    #[test]
    fn test_new_snapshot_is_empty() {
        let view = Snapshot::new().read();
        assert_eq!(view, GameView::default());
        assert_eq!(view.tick(), None);
    }

    #[test]
    fn test_latest_state_wins() {
        let snapshot = Snapshot::new();
        snapshot.apply_state(state(3));
        snapshot.apply_state(state(6));

        let view = snapshot.read();
        assert_eq!(view.state.map(|s| s.tick), Some(6));
        assert_eq!(view.states_received, 2);
        assert_eq!(view.tick(), Some(6));
    }

    #[test]
    fn test_clones_share_the_view() {
        let writer = Snapshot::new();
        let reader = writer.clone();

        writer.record_rtt(12);
        writer.apply_heartbeat(ServerBroadcast {
            tick: 9,
            server_unix_ms: 1,
        });

        let view = reader.read();
        assert_eq!(view.rtt_ms, Some(12));
        assert_eq!(view.tick(), Some(9));
    }

    #[test]
    fn test_read_is_a_copy() {
        let snapshot = Snapshot::new();
        snapshot.apply_state(state(3));
        let before = snapshot.read();
        snapshot.apply_state(state(6));
        assert_eq!(before.state.map(|s| s.tick), Some(3));
    }

    #[test]
    fn test_poisoned_lock_still_readable() {
        let snapshot = Snapshot::new();
        snapshot.apply_state(state(3));

        let poisoner = snapshot.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.inner.lock().unwrap();
            panic!("poison");
        })
        .join();

        assert_eq!(snapshot.read().tick(), Some(3));
    }
}
