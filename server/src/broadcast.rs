//! Decides which ticks emit authoritative state and sends it to every peer.
//!
//! Physics runs every tick; the network only hears about every Nth one.

use crate::client_manager::ConnectionSet;
use crate::config::BroadcastMode;
use crate::game::{PlayerIndex, Simulation};
use crate::utils::ServerClock;
use shared::codec::send_message_within;
use shared::{CodecError, Message, ServerBroadcast};
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct BroadcastScheduler {
    every: u32,
    mode: BroadcastMode,
}

impl BroadcastScheduler {
    pub fn new(every: u32, mode: BroadcastMode) -> Self {
        Self {
            every: every.max(1),
            mode,
        }
    }

    pub fn every(&self) -> u32 {
        self.every
    }

    /// True for ticks that are multiples of the cadence.
    pub fn should_broadcast(&self, tick: u32) -> bool {
        tick % self.every == 0
    }

    /// The message describing the simulation right now.
    pub fn message(&self, simulation: &Simulation, clock: &ServerClock) -> Message {
        match self.mode {
            BroadcastMode::State => Message::ServerState(simulation.snapshot()),
            BroadcastMode::Heartbeat => Message::ServerBroadcast(ServerBroadcast {
                tick: simulation.tick,
                server_unix_ms: clock.unix_ms(),
            }),
        }
    }
}

/// Sends `message` to every peer, one after another.
///
/// A failed send does not stop the pass; every failing peer is returned with
/// its error so the caller can evict it.
pub async fn broadcast(
    connections: &mut ConnectionSet,
    message: &Message,
    limit: Duration,
) -> Vec<(PlayerIndex, CodecError)> {
    let mut failures = Vec::new();
    for peer in connections.peers_mut() {
        if let Err(e) = send_message_within(peer.writer(), message, limit).await {
            failures.push((peer.player, e));
        }
    }
    failures
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::codec::recv_message;
    use shared::Incoming;
    use tokio::net::{TcpListener, TcpStream};

    #[test]
    fn test_cadence_over_two_periods() {
        let scheduler = BroadcastScheduler::new(3, BroadcastMode::State);
        let mut sim = Simulation::new();
        let mut emitted = Vec::new();

        for _ in 0..6 {
            sim.step();
            if scheduler.should_broadcast(sim.tick) {
                emitted.push(sim.tick);
            }
        }

        assert_eq!(emitted, vec![3, 6]);
    }

    #[test]
    fn test_any_window_of_two_periods_has_two_broadcasts() {
        let scheduler = BroadcastScheduler::new(3, BroadcastMode::State);
        for start in 1..50u32 {
            let count = (start..start + 6)
                .filter(|&tick| scheduler.should_broadcast(tick))
                .count();
            assert_eq!(count, 2, "window starting at {}", start);
        }
    }

    #[test]
    fn test_zero_cadence_means_every_tick() {
        let scheduler = BroadcastScheduler::new(0, BroadcastMode::State);
        assert_eq!(scheduler.every(), 1);
        assert!((1..10).all(|tick| scheduler.should_broadcast(tick)));
    }

    #[test]
    fn test_message_follows_mode() {
        let mut sim = Simulation::new();
        sim.step();
        let clock = ServerClock::new();

        let state = BroadcastScheduler::new(3, BroadcastMode::State).message(&sim, &clock);
        assert_eq!(state, Message::ServerState(sim.snapshot()));

        match BroadcastScheduler::new(3, BroadcastMode::Heartbeat).message(&sim, &clock) {
            Message::ServerBroadcast(heartbeat) => {
                assert_eq!(heartbeat.tick, 1);
                assert!(heartbeat.server_unix_ms > 0);
            }
            other => panic!("expected heartbeat, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_broadcast_reaches_every_peer() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let mut connections = ConnectionSet::new();
        let mut clients = Vec::new();
        for _ in 0..2 {
            clients.push(TcpStream::connect(addr).await.unwrap());
            let (stream, peer_addr) = listener.accept().await.unwrap();
            connections.add_peer(stream, peer_addr).unwrap();
        }

        let sim = Simulation::new();
        let message = Message::ServerState(sim.snapshot());
        let failures = broadcast(&mut connections, &message, Duration::from_millis(200)).await;
        assert!(failures.is_empty());

        for client in clients.iter_mut() {
            let incoming = recv_message(client).await.unwrap();
            assert_eq!(incoming, Incoming::Known(message.clone()));
        }
    }

    #[tokio::test]
    async fn test_failed_peer_does_not_stop_the_others() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let mut connections = ConnectionSet::new();
        let mut clients = Vec::new();
        for _ in 0..2 {
            clients.push(TcpStream::connect(addr).await.unwrap());
            let (stream, peer_addr) = listener.accept().await.unwrap();
            connections.add_peer(stream, peer_addr).unwrap();
        }
        drop(clients.remove(0));

        // The first writes after a close may still be accepted by the kernel.
        let mut sim = Simulation::new();
        let mut sent = Vec::new();
        let mut failures = Vec::new();
        for _ in 0..50 {
            sim.step();
            let message = Message::ServerState(sim.snapshot());
            failures = broadcast(&mut connections, &message, Duration::from_millis(200)).await;
            sent.push(message);
            if !failures.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let failed: Vec<PlayerIndex> = failures.iter().map(|(player, _)| *player).collect();
        assert_eq!(failed, vec![0]);

        let live = &mut clients[0];
        for message in sent {
            assert_eq!(recv_message(live).await.unwrap(), Incoming::Known(message));
        }
    }
}
