//! Connection tracking for the two player slots.
//!
//! This module owns every peer socket for the lifetime of the match:
//! - Slot assignment on accept (first free slot, 0 = left, 1 = right)
//! - Bounded readiness polling across all peers without blocking on any one
//! - Removal of evicted peers so nothing is sent to them afterwards
//!
//! Readiness is confirmed with a one-byte non-blocking read before a peer is
//! reported, so a spurious wakeup never makes the router wait on a socket
//! that has nothing to say. The byte is kept as lookahead and replayed in
//! front of the stream by [`Peer::split`].

use crate::game::PlayerIndex;
use log::{debug, info};
use shared::MAX_PLAYERS;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt, Chain};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::time::{sleep_until, Instant};

/// Reader handed to the router: the lookahead byte (if any) followed by the socket.
pub type FrameReader<'a> = Chain<&'a [u8], &'a mut OwnedReadHalf>;

/// One connected player.
#[derive(Debug)]
pub struct Peer {
    pub player: PlayerIndex,
    pub addr: SocketAddr,
    /// Name announced in the client's hello, if it sent one.
    pub name: Option<String>,
    reader: OwnedReadHalf,
    writer: OwnedWriteHalf,
    lookahead: [u8; 1],
    lookahead_len: usize,
}

impl Peer {
    pub fn new(player: PlayerIndex, stream: TcpStream, addr: SocketAddr) -> Self {
        let (reader, writer) = stream.into_split();
        Self {
            player,
            addr,
            name: None,
            reader,
            writer,
            lookahead: [0; 1],
            lookahead_len: 0,
        }
    }

    /// Label for log lines.
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => format!("player {} '{}' ({})", self.player, name, self.addr),
            None => format!("player {} ({})", self.player, self.addr),
        }
    }

    /// Checks without blocking whether a frame read can start right now.
    ///
    /// End of stream and socket errors also count as readable so the next
    /// read surfaces them.
    fn probe(&mut self) -> bool {
        if self.lookahead_len > 0 {
            return true;
        }
        match self.reader.try_read(&mut self.lookahead) {
            Ok(0) => true,
            Ok(n) => {
                self.lookahead_len = n;
                true
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => false,
            Err(_) => true,
        }
    }

    /// Waits until the socket might be readable. May wake spuriously.
    pub async fn readable(&self) -> io::Result<()> {
        self.reader.readable().await
    }

    /// Reader and writer halves for routing one frame. Consumes the lookahead.
    pub fn split(&mut self) -> (FrameReader<'_>, &mut OwnedWriteHalf) {
        let len = std::mem::take(&mut self.lookahead_len);
        let reader = (&self.lookahead[..len]).chain(&mut self.reader);
        (reader, &mut self.writer)
    }

    pub fn writer(&mut self) -> &mut OwnedWriteHalf {
        &mut self.writer
    }
}

/// The set of live peers, indexed by player slot.
#[derive(Debug, Default)]
pub struct ConnectionSet {
    slots: [Option<Peer>; MAX_PLAYERS],
}

impl ConnectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Places a freshly accepted stream in the first free slot.
    ///
    /// Returns the assigned player index, or None if both slots are taken.
    pub fn add_peer(&mut self, stream: TcpStream, addr: SocketAddr) -> Option<PlayerIndex> {
        let player = self.slots.iter().position(Option::is_none)?;
        self.slots[player] = Some(Peer::new(player, stream, addr));
        info!("Player {} connected from {}", player, addr);
        Some(player)
    }

    /// Removes a peer. Dropping the returned handle closes the socket.
    pub fn remove_peer(&mut self, player: PlayerIndex) -> Option<Peer> {
        self.slots.get_mut(player).and_then(Option::take)
    }

    pub fn peer_mut(&mut self, player: PlayerIndex) -> Option<&mut Peer> {
        self.slots.get_mut(player).and_then(Option::as_mut)
    }

    pub fn players(&self) -> Vec<PlayerIndex> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .map(|(player, _)| player)
            .collect()
    }

    pub fn peers_mut(&mut self) -> impl Iterator<Item = &mut Peer> {
        self.slots.iter_mut().flatten()
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() == MAX_PLAYERS
    }

    /// Waits at most `max_wait` for any peer to become readable and returns
    /// every peer that is readable now. An empty result means the wait
    /// timed out.
    pub async fn poll_readable(&mut self, max_wait: Duration) -> Vec<PlayerIndex> {
        let deadline = Instant::now() + max_wait;
        loop {
            let ready = self.probe_all();
            if !ready.is_empty() || Instant::now() >= deadline {
                return ready;
            }

            let [first, second] = &self.slots;
            tokio::select! {
                _ = wait_readable(first) => {},
                _ = wait_readable(second) => {},
                _ = sleep_until(deadline) => {},
            }
        }
    }

    fn probe_all(&mut self) -> Vec<PlayerIndex> {
        self.peers_mut()
            .filter_map(|peer| peer.probe().then_some(peer.player))
            .collect()
    }

    /// Shuts down the write side of every peer and empties the set.
    pub async fn close_all(&mut self) {
        for slot in self.slots.iter_mut() {
            if let Some(mut peer) = slot.take() {
                if let Err(e) = peer.writer.shutdown().await {
                    debug!("Shutdown of {} failed: {}", peer.label(), e);
                }
                info!("Closed {}", peer.label());
            }
        }
    }
}

async fn wait_readable(slot: &Option<Peer>) -> io::Result<()> {
    match slot {
        Some(peer) => peer.readable().await,
        None => std::future::pending().await,
    }
}

/// Time the loop may block for I/O before the next tick is due.
///
/// Never negative and never longer than one tick.
pub fn clamp_wait(now: Instant, next_tick: Instant, tick: Duration) -> Duration {
    next_tick.saturating_duration_since(now).min(tick)
}
