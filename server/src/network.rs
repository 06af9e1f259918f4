//! Server loop: connection lifecycle, fixed-timestep scheduling and eviction.
//!
//! The server walks through [`LoopState`]:
//!
//! - `Listening`: bound, not yet accepting.
//! - `AwaitingPeers`: accepts and greets players until both slots are full.
//!   Already connected players are serviced meanwhile, except while a new
//!   connection is given up to `hello_timeout` for its hello. No ticks run
//!   before the match, so that pause only delays lobby pings.
//! - `Active`: the match. When a tick is due the simulation steps once and
//!   broadcasts on the cadence. Otherwise the loop waits for I/O no longer
//!   than the time left until that tick and routes one frame from every
//!   readable peer.
//! - `Draining`: closes all peers and returns from [`Server::run`].
//!
//! A shutdown signal moves any state straight to `Draining`, as does the
//! last player leaving an active match. A player who leaves mid-match is
//! evicted and their paddle freezes; nobody can take the free slot.

use crate::broadcast::{broadcast, BroadcastScheduler};
use crate::client_manager::{clamp_wait, ConnectionSet};
use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::game::{PlayerIndex, Simulation};
use crate::router::{route_frame, Routed};
use crate::utils::ServerClock;
use log::{debug, info, warn};
use shared::codec::send_message_within;
use shared::{CodecError, Message, ServerHello};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::time::{timeout, Instant};

/// If the loop falls this many ticks behind, the schedule is reset to now
/// instead of stepping in a burst.
pub const MAX_CATCH_UP_TICKS: u32 = 5;

/// How long to wait for connected players' frames between accepts.
const LOBBY_POLL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Listening,
    AwaitingPeers,
    Active,
    Draining,
}

pub struct Server {
    listener: TcpListener,
    config: ServerConfig,
    connections: ConnectionSet,
    simulation: Simulation,
    scheduler: BroadcastScheduler,
    clock: ServerClock,
    state: LoopState,
    shutdown: watch::Receiver<bool>,
}

impl Server {
    /// Binds the listening socket. Sending `true` on the `shutdown` channel,
    /// or dropping its sender, stops a running server.
    pub async fn bind(
        config: ServerConfig,
        shutdown: watch::Receiver<bool>,
    ) -> Result<Self, ServerError> {
        let address = config.address();
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|source| ServerError::Bind {
                addr: address.clone(),
                source,
            })?;
        info!("Server listening on {}", listener.local_addr()?);

        let scheduler = BroadcastScheduler::new(config.broadcast_every, config.mode);
        info!(
            "Broadcasting {:?} every {} ticks",
            config.mode,
            scheduler.every()
        );

        Ok(Server {
            listener,
            scheduler,
            config,
            connections: ConnectionSet::new(),
            simulation: Simulation::new(),
            clock: ServerClock::new(),
            state: LoopState::Listening,
            shutdown,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn simulation(&self) -> &Simulation {
        &self.simulation
    }

    /// Runs until shutdown or until every player has left the match.
    pub async fn run(&mut self) -> Result<(), ServerError> {
        self.transition(LoopState::AwaitingPeers);
        loop {
            match self.state {
                LoopState::Listening => self.transition(LoopState::AwaitingPeers),
                LoopState::AwaitingPeers => self.await_peers().await?,
                LoopState::Active => self.run_match().await,
                LoopState::Draining => {
                    self.connections.close_all().await;
                    info!("All connections closed");
                    return Ok(());
                }
            }
        }
    }

    fn transition(&mut self, next: LoopState) {
        if self.state != next {
            info!("{:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }

    fn shutdown_requested(&self) -> bool {
        *self.shutdown.borrow() || self.shutdown.has_changed().is_err()
    }

    async fn await_peers(&mut self) -> Result<(), ServerError> {
        while !self.connections.is_full() {
            if self.shutdown_requested() {
                self.transition(LoopState::Draining);
                return Ok(());
            }

            tokio::select! {
                accepted = self.listener.accept() => {
                    let (stream, addr) = accepted?;
                    self.admit(stream, addr).await;
                }
                ready = self.connections.poll_readable(LOBBY_POLL) => {
                    for player in ready {
                        self.service(player).await;
                    }
                }
                _ = self.shutdown.changed() => {}
            }
        }

        info!("Two players connected, starting match");
        self.transition(LoopState::Active);
        Ok(())
    }

    /// Greets a new connection and gives it the client's optional hello.
    async fn admit(&mut self, stream: TcpStream, addr: SocketAddr) {
        if let Err(e) = stream.set_nodelay(true) {
            warn!("Could not set TCP_NODELAY for {}: {}", addr, e);
        }

        let Some(player) = self.connections.add_peer(stream, addr) else {
            warn!("Rejecting {}: match is full", addr);
            return;
        };

        let hello = Message::ServerHello(ServerHello {
            server_start_ms: self.clock.uptime_ms(),
        });
        let limit = self.config.frame_timeout();
        let sent = match self.connections.peer_mut(player) {
            Some(peer) => send_message_within(peer.writer(), &hello, limit).await,
            None => return,
        };
        if let Err(e) = sent {
            self.evict(player, &e).await;
            return;
        }
        self.simulation.connect_player(player);

        // The hello is optional: give the client a moment, and route whatever
        // frame it sends first.
        let readable = match self.connections.peer_mut(player) {
            Some(peer) => timeout(self.config.hello_timeout(), peer.readable()).await,
            None => return,
        };
        match readable {
            Ok(_) => {
                if self.connections.poll_readable(Duration::ZERO).await.contains(&player) {
                    self.service(player).await;
                } else {
                    debug!("Player {} sent no hello yet", player);
                }
            }
            Err(_) => info!("Player {} sent no hello", player),
        }
    }

    async fn run_match(&mut self) {
        let tick = self.config.tick_duration();
        let mut next_tick = Instant::now() + tick;

        loop {
            if self.shutdown_requested() {
                self.transition(LoopState::Draining);
                return;
            }

            let now = Instant::now();
            if now >= next_tick {
                self.advance_tick().await;
                next_tick += tick;
                if now.saturating_duration_since(next_tick) > tick * MAX_CATCH_UP_TICKS {
                    warn!(
                        "Server fell behind by more than {} ticks, resynchronising",
                        MAX_CATCH_UP_TICKS
                    );
                    next_tick = now + tick;
                }
            } else {
                let wait = clamp_wait(now, next_tick, tick);
                let ready = tokio::select! {
                    ready = self.connections.poll_readable(wait) => ready,
                    _ = self.shutdown.changed() => Vec::new(),
                };
                for player in ready {
                    self.service(player).await;
                }
            }

            if self.connections.is_empty() {
                info!("All players left");
                self.transition(LoopState::Draining);
                return;
            }
        }
    }

    /// One simulation step, plus a broadcast when the cadence says so.
    async fn advance_tick(&mut self) {
        let outcome = self.simulation.step();
        let tick = self.simulation.tick;

        if let Some(side) = outcome.missed {
            debug!("Tick {}: ball escaped on the {:?} side, relaunching", tick, side);
        }

        if tick % 60 == 0 {
            debug!(
                "Tick {}: {} players, paddles at {:?}",
                tick,
                self.connections.len(),
                self.simulation.paddle_y
            );
        }

        if self.scheduler.should_broadcast(tick) {
            let message = self.scheduler.message(&self.simulation, &self.clock);
            let failures =
                broadcast(&mut self.connections, &message, self.config.frame_timeout()).await;
            for (player, error) in failures {
                self.evict(player, &error).await;
            }
        }
    }

    /// Reads and applies one frame from a readable peer, evicting it on failure.
    async fn service(&mut self, player: PlayerIndex) {
        let limit = self.config.frame_timeout();
        let Some(peer) = self.connections.peer_mut(player) else {
            return;
        };

        let (mut reader, writer) = peer.split();
        let result = route_frame(
            &mut reader,
            writer,
            player,
            &mut self.simulation,
            &self.clock,
            limit,
        )
        .await;

        match result {
            Ok(Routed::Hello(name)) => peer.name = Some(name),
            Ok(_) => {}
            Err(e) => self.evict(player, &e).await,
        }
    }

    async fn evict(&mut self, player: PlayerIndex, reason: &CodecError) {
        if let Some(peer) = self.connections.remove_peer(player) {
            if reason.is_closed() {
                info!("{} disconnected", peer.label());
            } else {
                warn!("Evicting {}: {}", peer.label(), reason);
            }
        }
        self.simulation.disconnect_player(player);
    }
}
