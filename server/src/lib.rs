//! # Pong Server Library
//!
//! Authoritative server for a two-player Pong match played over TCP. The
//! server owns the only copy of the game state, steps it at a fixed rate and
//! tells both clients where everything is.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Simulation
//! Paddles and ball are advanced in fixed 16 ms steps regardless of when
//! packets arrive. Clients only ever send button state; every position they
//! draw comes from the server.
//!
//! ### Connection Management
//! Exactly two player slots exist. The first connection becomes the left
//! paddle, the second the right one. A player who disconnects mid-match is
//! evicted and the match carries on with their paddle frozen in place.
//!
//! ### State Broadcasting
//! Every third tick a `ServerState` snapshot (or, in heartbeat mode, a
//! `ServerBroadcast`) goes to every connected player.
//!
//! ## Architecture Design
//!
//! ### Single-Task Event Loop
//! One async task multiplexes the listener, both peers and the tick
//! schedule. Frames are routed one at a time between ticks, so the
//! simulation needs no locking.
//!
//! ### Framed TCP
//! Every message is a 3-byte header (type tag, little-endian payload size)
//! followed by a fixed-size payload. The framing lives in the `shared` crate.
//!
//! ## Module Organization
//!
//! - `broadcast`: which ticks are sent, and sending them
//! - `client_manager`: the two player slots and readiness polling
//! - `config`: runtime settings
//! - `error`: server error type
//! - `game`: paddle and ball physics
//! - `network`: the server loop and its lifecycle
//! - `router`: applying one incoming frame
//! - `utils`: server clock
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//! use tokio::sync::watch;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let (_shutdown_tx, shutdown_rx) = watch::channel(false);
//!     let mut server = Server::bind(ServerConfig::default(), shutdown_rx).await?;
//!
//!     // Waits for two players, then runs the match until both leave.
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod broadcast;
pub mod client_manager;
pub mod config;
pub mod error;
pub mod game;
pub mod network;
pub mod router;
pub mod utils;
