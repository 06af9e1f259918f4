//! # Pong Client Library
//!
//! A headless reference client for the pong server. It speaks the full
//! protocol but draws nothing beyond a text view of the field, which makes
//! it useful for smoke tests, load experiments and watching a match from a
//! terminal.
//!
//! ## Architecture Overview
//!
//! The server is authoritative, so the client holds no simulation of its
//! own. It only sends the buttons it is "holding" and remembers the latest
//! state it was told about.
//!
//! ### Receive Task
//! One tokio task reads frames from the server and copies each
//! `ServerState`, `ServerBroadcast` and `ServerPong` into a shared
//! [`game::Snapshot`].
//!
//! ### Send Loop
//! The main task sends a `ClientInput` every 16 ms with an increasing
//! sequence number, and a `ClientPing` every 3 s. Round-trip time is taken
//! from the echoed timestamp in each `ServerPong`.
//!
//! ### Console Renderer
//! A plain OS thread prints the snapshot a few times per second. It locks
//! the snapshot only long enough to copy it.
//!
//! ## Module Organization
//!
//! - `game`: the mutex-guarded snapshot of what the server said
//! - `input`: scripted button sources (bot, up, down, idle)
//! - `network`: connection, handshake, send loop and receive task
//! - `rendering`: text output of the snapshot
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::game::Snapshot;
//! use client::input::{InputMode, InputSource};
//! use client::network::Client;
//! use client::rendering::ConsoleRenderer;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let snapshot = Snapshot::new();
//!     let _renderer = ConsoleRenderer::start(snapshot.clone(), Duration::from_millis(500));
//!
//!     let client = Client::connect(
//!         "127.0.0.1:7777",
//!         "Player",
//!         InputSource::new(InputMode::Bot),
//!         snapshot,
//!     )
//!     .await?;
//!     client.run(Some(Duration::from_secs(30))).await?;
//!     Ok(())
//! }
//! ```

pub mod game;
pub mod input;
pub mod network;
pub mod rendering;
