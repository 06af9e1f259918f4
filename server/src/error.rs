//! Errors surfaced by the server library.
//!
//! Per-connection failures never show up here: they are codec errors that
//! evict a single peer. A [`ServerError`] ends the whole server.

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },
    #[error("listener failed: {0}")]
    Listener(#[from] io::Error),
}
