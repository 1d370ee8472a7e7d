//! Error types for server operations.

use thiserror::Error;

/// Fatal server error.
///
/// Only setup and multiplexer failures surface here. Per-connection I/O
/// errors close the offending connection and are logged, never returned.
#[derive(Debug, Error)]
pub enum ServerError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Transport error.
    #[error("transport error: {0}")]
    Transport(#[from] darkemu_transport::TransportError),

    /// Roster error.
    #[error("roster error: {0}")]
    Roster(#[from] crate::roster::RosterError),

    /// The builder was not given a frame handler.
    #[error("no frame handler configured")]
    MissingHandler,
}
