//! Error types for client operations.

use thiserror::Error;

/// Error type for client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The server answered with a malformed frame.
    #[error("decode error: {0}")]
    Decode(#[from] darkemu_core::Error),

    /// Connection timeout.
    #[error("connection timeout")]
    ConnectTimeout,

    /// No response arrived in time.
    #[error("response timeout")]
    ResponseTimeout,

    /// Connection closed by server.
    #[error("connection closed")]
    ConnectionClosed,
}
