//! Error types for transport operations.

use std::net::SocketAddr;
use std::os::fd::RawFd;
use thiserror::Error;

/// Error type for transport operations.
#[derive(Debug, Error)]
pub enum TransportError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The OS refused to allocate a socket.
    #[error("socket creation failed: {0}")]
    Create(#[source] std::io::Error),

    /// Binding the listening socket failed.
    #[error("bind to {addr} failed: {source}")]
    Bind {
        /// Requested address.
        addr: SocketAddr,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Switching the socket to listening mode failed.
    #[error("listen failed: {0}")]
    Listen(#[source] std::io::Error),

    /// The readiness instance could not be created.
    #[error("poller creation failed: {0}")]
    PollCreate(#[source] std::io::Error),

    /// Descriptor is already registered with the poller.
    #[error("descriptor {fd} is already registered")]
    AlreadyRegistered {
        /// Offending descriptor.
        fd: RawFd,
    },

    /// Descriptor is not registered with the poller.
    #[error("descriptor {fd} is not registered")]
    NotRegistered {
        /// Offending descriptor.
        fd: RawFd,
    },

    /// Frame too large.
    #[error("frame too large: {size} bytes exceeds maximum {max} bytes")]
    FrameTooLarge {
        /// Actual frame size.
        size: usize,
        /// Maximum allowed size.
        max: usize,
    },

    /// Invalid frame.
    #[error("invalid frame: {message}")]
    InvalidFrame {
        /// Error message.
        message: String,
    },
}

impl TransportError {
    /// Creates a frame too large error.
    pub fn frame_too_large(size: usize, max: usize) -> Self {
        Self::FrameTooLarge { size, max }
    }

    /// Creates an invalid frame error.
    pub fn invalid_frame(message: impl Into<String>) -> Self {
        Self::InvalidFrame {
            message: message.into(),
        }
    }
}

impl From<TransportError> for std::io::Error {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Io(e) => e,
            other => std::io::Error::new(std::io::ErrorKind::InvalidData, other),
        }
    }
}
