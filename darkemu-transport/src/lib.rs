//! # DarkEmu Transport
//!
//! Network transport layer for the DarkEmu servers.
//!
//! This crate provides:
//! - [`poller`] - readiness multiplexer over raw descriptors
//! - [`socket`] - owned non-blocking TCP socket and the response send path
//! - [`framing`] - frame codec for async clients (feature `codec`)

pub mod error;
#[cfg(feature = "codec")]
pub mod framing;
pub mod poller;
pub mod socket;

pub use error::TransportError;
#[cfg(feature = "codec")]
pub use framing::FrameCodec;
pub use mio::Interest;
pub use poller::{DEFAULT_EVENT_CAPACITY, Poller, Readiness};
pub use socket::{DEFAULT_BACKLOG, IoStatus, SendOutcome, Socket, listen_on};
