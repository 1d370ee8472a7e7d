//! # DarkEmu Core
//!
//! Wire types for the DarkEmu connect-server protocol.
//!
//! This crate provides:
//! - Frame prefix types for the `0xC1` / `0xC2` frame family
//! - Typed request and response messages with byte-exact encoding
//! - Error types for decoding operations

pub mod error;
pub mod frame;
pub mod message;

pub use error::{Error, Result};
pub use frame::{FrameHeader, FrameKind, LONG_FRAME_MARKER, SHORT_FRAME_MARKER};
pub use message::{
    CONNECT_SERVICE, DEFAULT_LIST_TAG, Request, SERVER_INFO_COMMAND, SERVER_LIST_COMMAND,
    ServerInfoResponse, ServerListEntry, ServerListResponse,
};
