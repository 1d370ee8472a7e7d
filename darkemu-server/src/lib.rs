//! # DarkEmu Server
//!
//! Single-threaded TCP front-end for the DarkEmu connect and game servers.
//!
//! This crate provides:
//! - Server builder and readiness-driven accept/read loop
//! - Connection table keyed by descriptor
//! - Frame handler traits
//! - Connect-server dispatcher backed by a JSON server roster
//! - Game-server packet logger

pub mod builder;
pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod game;
pub mod handler;
pub mod roster;

pub use builder::{
    DEFAULT_CONNECT_PORT, DEFAULT_READ_CHUNK_SIZE, MIN_DISPATCH_LEN, Server, ServerBuilder,
    ServerStats, ShutdownHandle,
};
pub use connection::{Connection, ConnectionTable};
pub use dispatcher::{ConnectDispatcher, ConnectionPolicy};
pub use error::ServerError;
pub use game::{DEFAULT_GAME_PORT, PacketLogger, hex_dump};
pub use handler::{ConnectionId, Disposition, FnHandler, FrameHandler, Responder};
pub use roster::{LoadReport, RosterEntry, RosterError, ServerRoster, SkippedRecord};
