//! # DarkEmu Client
//!
//! Async client for the DarkEmu connect server.
//!
//! This crate provides:
//! - Client builder with connect and response timeouts
//! - Typed server-list and server-info requests
//! - A framed session over tokio TCP streams

pub mod builder;
pub mod error;
pub mod session;

pub use builder::{Client, ClientBuilder};
pub use error::ClientError;
pub use session::ClientSession;
