//! # DarkEmu
//!
//! Network front-end for the DarkEmu game-server emulator.
//!
//! DarkEmu answers the connect-server handshake of the game client: it
//! lists the advertised game servers and resolves a server code to its
//! address. A game-server front-end accepts connections and logs traffic.
//!
//! ## Quick Start
//!
//! ```ignore
//! use darkemu::prelude::*;
//!
//! let dispatcher = ConnectDispatcher::from_roster_file("ServerList.json")?;
//! let mut server = ServerBuilder::new()
//!     .bind("0.0.0.0:44405".parse().unwrap())
//!     .handler(dispatcher)
//!     .build()?;
//!
//! server.run()?;
//! ```
//!
//! ## Crate Organization
//!
//! - [`core`] - Frame prefix and message types
//! - [`transport`] - Readiness multiplexer, sockets, async frame codec
//! - [`server`] - Event loop, connect dispatcher, roster, game logger
//! - [`client`] - Async connect-server client

pub mod prelude;
pub mod runtime;

/// Frame and message types.
pub mod core {
    pub use darkemu_core::*;
}

/// Network transport layer.
pub mod transport {
    pub use darkemu_transport::*;
}

/// Server-side engine.
pub mod server {
    pub use darkemu_server::*;
}

/// Client-side engine.
pub mod client {
    pub use darkemu_client::*;
}
