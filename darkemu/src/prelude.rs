//! Prelude module for convenient imports.
//!
//! ```ignore
//! use darkemu::prelude::*;
//! ```

// Core types
pub use darkemu_core::{
    Error as CoreError, FrameHeader, FrameKind, Request, Result as CoreResult,
    ServerInfoResponse, ServerListEntry, ServerListResponse,
};

// Transport types
pub use darkemu_transport::{Poller, Readiness, SendOutcome, Socket, TransportError};

// Server types
pub use darkemu_server::{
    ConnectDispatcher, ConnectionId, ConnectionPolicy, Disposition, FrameHandler, PacketLogger,
    Responder, RosterEntry, RosterError, Server, ServerBuilder, ServerError, ServerRoster,
    ShutdownHandle,
};

// Client types
pub use darkemu_client::{Client, ClientBuilder, ClientError, ClientSession};
