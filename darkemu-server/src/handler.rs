//! Frame handler traits.

use bytes::BytesMut;
use darkemu_transport::{SendOutcome, Socket};
use std::fmt;
use std::os::fd::RawFd;

/// Identifies a connection by its descriptor.
///
/// Descriptors are reused by the OS once a connection is closed, so an id
/// is only meaningful while the connection is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub RawFd);

impl ConnectionId {
    /// Returns the underlying descriptor.
    #[must_use]
    pub const fn fd(self) -> RawFd {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fd:{}", self.0)
    }
}

/// What the event loop does with a connection after a handler call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Close the connection and drop its buffer.
    Close,
    /// Keep the connection registered and wait for more data.
    KeepOpen,
}

/// Trait for handling buffered inbound data.
///
/// Handlers run on the event-loop thread and may keep mutable state.
pub trait FrameHandler: Send {
    /// Called with the buffered bytes once at least
    /// [`crate::MIN_DISPATCH_LEN`] bytes are available.
    ///
    /// The handler consumes whatever it processed from `buffer`; bytes left
    /// in place are presented again after the next read.
    ///
    /// # Arguments
    /// * `conn` - Connection the data arrived on
    /// * `buffer` - Bytes received and not yet consumed
    /// * `responder` - Interface for writing responses
    fn on_frame(
        &mut self,
        conn: ConnectionId,
        buffer: &mut BytesMut,
        responder: &mut dyn Responder,
    ) -> Disposition;

    /// Called for every successful read, before dispatch.
    ///
    /// # Arguments
    /// * `conn` - Connection the data arrived on
    /// * `chunk` - Bytes returned by this read
    fn on_receive(&mut self, _conn: ConnectionId, _chunk: &[u8]) {}

    /// Called when a connection is accepted.
    fn on_session_start(&mut self, _conn: ConnectionId) {}

    /// Called after a connection is removed.
    fn on_session_end(&mut self, _conn: ConnectionId) {}
}

/// Responder for writing frames back to the current connection.
pub trait Responder {
    /// Writes `frame` to the connection.
    ///
    /// Partial writes are retried; on would-block the unsent tail is
    /// dropped and reported in the outcome.
    fn send(&mut self, frame: &[u8]) -> SendOutcome;
}

/// Responder writing straight to a connection's socket.
pub(crate) struct SocketResponder<'a> {
    pub(crate) conn: ConnectionId,
    pub(crate) socket: &'a Socket,
}

impl Responder for SocketResponder<'_> {
    fn send(&mut self, frame: &[u8]) -> SendOutcome {
        let outcome = self.socket.send_all(frame);
        match outcome {
            SendOutcome::Complete => {}
            SendOutcome::WouldBlock { sent } => {
                tracing::warn!(
                    conn = %self.conn,
                    sent,
                    dropped = frame.len() - sent,
                    "send would block, dropping unsent bytes"
                );
            }
            SendOutcome::Stalled { sent } => {
                tracing::warn!(conn = %self.conn, sent, "send wrote zero bytes");
            }
            SendOutcome::Failed { sent, kind } => {
                tracing::warn!(conn = %self.conn, sent, ?kind, "send error");
            }
        }
        outcome
    }
}

/// Wrapper to convert a closure into a [`FrameHandler`].
pub struct FnHandler<F> {
    handler: F,
}

impl<F> FnHandler<F>
where
    F: FnMut(ConnectionId, &mut BytesMut, &mut dyn Responder) -> Disposition + Send,
{
    /// Creates a new function handler.
    pub fn new(handler: F) -> Self {
        Self { handler }
    }
}

impl<F> FrameHandler for FnHandler<F>
where
    F: FnMut(ConnectionId, &mut BytesMut, &mut dyn Responder) -> Disposition + Send,
{
    fn on_frame(
        &mut self,
        conn: ConnectionId,
        buffer: &mut BytesMut,
        responder: &mut dyn Responder,
    ) -> Disposition {
        (self.handler)(conn, buffer, responder)
    }
}
