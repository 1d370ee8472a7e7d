//! Owned TCP socket primitive.
//!
//! [`Socket`] wraps a `socket2::Socket` and exposes the non-blocking
//! operations the event loop needs. It is move-only; the descriptor is
//! released exactly once, when the value is closed or dropped.

use crate::error::TransportError;
use socket2::{Domain, Protocol, SockAddr, Type};
use std::io::{self, ErrorKind, Read, Write};
use std::net::SocketAddr;
use std::os::fd::{AsRawFd, RawFd};

/// Default listen backlog.
pub const DEFAULT_BACKLOG: i32 = 1024;

/// Result of a single non-blocking transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoStatus {
    /// Bytes moved. `Transferred(0)` from [`Socket::recv`] means the peer
    /// closed the stream.
    Transferred(usize),
    /// No data or capacity right now.
    WouldBlock,
}

/// Result of [`Socket::send_all`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Every byte was handed to the kernel.
    Complete,
    /// Send capacity ran out; the unsent tail was dropped.
    WouldBlock {
        /// Bytes written before blocking.
        sent: usize,
    },
    /// A write accepted zero bytes.
    Stalled {
        /// Bytes written before stalling.
        sent: usize,
    },
    /// A hard error ended the send.
    Failed {
        /// Bytes written before the error.
        sent: usize,
        /// Error kind reported by the OS.
        kind: ErrorKind,
    },
}

impl SendOutcome {
    /// Returns true if the whole payload was written.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete)
    }

    /// Number of bytes written.
    #[must_use]
    pub fn sent(&self, total: usize) -> usize {
        match *self {
            Self::Complete => total,
            Self::WouldBlock { sent } | Self::Stalled { sent } | Self::Failed { sent, .. } => sent,
        }
    }
}

/// An owned IPv4 TCP socket.
#[derive(Debug)]
pub struct Socket {
    inner: socket2::Socket,
}

impl Socket {
    /// Creates an IPv4 stream socket.
    ///
    /// # Errors
    /// Returns [`TransportError::Create`] if the OS cannot allocate one.
    pub fn tcp() -> Result<Self, TransportError> {
        let inner = socket2::Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP))
            .map_err(TransportError::Create)?;
        Ok(Self { inner })
    }

    /// Binds to `addr` with `SO_REUSEADDR` set. Port 0 picks an ephemeral
    /// port; see [`Socket::local_addr`].
    ///
    /// # Errors
    /// Returns [`TransportError::Bind`] on failure.
    pub fn bind(&self, addr: SocketAddr) -> Result<(), TransportError> {
        self.inner
            .set_reuse_address(true)
            .and_then(|()| self.inner.bind(&SockAddr::from(addr)))
            .map_err(|source| TransportError::Bind { addr, source })
    }

    /// Starts listening with the given backlog.
    ///
    /// # Errors
    /// Returns [`TransportError::Listen`] on failure.
    pub fn listen(&self, backlog: i32) -> Result<(), TransportError> {
        self.inner.listen(backlog).map_err(TransportError::Listen)
    }

    /// Returns the locally bound address.
    ///
    /// # Errors
    /// Returns IO error if the address cannot be read.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.inner.local_addr()?.as_socket().ok_or_else(|| {
            io::Error::new(ErrorKind::InvalidInput, "socket has no inet address")
        })
    }

    /// Toggles non-blocking mode.
    ///
    /// # Errors
    /// Returns IO error if the mode cannot be changed.
    pub fn set_nonblocking(&self, nonblocking: bool) -> io::Result<()> {
        self.inner.set_nonblocking(nonblocking)
    }

    /// Sets the kernel send buffer size.
    ///
    /// # Errors
    /// Returns IO error if the option cannot be set.
    pub fn set_send_buffer_size(&self, size: usize) -> io::Result<()> {
        self.inner.set_send_buffer_size(size)
    }

    /// Accepts one pending connection.
    ///
    /// # Returns
    /// `Ok(None)` when no connection is pending.
    ///
    /// # Errors
    /// Returns IO error for any other accept failure.
    pub fn accept(&self) -> io::Result<Option<(Socket, SocketAddr)>> {
        loop {
            match self.inner.accept() {
                Ok((inner, addr)) => {
                    let peer = addr.as_socket().ok_or_else(|| {
                        io::Error::new(ErrorKind::InvalidData, "peer has no inet address")
                    })?;
                    return Ok(Some((Socket { inner }, peer)));
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => return Ok(None),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Reads whatever is available into `buf`.
    ///
    /// # Errors
    /// Returns IO error for failures other than would-block.
    pub fn recv(&self, buf: &mut [u8]) -> io::Result<IoStatus> {
        loop {
            match (&self.inner).read(buf) {
                Ok(n) => return Ok(IoStatus::Transferred(n)),
                Err(e) if e.kind() == ErrorKind::WouldBlock => return Ok(IoStatus::WouldBlock),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Writes as much of `buf` as the kernel accepts.
    ///
    /// # Errors
    /// Returns IO error for failures other than would-block.
    pub fn send(&self, buf: &[u8]) -> io::Result<IoStatus> {
        loop {
            match (&self.inner).write(buf) {
                Ok(n) => return Ok(IoStatus::Transferred(n)),
                Err(e) if e.kind() == ErrorKind::WouldBlock => return Ok(IoStatus::WouldBlock),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Writes `payload`, retrying partial writes.
    ///
    /// Stops on would-block without waiting for write readiness; whatever
    /// was not written is dropped.
    pub fn send_all(&self, payload: &[u8]) -> SendOutcome {
        let mut offset = 0;
        while offset < payload.len() {
            match self.send(&payload[offset..]) {
                Ok(IoStatus::Transferred(0)) => return SendOutcome::Stalled { sent: offset },
                Ok(IoStatus::Transferred(n)) => offset += n,
                Ok(IoStatus::WouldBlock) => return SendOutcome::WouldBlock { sent: offset },
                Err(e) => {
                    return SendOutcome::Failed {
                        sent: offset,
                        kind: e.kind(),
                    };
                }
            }
        }
        SendOutcome::Complete
    }

    /// Closes the socket.
    pub fn close(self) {
        drop(self);
    }
}

impl AsRawFd for Socket {
    fn as_raw_fd(&self) -> RawFd {
        self.inner.as_raw_fd()
    }
}

impl From<std::net::TcpStream> for Socket {
    fn from(stream: std::net::TcpStream) -> Self {
        Self {
            inner: socket2::Socket::from(stream),
        }
    }
}

/// Creates a non-blocking listening socket bound to `addr`.
///
/// # Errors
/// Returns the first setup failure.
pub fn listen_on(addr: SocketAddr, backlog: i32) -> Result<Socket, TransportError> {
    let socket = Socket::tcp()?;
    socket.set_nonblocking(true)?;
    socket.bind(addr)?;
    socket.listen(backlog)?;
    Ok(socket)
}
