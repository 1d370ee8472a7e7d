//! Server builder and readiness loop.

use crate::connection::{Connection, ConnectionTable};
use crate::error::ServerError;
use crate::handler::{ConnectionId, Disposition, FrameHandler, SocketResponder};
use darkemu_transport::{
    DEFAULT_BACKLOG, DEFAULT_EVENT_CAPACITY, Interest, IoStatus, Poller, Readiness, Socket,
    listen_on,
};
use mio::Waker;
use std::net::{Ipv4Addr, SocketAddr};
use std::os::fd::AsRawFd;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Default connect-server port.
pub const DEFAULT_CONNECT_PORT: u16 = 44405;

/// Buffered bytes required before the handler is consulted.
pub const MIN_DISPATCH_LEN: usize = 3;

/// Default size of the per-read scratch area.
pub const DEFAULT_READ_CHUNK_SIZE: usize = 512;

/// Builder for configuring and creating a server.
pub struct ServerBuilder<H> {
    bind_addr: SocketAddr,
    handler: Option<H>,
    backlog: i32,
    max_events: usize,
    read_chunk_size: usize,
}

impl<H: FrameHandler> ServerBuilder<H> {
    /// Creates a new server builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_CONNECT_PORT)),
            handler: None,
            backlog: DEFAULT_BACKLOG,
            max_events: DEFAULT_EVENT_CAPACITY,
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
        }
    }

    /// Sets the bind address. Port 0 picks an ephemeral port.
    #[must_use]
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Sets the frame handler.
    #[must_use]
    pub fn handler(mut self, handler: H) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Sets the listen backlog.
    #[must_use]
    pub fn backlog(mut self, backlog: i32) -> Self {
        self.backlog = backlog;
        self
    }

    /// Sets the number of readiness events collected per tick.
    #[must_use]
    pub fn max_events(mut self, max: usize) -> Self {
        self.max_events = max;
        self
    }

    /// Sets the size of a single read.
    #[must_use]
    pub fn read_chunk_size(mut self, size: usize) -> Self {
        self.read_chunk_size = size.max(1);
        self
    }

    /// Binds, listens and prepares the readiness loop.
    ///
    /// # Errors
    /// Returns [`ServerError::MissingHandler`] if no handler was set, or the
    /// transport error from socket creation, bind, listen or poller setup.
    pub fn build(self) -> Result<Server<H>, ServerError> {
        let handler = self.handler.ok_or(ServerError::MissingHandler)?;

        let listener = listen_on(self.bind_addr, self.backlog)?;
        let local_addr = listener.local_addr()?;
        let mut poller = Poller::new(self.max_events)?;
        poller.register(listener.as_raw_fd(), Interest::READABLE)?;

        tracing::info!(%local_addr, "server listening");

        Ok(Server {
            listener,
            local_addr,
            poller,
            connections: ConnectionTable::new(),
            handler,
            ready: Vec::with_capacity(self.max_events),
            scratch: vec![0u8; self.read_chunk_size],
            stats: ServerStats::default(),
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }
}

impl<H: FrameHandler> Default for ServerBuilder<H> {
    fn default() -> Self {
        Self::new()
    }
}

/// Counters maintained by the readiness loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServerStats {
    /// Connections accepted.
    pub accepted: u64,
    /// Connections closed.
    pub closed: u64,
    /// Bytes read from all connections.
    pub bytes_received: u64,
}

/// Handle for stopping [`Server::run`] from another thread.
#[derive(Clone)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
    waker: Arc<Waker>,
}

impl ShutdownHandle {
    /// Requests a stop and wakes the loop.
    pub fn shutdown(&self) {
        self.flag.store(true, Ordering::Release);
        if let Err(e) = self.waker.wake() {
            tracing::warn!(error = %e, "failed to wake server loop");
        }
    }

    /// Returns true once a stop was requested.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// Single-threaded TCP server driven by readiness events.
pub struct Server<H> {
    listener: Socket,
    local_addr: SocketAddr,
    poller: Poller,
    connections: ConnectionTable,
    handler: H,
    ready: Vec<Readiness>,
    scratch: Vec<u8>,
    stats: ServerStats,
    shutdown: Arc<AtomicBool>,
}

impl<H: FrameHandler> Server<H> {
    /// Returns the bound address.
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Returns the bound port.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    /// Returns the number of open connections.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.count()
    }

    /// Returns the loop counters.
    #[must_use]
    pub fn stats(&self) -> ServerStats {
        self.stats
    }

    /// Returns the handler.
    #[must_use]
    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Returns the handler for changes between ticks.
    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    /// Returns a handle that stops [`Server::run`].
    #[must_use]
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            flag: Arc::clone(&self.shutdown),
            waker: self.poller.waker(),
        }
    }

    /// Runs the loop until a [`ShutdownHandle`] requests a stop.
    ///
    /// # Errors
    /// Returns `ServerError` if waiting for readiness fails.
    pub fn run(&mut self) -> Result<(), ServerError> {
        tracing::info!(addr = %self.local_addr, "server running");
        while !self.shutdown.load(Ordering::Acquire) {
            self.run_once(None)?;
        }
        tracing::info!(addr = %self.local_addr, "server stopped");
        Ok(())
    }

    /// Runs a single tick: one wait, then every ready event in order.
    ///
    /// # Arguments
    /// * `timeout` - `None` blocks until an event or wake-up
    ///
    /// # Returns
    /// Number of ready descriptors processed.
    ///
    /// # Errors
    /// Returns `ServerError` if waiting for readiness fails.
    pub fn run_once(&mut self, timeout: Option<Duration>) -> Result<usize, ServerError> {
        let count = self.poller.wait(&mut self.ready, timeout)?;
        let listener_fd = self.listener.as_raw_fd();

        for index in 0..count {
            let event = self.ready[index];
            if event.fd == listener_fd {
                self.accept_pending();
            } else {
                self.service(ConnectionId(event.fd), event);
            }
        }
        Ok(count)
    }

    fn accept_pending(&mut self) {
        loop {
            match self.listener.accept() {
                Ok(Some((socket, peer))) => self.admit(socket, peer),
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(error = %e, "accept failed");
                    self.rearm_listener();
                    break;
                }
            }
        }
    }

    /// Re-arms the edge-triggered listener so connections still queued in
    /// the backlog are reported again on the next wait.
    fn rearm_listener(&mut self) {
        let fd = self.listener.as_raw_fd();
        if let Err(e) = self.poller.modify(fd, Interest::READABLE) {
            tracing::warn!(error = %e, "failed to re-arm listener");
        }
    }

    fn admit(&mut self, socket: Socket, peer: SocketAddr) {
        if let Err(e) = socket.set_nonblocking(true) {
            tracing::warn!(%peer, error = %e, "failed to configure connection, dropping");
            return;
        }
        if let Err(e) = self.poller.register(socket.as_raw_fd(), Interest::READABLE) {
            tracing::warn!(%peer, error = %e, "failed to register connection, dropping");
            return;
        }

        let id = self.connections.insert(Connection::new(socket, peer));
        self.stats.accepted += 1;
        tracing::info!(conn = %id, %peer, "connection accepted");
        self.handler.on_session_start(id);
    }

    fn service(&mut self, id: ConnectionId, event: Readiness) {
        if !self.connections.contains(id) {
            return;
        }
        if event.error || event.hangup {
            tracing::debug!(conn = %id, error = event.error, "peer hung up");
            self.close_connection(id);
            return;
        }
        if !event.readable {
            return;
        }

        loop {
            let Some(conn) = self.connections.get_mut(id) else {
                return;
            };
            match conn.socket().recv(&mut self.scratch) {
                Ok(IoStatus::Transferred(0)) => {
                    tracing::debug!(conn = %id, "peer closed");
                    self.close_connection(id);
                    return;
                }
                Ok(IoStatus::Transferred(n)) => {
                    let chunk = &self.scratch[..n];
                    conn.append(chunk);
                    self.stats.bytes_received += n as u64;
                    self.handler.on_receive(id, chunk);
                }
                Ok(IoStatus::WouldBlock) => break,
                Err(e) => {
                    tracing::warn!(conn = %id, error = %e, "read failed");
                    self.close_connection(id);
                    return;
                }
            }
        }

        let Some(conn) = self.connections.get_mut(id) else {
            return;
        };
        if conn.buffer.len() < MIN_DISPATCH_LEN {
            return;
        }

        let (socket, buffer) = conn.parts_mut();
        let mut responder = SocketResponder { conn: id, socket };
        if self.handler.on_frame(id, buffer, &mut responder) == Disposition::Close {
            self.close_connection(id);
        }
    }

    fn close_connection(&mut self, id: ConnectionId) {
        let Some(conn) = self.connections.remove(id) else {
            return;
        };
        if let Err(e) = self.poller.deregister(id.fd()) {
            tracing::warn!(conn = %id, error = %e, "deregister failed");
        }
        self.stats.closed += 1;
        tracing::debug!(conn = %id, peer = %conn.peer_addr(), "connection closed");
        conn.close();
        self.handler.on_session_end(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{FnHandler, Responder};
    use bytes::BytesMut;
    use std::io::{Read, Write};
    use std::net::TcpStream;

    type EchoFn = fn(ConnectionId, &mut BytesMut, &mut dyn Responder) -> Disposition;
    type EchoHandler = FnHandler<EchoFn>;

    fn echo(
        _conn: ConnectionId,
        buffer: &mut BytesMut,
        responder: &mut dyn Responder,
    ) -> Disposition {
        let frame = buffer.split();
        responder.send(&frame);
        Disposition::KeepOpen
    }

    fn echo_server() -> Server<EchoHandler> {
        ServerBuilder::new()
            .bind("127.0.0.1:0".parse().unwrap())
            .handler(FnHandler::new(echo as EchoFn))
            .build()
            .unwrap()
    }

    fn tick_until<H: FrameHandler>(
        server: &mut Server<H>,
        mut done: impl FnMut(&Server<H>) -> bool,
    ) {
        for _ in 0..100 {
            if done(&*server) {
                return;
            }
            server.run_once(Some(Duration::from_millis(20))).unwrap();
        }
        assert!(done(&*server), "condition not reached");
    }

    #[test]
    fn test_builder_requires_handler() {
        let result = ServerBuilder::<EchoHandler>::new()
            .bind("127.0.0.1:0".parse().unwrap())
            .build();
        assert!(matches!(result, Err(ServerError::MissingHandler)));
    }

    #[test]
    fn test_build_reports_ephemeral_port() {
        let server = echo_server();
        assert_ne!(server.port(), 0);
        assert_eq!(server.connection_count(), 0);
        assert_eq!(server.stats(), ServerStats::default());
    }

    #[test]
    fn test_bind_conflict_is_fatal() {
        let first = echo_server();
        let result = ServerBuilder::new()
            .bind(first.local_addr())
            .handler(FnHandler::new(echo as EchoFn))
            .build();
        assert!(matches!(result, Err(ServerError::Transport(_))));
    }

    #[test]
    fn test_run_once_zero_timeout() {
        let mut server = echo_server();
        assert_eq!(server.run_once(Some(Duration::ZERO)).unwrap(), 0);
    }

    #[test]
    fn test_echo_round_trip() {
        let mut server = echo_server();
        let mut client = TcpStream::connect(server.local_addr()).unwrap();

        tick_until(&mut server, |s| s.connection_count() == 1);
        client.write_all(b"hello").unwrap();
        tick_until(&mut server, |s| s.stats().bytes_received == 5);

        let mut buf = [0u8; 5];
        client.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"hello");

        drop(client);
        tick_until(&mut server, |s| s.connection_count() == 0);
        assert_eq!(server.stats().accepted, 1);
        assert_eq!(server.stats().closed, 1);
    }

    #[test]
    fn test_short_read_is_not_dispatched() {
        let mut server = echo_server();
        let mut client = TcpStream::connect(server.local_addr()).unwrap();
        client.write_all(&[0xC1, 0x04]).unwrap();

        tick_until(&mut server, |s| s.stats().bytes_received == 2);
        client
            .set_read_timeout(Some(Duration::from_millis(100)))
            .unwrap();
        let mut buf = [0u8; 4];
        assert!(client.read(&mut buf).is_err());
        assert_eq!(server.connection_count(), 1);
    }

    #[derive(Default)]
    struct SessionLog {
        started: Vec<ConnectionId>,
        ended: Vec<ConnectionId>,
    }

    impl FrameHandler for SessionLog {
        fn on_frame(
            &mut self,
            _conn: ConnectionId,
            _buffer: &mut BytesMut,
            _responder: &mut dyn Responder,
        ) -> Disposition {
            Disposition::KeepOpen
        }

        fn on_session_start(&mut self, conn: ConnectionId) {
            self.started.push(conn);
        }

        fn on_session_end(&mut self, conn: ConnectionId) {
            self.ended.push(conn);
        }
    }

    #[test]
    fn test_mid_frame_close_deregisters_connection() {
        let mut server = ServerBuilder::new()
            .bind("127.0.0.1:0".parse().unwrap())
            .handler(SessionLog::default())
            .build()
            .unwrap();
        let listener_fd = server.listener.as_raw_fd();
        assert_eq!(server.poller.registered_count(), 1);

        let mut client = TcpStream::connect(server.local_addr()).unwrap();
        tick_until(&mut server, |s| s.connection_count() == 1);
        let id = server.handler().started[0];
        assert!(server.poller.is_registered(id.fd()));
        assert_eq!(server.poller.registered_count(), 2);

        client.write_all(&[0xC1, 0x06, 0xF4, 0x03]).unwrap();
        tick_until(&mut server, |s| s.stats().bytes_received == 4);
        drop(client);
        tick_until(&mut server, |s| s.connection_count() == 0);

        assert!(!server.connections.contains(id));
        assert!(!server.poller.is_registered(id.fd()));
        assert_eq!(server.poller.registered_count(), 1);
        assert!(server.poller.is_registered(listener_fd));
        assert_eq!(server.handler().ended, vec![id]);
    }

    #[test]
    fn test_shutdown_handle_stops_run() {
        let mut server = echo_server();
        let handle = server.shutdown_handle();
        assert!(!handle.is_shutdown());

        let stopper = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            handle.shutdown();
        });

        server.run().unwrap();
        stopper.join().unwrap();
    }
}
