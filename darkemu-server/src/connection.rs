//! Connection table.

use crate::handler::ConnectionId;
use bytes::BytesMut;
use darkemu_transport::Socket;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::os::fd::AsRawFd;

/// One accepted client connection.
#[derive(Debug)]
pub struct Connection {
    socket: Socket,
    peer_addr: SocketAddr,
    /// Bytes received and not yet consumed by the handler.
    pub buffer: BytesMut,
    bytes_received: u64,
}

impl Connection {
    /// Wraps an accepted socket.
    #[must_use]
    pub fn new(socket: Socket, peer_addr: SocketAddr) -> Self {
        Self {
            socket,
            peer_addr,
            buffer: BytesMut::new(),
            bytes_received: 0,
        }
    }

    /// Returns the connection id.
    #[must_use]
    pub fn id(&self) -> ConnectionId {
        ConnectionId(self.socket.as_raw_fd())
    }

    /// Returns the connection's socket.
    #[must_use]
    pub fn socket(&self) -> &Socket {
        &self.socket
    }

    /// Returns the peer address.
    #[must_use]
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Returns the total bytes read from this connection.
    #[must_use]
    pub fn bytes_received(&self) -> u64 {
        self.bytes_received
    }

    /// Appends freshly read bytes to the buffer.
    pub fn append(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
        self.bytes_received += chunk.len() as u64;
    }

    /// Closes the socket and discards unconsumed bytes.
    pub fn close(self) {
        self.socket.close();
    }

    /// Splits the connection into its socket and buffer for dispatch.
    pub(crate) fn parts_mut(&mut self) -> (&Socket, &mut BytesMut) {
        (&self.socket, &mut self.buffer)
    }
}

/// Open connections keyed by descriptor.
///
/// Removing an entry hands back the [`Connection`]; dropping it closes the
/// socket.
#[derive(Debug, Default)]
pub struct ConnectionTable {
    connections: HashMap<ConnectionId, Connection>,
}

impl ConnectionTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a connection and returns its id.
    ///
    /// A live descriptor cannot be handed out twice, so an existing entry
    /// under the same id is stale and gets replaced.
    pub fn insert(&mut self, connection: Connection) -> ConnectionId {
        let id = connection.id();
        if let Some(stale) = self.connections.insert(id, connection) {
            tracing::warn!(conn = %id, peer = %stale.peer_addr, "replaced stale connection");
        }
        id
    }

    /// Removes a connection.
    pub fn remove(&mut self, id: ConnectionId) -> Option<Connection> {
        self.connections.remove(&id)
    }

    /// Gets a mutable connection by id.
    pub fn get_mut(&mut self, id: ConnectionId) -> Option<&mut Connection> {
        self.connections.get_mut(&id)
    }

    /// Returns true if `id` is open.
    #[must_use]
    pub fn contains(&self, id: ConnectionId) -> bool {
        self.connections.contains_key(&id)
    }

    /// Returns the number of open connections.
    #[must_use]
    pub fn count(&self) -> usize {
        self.connections.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{TcpListener, TcpStream};

    fn accepted() -> (TcpStream, Connection) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let client = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        let (server, peer) = listener.accept().unwrap();
        (client, Connection::new(Socket::from(server), peer))
    }

    #[test]
    fn test_insert_and_remove() {
        let mut table = ConnectionTable::new();
        let (_c1, conn1) = accepted();
        let (_c2, conn2) = accepted();

        let id1 = table.insert(conn1);
        let id2 = table.insert(conn2);

        assert_ne!(id1, id2);
        assert_eq!(table.count(), 2);
        assert!(table.contains(id1));

        let removed = table.remove(id1).unwrap();
        assert_eq!(removed.id(), id1);
        assert_eq!(table.count(), 1);
        assert!(!table.contains(id1));
        assert!(table.remove(id1).is_none());
    }

    #[test]
    fn test_append_tracks_bytes() {
        let (client, mut conn) = accepted();
        conn.append(&[0xC1, 0x04]);
        conn.append(&[0xF4, 0x06]);

        assert_eq!(&conn.buffer[..], &[0xC1, 0x04, 0xF4, 0x06]);
        assert_eq!(conn.bytes_received(), 4);
        assert_eq!(conn.peer_addr(), client.local_addr().unwrap());
    }
}
