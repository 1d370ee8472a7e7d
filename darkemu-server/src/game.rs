//! Game-server front-end.
//!
//! Accepts connections and logs every received chunk. No game protocol
//! is decoded yet.

use crate::handler::{ConnectionId, Disposition, FrameHandler, Responder};
use bytes::BytesMut;

/// Default game-server port.
pub const DEFAULT_GAME_PORT: u16 = 55901;

/// Handler that logs and counts inbound bytes.
#[derive(Debug, Default)]
pub struct PacketLogger {
    bytes_received: u64,
}

impl PacketLogger {
    /// Creates a logger with a zero counter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total bytes received across all connections.
    #[must_use]
    pub fn bytes_received(&self) -> u64 {
        self.bytes_received
    }
}

impl FrameHandler for PacketLogger {
    fn on_frame(
        &mut self,
        _conn: ConnectionId,
        buffer: &mut BytesMut,
        _responder: &mut dyn Responder,
    ) -> Disposition {
        buffer.clear();
        Disposition::KeepOpen
    }

    fn on_receive(&mut self, conn: ConnectionId, chunk: &[u8]) {
        self.bytes_received += chunk.len() as u64;
        tracing::info!(%conn, "RX ({} bytes): {}", chunk.len(), hex_dump(chunk));
    }

    fn on_session_start(&mut self, conn: ConnectionId) {
        tracing::debug!(%conn, "game client connected");
    }

    fn on_session_end(&mut self, conn: ConnectionId) {
        tracing::debug!(%conn, "game client disconnected");
    }
}

/// Formats bytes as lowercase hex pairs separated by spaces.
#[must_use]
pub fn hex_dump(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use darkemu_transport::SendOutcome;

    struct NullResponder;

    impl Responder for NullResponder {
        fn send(&mut self, _frame: &[u8]) -> SendOutcome {
            SendOutcome::Complete
        }
    }

    #[test]
    fn test_hex_dump() {
        assert_eq!(hex_dump(&[]), "");
        assert_eq!(hex_dump(&[0xC1]), "c1");
        assert_eq!(hex_dump(&[0xC1, 0x04, 0xF4, 0x06]), "c1 04 f4 06");
    }

    #[test]
    fn test_counts_received_bytes() {
        let mut logger = PacketLogger::new();
        logger.on_receive(ConnectionId(4), &[1, 2, 3]);
        logger.on_receive(ConnectionId(5), &[4, 5]);
        assert_eq!(logger.bytes_received(), 5);
    }

    #[test]
    fn test_frame_consumes_buffer_and_keeps_open() {
        let mut logger = PacketLogger::new();
        let mut buffer = BytesMut::from(&[1u8, 2, 3, 4][..]);
        let disposition = logger.on_frame(ConnectionId(4), &mut buffer, &mut NullResponder);
        assert_eq!(disposition, Disposition::KeepOpen);
        assert!(buffer.is_empty());
    }
}
