//! Client session management.

use bytes::BytesMut;
use darkemu_transport::FrameCodec;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;

/// Client session wrapping a TCP connection.
pub struct ClientSession {
    framed: Framed<TcpStream, FrameCodec>,
}

impl ClientSession {
    /// Creates a new client session from a TCP stream.
    #[must_use]
    pub fn new(stream: TcpStream) -> Self {
        Self {
            framed: Framed::new(stream, FrameCodec::new()),
        }
    }

    /// Sends a complete frame to the server.
    ///
    /// # Errors
    /// Returns IO error if the frame is malformed or the send fails.
    pub async fn send(&mut self, frame: &[u8]) -> std::io::Result<()> {
        self.framed.send(frame).await
    }

    /// Receives one frame from the server.
    ///
    /// # Returns
    /// `Ok(Some(bytes))` with the whole frame, prefix included, or
    /// `Ok(None)` if the connection closed.
    ///
    /// # Errors
    /// Returns IO error if receive fails or the server sent garbage.
    pub async fn recv(&mut self) -> std::io::Result<Option<BytesMut>> {
        match self.framed.next().await {
            Some(result) => result.map(Some),
            None => Ok(None),
        }
    }

    /// Closes the session.
    pub async fn close(mut self) -> std::io::Result<()> {
        SinkExt::<&[u8]>::close(&mut self.framed).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_send_and_recv_frames() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let peer = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 4];
            stream.read_exact(&mut request).await.unwrap();
            assert_eq!(request, [0xC1, 0x04, 0xF4, 0x06]);
            // Split the reply across writes to exercise reassembly.
            stream.write_all(&[0xC2, 0x00]).await.unwrap();
            stream
                .write_all(&[0x07, 0xF4, 0x06, 0x00, 0x00])
                .await
                .unwrap();
        });

        let mut session = ClientSession::new(TcpStream::connect(addr).await.unwrap());
        session.send(&[0xC1, 0x04, 0xF4, 0x06]).await.unwrap();
        let frame = session.recv().await.unwrap().unwrap();
        assert_eq!(&frame[..], &[0xC2, 0x00, 0x07, 0xF4, 0x06, 0x00, 0x00]);

        peer.await.unwrap();
        assert!(session.recv().await.unwrap().is_none());
        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_send_rejects_malformed_frame() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _accept = tokio::spawn(async move { listener.accept().await });

        let mut session = ClientSession::new(TcpStream::connect(addr).await.unwrap());
        let err = session.send(&[0xC1, 0x09, 0xF4, 0x06]).await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }
}
