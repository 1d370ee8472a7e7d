//! Client builder and request helpers.

use crate::error::ClientError;
use crate::session::ClientSession;
use bytes::BytesMut;
use darkemu_core::{Request, ServerInfoResponse, ServerListEntry, ServerListResponse};
use std::net::SocketAddr;
use std::time::Duration;

/// Builder for configuring and creating a client.
pub struct ClientBuilder {
    server_addr: SocketAddr,
    connect_timeout: Duration,
    response_timeout: Duration,
}

impl ClientBuilder {
    /// Creates a new client builder for the specified server address.
    #[must_use]
    pub fn new(server_addr: SocketAddr) -> Self {
        Self {
            server_addr,
            connect_timeout: Duration::from_secs(5),
            response_timeout: Duration::from_secs(5),
        }
    }

    /// Sets the connection timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets how long to wait for a response.
    #[must_use]
    pub fn response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    /// Builds the client.
    #[must_use]
    pub fn build(self) -> Client {
        Client {
            server_addr: self.server_addr,
            connect_timeout: self.connect_timeout,
            response_timeout: self.response_timeout,
        }
    }
}

/// Connect-server client.
///
/// Every request opens its own connection, since the server closes after
/// answering.
#[derive(Debug, Clone)]
pub struct Client {
    server_addr: SocketAddr,
    connect_timeout: Duration,
    response_timeout: Duration,
}

impl Client {
    /// Returns the server address.
    #[must_use]
    pub fn server_addr(&self) -> SocketAddr {
        self.server_addr
    }

    /// Opens a new session to the server.
    ///
    /// # Errors
    /// Returns [`ClientError::ConnectTimeout`] or the connect error.
    pub async fn connect(&self) -> Result<ClientSession, ClientError> {
        let stream = tokio::time::timeout(
            self.connect_timeout,
            tokio::net::TcpStream::connect(self.server_addr),
        )
        .await
        .map_err(|_| ClientError::ConnectTimeout)??;

        stream.set_nodelay(true)?;
        tracing::debug!("Connected to {}", self.server_addr);
        Ok(ClientSession::new(stream))
    }

    /// Requests the list of visible game servers.
    ///
    /// # Errors
    /// Returns [`ClientError::ConnectionClosed`] if the server closed
    /// without answering, or a connect, timeout or decode error.
    pub async fn server_list(&self) -> Result<Vec<ServerListEntry>, ClientError> {
        let frame = self
            .exchange(Request::ServerList)
            .await?
            .ok_or(ClientError::ConnectionClosed)?;
        Ok(ServerListResponse::decode(&frame)?.entries)
    }

    /// Requests the address of one game server.
    ///
    /// # Returns
    /// `None` if the server does not know `code`.
    ///
    /// # Errors
    /// Returns a connect, timeout or decode error.
    pub async fn server_info(&self, code: u16) -> Result<Option<ServerInfoResponse>, ClientError> {
        match self.exchange(Request::ServerInfo { code }).await? {
            Some(frame) => Ok(Some(ServerInfoResponse::decode(&frame)?)),
            None => Ok(None),
        }
    }

    async fn exchange(&self, request: Request) -> Result<Option<BytesMut>, ClientError> {
        let mut session = self.connect().await?;
        session.send(&request.encode()).await?;

        let response = tokio::time::timeout(self.response_timeout, session.recv())
            .await
            .map_err(|_| ClientError::ResponseTimeout)??;
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let addr: SocketAddr = "127.0.0.1:44405".parse().unwrap();
        let client = ClientBuilder::new(addr).build();
        assert_eq!(client.server_addr(), addr);
        assert_eq!(client.connect_timeout, Duration::from_secs(5));
        assert_eq!(client.response_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_builder_timeouts() {
        let client = ClientBuilder::new("127.0.0.1:44405".parse().unwrap())
            .connect_timeout(Duration::from_millis(100))
            .response_timeout(Duration::from_millis(200))
            .build();
        assert_eq!(client.connect_timeout, Duration::from_millis(100));
        assert_eq!(client.response_timeout, Duration::from_millis(200));
    }

    #[tokio::test]
    async fn test_response_timeout() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        // Accept and hold the connection without answering.
        let holder = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(2)).await;
            drop(stream);
        });

        let client = ClientBuilder::new(addr)
            .response_timeout(Duration::from_millis(50))
            .build();
        let err = client.server_list().await.unwrap_err();
        assert!(matches!(err, ClientError::ResponseTimeout));
        holder.abort();
    }
}
