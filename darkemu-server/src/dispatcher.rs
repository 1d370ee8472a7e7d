//! Connect-server request dispatcher.

use crate::error::ServerError;
use crate::handler::{ConnectionId, Disposition, FrameHandler, Responder};
use crate::roster::ServerRoster;
use bytes::BytesMut;
use darkemu_core::{FrameHeader, Request, ServerInfoResponse};
use std::path::Path;

/// What happens to a connection after its request is handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionPolicy {
    /// Inspect the buffer once, answer if recognised, then close.
    #[default]
    CloseAfterResponse,
    /// Answer complete frames one by one and keep the connection open.
    KeepAlive,
}

/// Dispatcher answering list and info requests from a [`ServerRoster`].
#[derive(Debug, Clone, Default)]
pub struct ConnectDispatcher {
    roster: ServerRoster,
    policy: ConnectionPolicy,
}

impl ConnectDispatcher {
    /// Creates a dispatcher with the default close-after-response policy.
    #[must_use]
    pub fn new(roster: ServerRoster) -> Self {
        Self {
            roster,
            policy: ConnectionPolicy::default(),
        }
    }

    /// Creates a dispatcher from a JSON roster file.
    ///
    /// # Errors
    /// Returns [`ServerError::Roster`] if the file cannot be read or holds
    /// no valid record.
    pub fn from_roster_file(path: impl AsRef<Path>) -> Result<Self, ServerError> {
        let path = path.as_ref();
        let mut roster = ServerRoster::new();
        let report = roster.load_file(path)?;
        tracing::info!(
            path = %path.display(),
            loaded = report.loaded,
            skipped = report.skipped.len(),
            "roster loaded"
        );
        Ok(Self::new(roster))
    }

    /// Sets the connection policy.
    #[must_use]
    pub fn with_policy(mut self, policy: ConnectionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Returns the connection policy.
    #[must_use]
    pub fn policy(&self) -> ConnectionPolicy {
        self.policy
    }

    /// Returns the roster.
    #[must_use]
    pub fn roster(&self) -> &ServerRoster {
        &self.roster
    }

    /// Returns the roster for reloading between ticks.
    pub fn roster_mut(&mut self) -> &mut ServerRoster {
        &mut self.roster
    }

    /// Computes the response to the request at the start of `frame`.
    ///
    /// # Returns
    /// `None` for unrecognised or too-short requests and for info requests
    /// naming an unknown code.
    #[must_use]
    pub fn respond(&self, frame: &[u8]) -> Option<Vec<u8>> {
        match Request::parse(frame)? {
            Request::ServerList => Some(self.roster.serialize()),
            Request::ServerInfo { code } => {
                let Some(entry) = self.roster.find_by_code(code) else {
                    tracing::debug!(code, "server info requested for unknown code");
                    return None;
                };
                Some(ServerInfoResponse::new(entry.ip.as_str(), entry.port).encode())
            }
        }
    }

    fn answer_once(
        &self,
        conn: ConnectionId,
        buffer: &mut BytesMut,
        responder: &mut dyn Responder,
    ) -> Disposition {
        match self.respond(buffer) {
            Some(response) => {
                tracing::debug!(%conn, len = response.len(), "sending response");
                responder.send(&response);
            }
            None => tracing::debug!(%conn, len = buffer.len(), "ignoring unrecognised request"),
        }
        buffer.clear();
        Disposition::Close
    }

    fn answer_frames(
        &self,
        conn: ConnectionId,
        buffer: &mut BytesMut,
        responder: &mut dyn Responder,
    ) -> Disposition {
        loop {
            let header = match FrameHeader::peek(buffer) {
                Ok(Some(header)) => header,
                Ok(None) => return Disposition::KeepOpen,
                Err(e) => {
                    tracing::debug!(%conn, error = %e, "malformed frame, closing");
                    return Disposition::Close;
                }
            };
            if !header.is_complete(buffer) {
                return Disposition::KeepOpen;
            }

            let frame = buffer.split_to(header.length);
            if let Some(response) = self.respond(&frame) {
                tracing::debug!(%conn, len = response.len(), "sending response");
                if !responder.send(&response).is_complete() {
                    return Disposition::Close;
                }
            }
        }
    }
}

impl FrameHandler for ConnectDispatcher {
    fn on_frame(
        &mut self,
        conn: ConnectionId,
        buffer: &mut BytesMut,
        responder: &mut dyn Responder,
    ) -> Disposition {
        match self.policy {
            ConnectionPolicy::CloseAfterResponse => self.answer_once(conn, buffer, responder),
            ConnectionPolicy::KeepAlive => self.answer_frames(conn, buffer, responder),
        }
    }
}
