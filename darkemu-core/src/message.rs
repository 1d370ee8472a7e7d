//! Connect-server request and response messages.
//!
//! All multi-byte payload integers are little-endian; the long-frame
//! length and the server-list count are big-endian.

use crate::error::{Error, Result};
use crate::frame::{FrameHeader, FrameKind, SHORT_FRAME_MARKER};

/// Service code of the connect-server protocol.
pub const CONNECT_SERVICE: u8 = 0xF4;

/// Command code of the server-list request/response.
pub const SERVER_LIST_COMMAND: u8 = 0x06;

/// Command code of the server-info request/response.
pub const SERVER_INFO_COMMAND: u8 = 0x03;

/// List-type tag advertised when a roster entry does not set one.
pub const DEFAULT_LIST_TAG: u8 = 0xCC;

/// Request understood by the connect server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    /// `C1 04 F4 06` - list of visible game servers.
    ServerList,
    /// `C1 06 F4 03 <code:u16>` - address of one game server.
    ServerInfo {
        /// Server code to look up.
        code: u16,
    },
}

impl Request {
    /// Encoded length of the server-list request.
    pub const SERVER_LIST_LENGTH: usize = 4;

    /// Encoded length of the server-info request.
    pub const SERVER_INFO_LENGTH: usize = 6;

    /// Recognises a request at the start of `buffer`.
    ///
    /// Only short frames of the connect service are requests. Anything
    /// too short or unknown yields `None`; the caller ignores it.
    #[must_use]
    pub fn parse(buffer: &[u8]) -> Option<Self> {
        if buffer.len() < 4 {
            return None;
        }
        if buffer[0] != SHORT_FRAME_MARKER || buffer[2] != CONNECT_SERVICE {
            return None;
        }

        match buffer[3] {
            SERVER_LIST_COMMAND => Some(Self::ServerList),
            SERVER_INFO_COMMAND => {
                if buffer.len() < Self::SERVER_INFO_LENGTH {
                    return None;
                }
                let code = u16::from_le_bytes([buffer[4], buffer[5]]);
                Some(Self::ServerInfo { code })
            }
            _ => None,
        }
    }

    /// Encodes the request as a complete short frame.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        match *self {
            Self::ServerList => vec![
                SHORT_FRAME_MARKER,
                Self::SERVER_LIST_LENGTH as u8,
                CONNECT_SERVICE,
                SERVER_LIST_COMMAND,
            ],
            Self::ServerInfo { code } => {
                let [lo, hi] = code.to_le_bytes();
                vec![
                    SHORT_FRAME_MARKER,
                    Self::SERVER_INFO_LENGTH as u8,
                    CONNECT_SERVICE,
                    SERVER_INFO_COMMAND,
                    lo,
                    hi,
                ]
            }
        }
    }
}

/// One record of the server-list response.
///
/// # Wire Format
/// ```text
/// +0: code (u16 LE)
/// +2: load (u8)
/// +3: tag  (u8)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerListEntry {
    /// Server code.
    pub code: u16,
    /// Load indicator shown by the client.
    pub load: u8,
    /// List-type tag.
    pub tag: u8,
}

impl ServerListEntry {
    /// Encoded length of one record in bytes.
    pub const ENCODED_LENGTH: usize = 4;

    /// Creates a record.
    #[must_use]
    pub const fn new(code: u16, load: u8, tag: u8) -> Self {
        Self { code, load, tag }
    }
}

/// Server-list response, always a long frame.
///
/// # Wire Format
/// ```text
/// +0: 0xC2
/// +1: total length (u16 BE)
/// +3: 0xF4 0x06
/// +5: count (u16 BE)
/// +7: count x ServerListEntry
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerListResponse {
    /// Advertised servers, in roster order.
    pub entries: Vec<ServerListEntry>,
}

impl ServerListResponse {
    /// Length of the fixed part (frame header + count).
    pub const HEADER_LENGTH: usize = 7;

    /// Most records a single long frame can carry.
    pub const MAX_ENTRIES: usize =
        (u16::MAX as usize - Self::HEADER_LENGTH) / ServerListEntry::ENCODED_LENGTH;

    /// Encodes the response frame.
    ///
    /// # Errors
    /// Returns [`Error::FrameTooLarge`] if the records exceed one frame.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let length = Self::HEADER_LENGTH + self.entries.len() * ServerListEntry::ENCODED_LENGTH;
        let mut out = Vec::with_capacity(length);
        FrameHeader::new(FrameKind::Long, length, CONNECT_SERVICE, SERVER_LIST_COMMAND)
            .encode(&mut out)?;
        out.extend_from_slice(&(self.entries.len() as u16).to_be_bytes());
        for entry in &self.entries {
            out.extend_from_slice(&entry.code.to_le_bytes());
            out.push(entry.load);
            out.push(entry.tag);
        }
        Ok(out)
    }

    /// Decodes a complete response frame.
    ///
    /// # Errors
    /// Returns an error if the frame is not a well-formed server list.
    pub fn decode(frame: &[u8]) -> Result<Self> {
        let header = expect_header(frame, FrameKind::Long, SERVER_LIST_COMMAND)?;
        if frame.len() < Self::HEADER_LENGTH {
            return Err(Error::BufferTooShort {
                required: Self::HEADER_LENGTH,
                available: frame.len(),
            });
        }

        let count = u16::from_be_bytes([frame[5], frame[6]]) as usize;
        let required = Self::HEADER_LENGTH + count * ServerListEntry::ENCODED_LENGTH;
        if header.length != required {
            return Err(Error::LengthMismatch {
                declared: header.length,
                actual: required,
            });
        }

        let entries = frame[Self::HEADER_LENGTH..required]
            .chunks_exact(ServerListEntry::ENCODED_LENGTH)
            .map(|record| {
                ServerListEntry::new(
                    u16::from_le_bytes([record[0], record[1]]),
                    record[2],
                    record[3],
                )
            })
            .collect();
        Ok(Self { entries })
    }
}

/// Server-info response, always a short frame of fixed size.
///
/// # Wire Format
/// ```text
/// +0:  0xC1 0x16 0xF4 0x03
/// +4:  ip   (16 bytes, NUL-terminated, NUL-padded)
/// +20: port (u16 LE)
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInfoResponse {
    /// Game server address as dotted text.
    pub ip: String,
    /// Game server port.
    pub port: u16,
}

impl ServerInfoResponse {
    /// Width of the IP field in bytes.
    pub const IP_FIELD_LENGTH: usize = 16;

    /// Encoded length of the frame.
    pub const ENCODED_LENGTH: usize = 4 + Self::IP_FIELD_LENGTH + 2;

    /// Creates a response.
    #[must_use]
    pub fn new(ip: impl Into<String>, port: u16) -> Self {
        Self {
            ip: ip.into(),
            port,
        }
    }

    /// Encodes the response frame.
    ///
    /// The IP text is truncated to 15 bytes so the field always ends in NUL.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::ENCODED_LENGTH);
        out.extend_from_slice(&[
            SHORT_FRAME_MARKER,
            Self::ENCODED_LENGTH as u8,
            CONNECT_SERVICE,
            SERVER_INFO_COMMAND,
        ]);

        let mut ip_field = [0u8; Self::IP_FIELD_LENGTH];
        let ip = self.ip.as_bytes();
        let copy_len = ip.len().min(Self::IP_FIELD_LENGTH - 1);
        ip_field[..copy_len].copy_from_slice(&ip[..copy_len]);
        out.extend_from_slice(&ip_field);

        out.extend_from_slice(&self.port.to_le_bytes());
        out
    }

    /// Decodes a complete response frame.
    ///
    /// # Errors
    /// Returns an error if the frame is not a well-formed server-info reply.
    pub fn decode(frame: &[u8]) -> Result<Self> {
        let header = expect_header(frame, FrameKind::Short, SERVER_INFO_COMMAND)?;
        if header.length != Self::ENCODED_LENGTH || frame.len() < Self::ENCODED_LENGTH {
            return Err(Error::LengthMismatch {
                declared: header.length,
                actual: frame.len(),
            });
        }

        let ip_field = &frame[4..4 + Self::IP_FIELD_LENGTH];
        let end = ip_field
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(Self::IP_FIELD_LENGTH);
        let ip = String::from_utf8_lossy(&ip_field[..end]).into_owned();
        let port = u16::from_le_bytes([frame[20], frame[21]]);
        Ok(Self { ip, port })
    }
}

fn expect_header(frame: &[u8], kind: FrameKind, command: u8) -> Result<FrameHeader> {
    let header = FrameHeader::peek(frame)?.ok_or(Error::BufferTooShort {
        required: kind.min_len(),
        available: frame.len(),
    })?;
    if header.kind != kind {
        return Err(Error::UnknownMarker { marker: frame[0] });
    }
    if header.service != CONNECT_SERVICE || header.command != command {
        return Err(Error::UnexpectedCommand {
            expected_service: CONNECT_SERVICE,
            expected_command: command,
            service: header.service,
            command: header.command,
        });
    }
    if frame.len() < header.length {
        return Err(Error::BufferTooShort {
            required: header.length,
            available: frame.len(),
        });
    }
    Ok(header)
}
