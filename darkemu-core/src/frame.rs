//! Frame prefix types.
//!
//! Every DarkEmu packet starts with a marker byte followed by the total
//! frame length:
//! - [`FrameKind::Short`] - `0xC1`, one length byte
//! - [`FrameKind::Long`] - `0xC2`, two length bytes (big-endian)
//!
//! The `(service, command)` pair follows the length field.

use crate::error::{Error, Result};

/// Marker byte of a short frame.
pub const SHORT_FRAME_MARKER: u8 = 0xC1;

/// Marker byte of a long frame.
pub const LONG_FRAME_MARKER: u8 = 0xC2;

/// Length-encoding family of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    /// `0xC1` frame with a one-byte total length.
    Short,
    /// `0xC2` frame with a two-byte big-endian total length.
    Long,
}

impl FrameKind {
    /// Maps a marker byte to its frame kind.
    #[must_use]
    pub const fn from_marker(marker: u8) -> Option<Self> {
        match marker {
            SHORT_FRAME_MARKER => Some(Self::Short),
            LONG_FRAME_MARKER => Some(Self::Long),
            _ => None,
        }
    }

    /// Returns the marker byte for this kind.
    #[must_use]
    pub const fn marker(self) -> u8 {
        match self {
            Self::Short => SHORT_FRAME_MARKER,
            Self::Long => LONG_FRAME_MARKER,
        }
    }

    /// Size of the marker plus the length field.
    #[must_use]
    pub const fn prefix_len(self) -> usize {
        match self {
            Self::Short => 2,
            Self::Long => 3,
        }
    }

    /// Smallest valid total length (prefix + service + command).
    #[must_use]
    pub const fn min_len(self) -> usize {
        self.prefix_len() + 2
    }

    /// Largest total length the length field can express.
    #[must_use]
    pub const fn max_len(self) -> usize {
        match self {
            Self::Short => u8::MAX as usize,
            Self::Long => u16::MAX as usize,
        }
    }
}

/// Decoded frame prefix.
///
/// # Wire Format
/// ```text
/// short: +0 marker (0xC1) | +1 length (u8)     | +2 service | +3 command
/// long:  +0 marker (0xC2) | +1 length (u16 BE) | +3 service | +4 command
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Length-encoding family.
    pub kind: FrameKind,
    /// Total frame length, prefix included.
    pub length: usize,
    /// Service code.
    pub service: u8,
    /// Command code.
    pub command: u8,
}

impl FrameHeader {
    /// Creates a header for a frame of `length` total bytes.
    #[must_use]
    pub const fn new(kind: FrameKind, length: usize, service: u8, command: u8) -> Self {
        Self {
            kind,
            length,
            service,
            command,
        }
    }

    /// Decodes the prefix at the start of `buffer`.
    ///
    /// # Returns
    /// `Ok(None)` while fewer bytes than the full header are buffered.
    ///
    /// # Errors
    /// Returns [`Error::UnknownMarker`] for an unrecognised first byte and
    /// [`Error::InvalidLength`] when the declared length cannot even hold
    /// the header.
    pub fn peek(buffer: &[u8]) -> Result<Option<Self>> {
        let Some(&marker) = buffer.first() else {
            return Ok(None);
        };
        let kind = FrameKind::from_marker(marker).ok_or(Error::UnknownMarker { marker })?;
        if buffer.len() < kind.min_len() {
            return Ok(None);
        }

        let length = match kind {
            FrameKind::Short => buffer[1] as usize,
            FrameKind::Long => u16::from_be_bytes([buffer[1], buffer[2]]) as usize,
        };
        if length < kind.min_len() {
            return Err(Error::InvalidLength {
                declared: length,
                minimum: kind.min_len(),
            });
        }

        let offset = kind.prefix_len();
        Ok(Some(Self {
            kind,
            length,
            service: buffer[offset],
            command: buffer[offset + 1],
        }))
    }

    /// Offset of the first payload byte (after service and command).
    #[must_use]
    pub const fn payload_offset(&self) -> usize {
        self.kind.prefix_len() + 2
    }

    /// Returns true if `buffer` holds the whole frame.
    #[must_use]
    pub fn is_complete(&self, buffer: &[u8]) -> bool {
        buffer.len() >= self.length
    }

    /// Appends the encoded header to `dst`.
    ///
    /// # Errors
    /// Returns [`Error::FrameTooLarge`] if `length` does not fit the
    /// length field of this frame kind.
    pub fn encode(&self, dst: &mut Vec<u8>) -> Result<()> {
        if self.length > self.kind.max_len() {
            return Err(Error::FrameTooLarge {
                size: self.length,
                max: self.kind.max_len(),
            });
        }
        dst.push(self.kind.marker());
        match self.kind {
            FrameKind::Short => dst.push(self.length as u8),
            FrameKind::Long => dst.extend_from_slice(&(self.length as u16).to_be_bytes()),
        }
        dst.push(self.service);
        dst.push(self.command);
        Ok(())
    }
}
