//! Error types for DarkEmu protocol decoding.

use thiserror::Error;

/// Core error type for frame and message decoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Buffer is too short for the requested operation.
    #[error("buffer too short: required {required} bytes, available {available} bytes")]
    BufferTooShort {
        /// Required buffer size in bytes.
        required: usize,
        /// Available buffer size in bytes.
        available: usize,
    },

    /// Leading byte is not a known frame marker.
    #[error("unknown frame marker 0x{marker:02X}")]
    UnknownMarker {
        /// Marker byte found at offset 0.
        marker: u8,
    },

    /// Declared frame length cannot hold the frame header.
    #[error("invalid frame length {declared} (header needs {minimum} bytes)")]
    InvalidLength {
        /// Length declared by the frame.
        declared: usize,
        /// Minimum length for this frame kind.
        minimum: usize,
    },

    /// Declared frame length disagrees with the bytes supplied.
    #[error("frame length mismatch: declared {declared}, actual {actual}")]
    LengthMismatch {
        /// Length declared by the frame.
        declared: usize,
        /// Number of bytes actually supplied.
        actual: usize,
    },

    /// Frame carries a different service/command pair than expected.
    #[error(
        "unexpected command: expected {expected_service:02X}/{expected_command:02X}, \
         actual {service:02X}/{command:02X}"
    )]
    UnexpectedCommand {
        /// Expected service code.
        expected_service: u8,
        /// Expected command code.
        expected_command: u8,
        /// Service code found.
        service: u8,
        /// Command code found.
        command: u8,
    },

    /// Payload does not fit in a single frame.
    #[error("frame too large: {size} bytes exceeds maximum {max} bytes")]
    FrameTooLarge {
        /// Encoded size in bytes.
        size: usize,
        /// Maximum size for the frame kind.
        max: usize,
    },
}

/// Result type alias for DarkEmu core operations.
pub type Result<T> = std::result::Result<T, Error>;
