//! Frame codec for async TCP streams.
//!
//! DarkEmu frames describe their own length (see
//! [`darkemu_core::FrameHeader`]), so the codec splits on the declared
//! length and passes the whole frame, prefix included, to the caller.

use bytes::{BufMut, BytesMut};
use darkemu_core::{FrameHeader, FrameKind};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::TransportError;

/// Codec for `0xC1` / `0xC2` frames.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameCodec;

impl FrameCodec {
    /// Creates a new frame codec.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for FrameCodec {
    type Item = BytesMut;
    type Error = std::io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let header = match FrameHeader::peek(src) {
            Ok(Some(header)) => header,
            Ok(None) => return Ok(None),
            Err(e) => return Err(TransportError::invalid_frame(e.to_string()).into()),
        };

        if !header.is_complete(src) {
            src.reserve(header.length - src.len());
            return Ok(None);
        }

        Ok(Some(src.split_to(header.length)))
    }
}

impl Encoder<&[u8]> for FrameCodec {
    type Error = std::io::Error;

    fn encode(&mut self, item: &[u8], dst: &mut BytesMut) -> Result<(), Self::Error> {
        let header = FrameHeader::peek(item)
            .map_err(|e| TransportError::invalid_frame(e.to_string()))?
            .ok_or_else(|| TransportError::invalid_frame("frame shorter than its header"))?;

        if header.length != item.len() {
            return Err(TransportError::invalid_frame(format!(
                "declared length {} but frame has {} bytes",
                header.length,
                item.len()
            ))
            .into());
        }
        if item.len() > FrameKind::Long.max_len() {
            let max = FrameKind::Long.max_len();
            return Err(TransportError::frame_too_large(item.len(), max).into());
        }

        dst.reserve(item.len());
        dst.put_slice(item);
        Ok(())
    }
}

impl Encoder<Vec<u8>> for FrameCodec {
    type Error = std::io::Error;

    fn encode(&mut self, item: Vec<u8>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        <Self as Encoder<&[u8]>>::encode(self, &item, dst)
    }
}
