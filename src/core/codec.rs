//! Stream reassembly over a byte transport.
//!
//! The transport hands over arbitrary chunks with no regard for message boundaries.
//! [`FrameCodec`] accumulates bytes until the packet size declared at offset 4 of the
//! current frame is available, then splits off exactly that many bytes and hands them
//! to [`Frame::from_bytes`]. Anything beyond the declared size stays buffered and is
//! parsed as the start of the next frame, so several frames delivered in one read are
//! all emitted, in order.

use bytes::{Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

use crate::config::MAX_FRAME_SIZE;
use crate::core::frame::{Frame, PACKET_SIZE_OFFSET, PREAMBLE_LEN};
use crate::error::{ProtocolError, Result};

#[derive(Debug, Clone, Copy)]
pub struct FrameCodec {
    max_frame_size: usize,
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameCodec {
    pub fn new() -> Self {
        Self {
            max_frame_size: MAX_FRAME_SIZE,
        }
    }

    pub fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }

    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>> {
        let Some(declared) = Frame::peek_packet_size(src) else {
            // Not even the size field yet.
            src.reserve(PACKET_SIZE_OFFSET + 4 - src.len());
            return Ok(None);
        };

        if declared < PREAMBLE_LEN {
            return Err(ProtocolError::InvalidHeader);
        }
        if declared > self.max_frame_size {
            return Err(ProtocolError::OversizedPacket(declared));
        }

        if src.len() < declared {
            // Size the accumulation buffer for the whole frame up front.
            src.reserve(declared - src.len());
            trace!(have = src.len(), need = declared, "Partial frame buffered");
            return Ok(None);
        }

        let frame_bytes = src.split_to(declared);
        Frame::from_bytes(&frame_bytes).map(Some)
    }
}

impl Encoder<Frame> for FrameCodec {
    type Error = ProtocolError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<()> {
        let size = item.packet_size();
        if size > self.max_frame_size {
            return Err(ProtocolError::OversizedPacket(size));
        }
        item.encode_into(dst);
        Ok(())
    }
}

/// Already-serialized frames (the outgoing queue holds bytes, not commands).
impl Encoder<Bytes> for FrameCodec {
    type Error = ProtocolError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<()> {
        dst.extend_from_slice(&item);
        Ok(())
    }
}
