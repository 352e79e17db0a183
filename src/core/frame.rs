//! Frame codec: conversion between an ordered list of words and the wire bytes.
//!
//! ```text
//! [Header u32 LE] [PacketSize u32 LE] [NumWords u32 LE] { [Len u32 LE] [Bytes..Len] [0x00] }*
//! ```
//!
//! The header packs the 30-bit sequence number with two flags: bit 31 is set when the
//! message was originated by the client, bit 30 is set when the message is a response.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{constants, ProtocolError, Result};

/// Fixed preamble: header, packet size and word count.
pub const PREAMBLE_LEN: usize = 12;

/// Per-word overhead: 4-byte length prefix plus the null terminator.
pub const WORD_OVERHEAD: usize = 5;

/// Offset of the packet size field inside the preamble.
pub const PACKET_SIZE_OFFSET: usize = 4;

/// Low 30 bits of the header carry the sequence number.
pub const SEQUENCE_MASK: u32 = 0x3FFF_FFFF;

/// Set when the message was *not* originated by the server.
pub const CLIENT_ORIGIN_FLAG: u32 = 0x8000_0000;

/// Set when the message is a response.
pub const RESPONSE_FLAG: u32 = 0x4000_0000;

/// Decoded header bit fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub sequence: u32,
    pub is_from_server: bool,
    pub is_response: bool,
}

impl Header {
    pub fn new(sequence: u32, is_from_server: bool, is_response: bool) -> Self {
        Self {
            sequence: sequence & SEQUENCE_MASK,
            is_from_server,
            is_response,
        }
    }

    /// Pack into the 32-bit wire representation.
    #[inline]
    pub fn to_u32(self) -> u32 {
        let mut header = self.sequence & SEQUENCE_MASK;
        if !self.is_from_server {
            header |= CLIENT_ORIGIN_FLAG;
        }
        if self.is_response {
            header |= RESPONSE_FLAG;
        }
        header
    }

    /// Unpack the 32-bit wire representation.
    #[inline]
    pub fn from_u32(raw: u32) -> Self {
        Self {
            sequence: raw & SEQUENCE_MASK,
            is_from_server: raw & CLIENT_ORIGIN_FLAG == 0,
            is_response: raw & RESPONSE_FLAG != 0,
        }
    }
}

/// One complete wire message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub sequence: u32,
    pub is_from_server: bool,
    pub is_response: bool,
    pub words: Vec<String>,
}

impl Frame {
    /// A client-originated request.
    pub fn request(sequence: u32, words: Vec<String>) -> Self {
        Self {
            sequence: sequence & SEQUENCE_MASK,
            is_from_server: false,
            is_response: false,
            words,
        }
    }

    /// A response to a server-originated request (event acknowledgement).
    pub fn server_ack(sequence: u32, words: Vec<String>) -> Self {
        Self {
            sequence: sequence & SEQUENCE_MASK,
            is_from_server: true,
            is_response: true,
            words,
        }
    }

    pub fn header(&self) -> Header {
        Header::new(self.sequence, self.is_from_server, self.is_response)
    }

    /// Total encoded length in bytes.
    pub fn packet_size(&self) -> usize {
        packet_size(&self.words)
    }

    /// Append the wire form of this frame to `dst`.
    pub fn encode_into(&self, dst: &mut BytesMut) {
        write_frame(dst, self.header(), &self.words);
    }

    /// Serialize into a standalone buffer.
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.packet_size());
        self.encode_into(&mut buf);
        buf.freeze()
    }

    /// Parse a frame from a buffer holding at least one complete frame.
    ///
    /// Never reads past the declared packet size; bytes after it are ignored.
    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        if buf.len() < PREAMBLE_LEN {
            return Err(ProtocolError::InvalidHeader);
        }

        let mut cursor = buf;
        let header = Header::from_u32(cursor.get_u32_le());
        let declared = cursor.get_u32_le() as usize;
        let num_words = cursor.get_u32_le() as usize;

        if declared < PREAMBLE_LEN {
            return Err(ProtocolError::InvalidHeader);
        }
        if declared > buf.len() {
            return Err(ProtocolError::MalformedFrame(
                constants::ERR_SIZE_OVERRUN.to_string(),
            ));
        }

        // Restrict reads to this frame.
        let mut body = &buf[PREAMBLE_LEN..declared];
        let mut words = Vec::with_capacity(num_words.min(body.len() / WORD_OVERHEAD));

        for _ in 0..num_words {
            if body.remaining() < 4 {
                return Err(ProtocolError::MalformedFrame(
                    constants::ERR_TRUNCATED_WORD_HEADER.to_string(),
                ));
            }
            let len = body.get_u32_le() as usize;
            // word bytes plus the terminator
            if len >= body.remaining() {
                return Err(ProtocolError::MalformedFrame(
                    constants::ERR_WORD_OVERRUN.to_string(),
                ));
            }
            words.push(String::from_utf8_lossy(&body[..len]).into_owned());
            body.advance(len + 1);
        }

        Ok(Self {
            sequence: header.sequence,
            is_from_server: header.is_from_server,
            is_response: header.is_response,
            words,
        })
    }

    /// Read the declared packet size without parsing the frame.
    #[inline]
    pub fn peek_packet_size(buf: &[u8]) -> Option<usize> {
        let field = buf.get(PACKET_SIZE_OFFSET..PACKET_SIZE_OFFSET + 4)?;
        Some(u32::from_le_bytes([field[0], field[1], field[2], field[3]]) as usize)
    }
}

/// Encode a word list into its wire form.
///
/// Deterministic; the output length always equals [`packet_size`] of `words`.
pub fn encode<S: AsRef<str>>(
    is_from_server: bool,
    is_response: bool,
    words: &[S],
    sequence: u32,
) -> Bytes {
    let mut buf = BytesMut::with_capacity(packet_size(words));
    write_frame(
        &mut buf,
        Header::new(sequence, is_from_server, is_response),
        words,
    );
    buf.freeze()
}

/// Encoded size of a frame carrying `words`.
pub fn packet_size<S: AsRef<str>>(words: &[S]) -> usize {
    PREAMBLE_LEN
        + words
            .iter()
            .map(|w| w.as_ref().len() + WORD_OVERHEAD)
            .sum::<usize>()
}

fn write_frame<S: AsRef<str>>(dst: &mut BytesMut, header: Header, words: &[S]) {
    let size = packet_size(words);
    dst.reserve(size);
    dst.put_u32_le(header.to_u32());
    dst.put_u32_le(size as u32);
    dst.put_u32_le(words.len() as u32);
    for word in words {
        let bytes = word.as_ref().as_bytes();
        dst.put_u32_le(bytes.len() as u32);
        dst.put_slice(bytes);
        dst.put_u8(0x00);
    }
}
