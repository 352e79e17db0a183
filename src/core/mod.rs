//! # Core Protocol Components
//!
//! Low-level frame handling: the word-list codec and stream reassembly.
//!
//! ## Components
//! - **Frame**: binary frame format, header bit fields, encode/decode
//! - **Codec**: Tokio codec reassembling frames from an unaligned byte stream
//!
//! ## Wire Format
//! ```text
//! [Header(4)] [PacketSize(4)] [NumWords(4)] { [WordLen(4)] [Word(N)] [0x00] }*
//! ```
//! All integers are little-endian.
//!
//! ## Safety
//! - Declared packet size is validated before any buffer is grown
//! - Word lengths are checked against the declared frame size before reading

pub mod codec;
pub mod frame;
