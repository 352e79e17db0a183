//! # Transport Layer
//!
//! Byte-stream transports the client can run over.
//!
//! ## Supported Transports
//! - **TCP** (`tcp`): the game server's admin port
//!
//! Any `AsyncRead + AsyncWrite` stream can also be handed to
//! [`Client::with_stream`](crate::service::client::Client::with_stream), which is how the
//! tests drive the client over an in-memory duplex pipe.

pub mod tcp;
