//! # Error Types
//!
//! Error handling for the remote administration protocol client.
//!
//! This module defines every error variant that can surface from the client,
//! from low-level I/O failures to a command rejected by the server.
//!
//! ## Error Categories
//! - **Transport Errors**: connect failures, socket errors, timeouts, remote close
//! - **Protocol Errors**: malformed or oversized frames (the stream cannot be resynchronized)
//! - **Command Errors**: a response whose status word is not `"OK"`
//! - **Session Errors**: submissions after the session was torn down
//! - **Configuration Errors**: invalid or unreadable configuration
//!
//! Transport and protocol errors are fatal to the connection; command errors are
//! local to the request that produced them. See [`ProtocolError::is_fatal`].
//!
//! ## Example Usage
//! ```rust
//! use rcon_protocol::error::{ProtocolError, Result};
//! use tracing::{error, info};
//!
//! fn check_status(status: &str) -> Result<()> {
//!     if status == "OK" {
//!         Ok(())
//!     } else {
//!         Err(ProtocolError::Command(status.to_string()))
//!     }
//! }
//!
//! fn main() {
//!     match check_status("InvalidPasswordHash") {
//!         Ok(()) => info!("Command accepted"),
//!         Err(e) => error!(error = %e, "Command rejected"),
//!     }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::io;
use thiserror::Error;

/// Error message constants to reduce allocations in error paths.
pub mod constants {
    /// Dispatcher-related error messages
    pub const ERR_DISPATCHER_WRITE_LOCK: &str = "Failed to acquire write lock on event dispatcher";
    pub const ERR_DISPATCHER_READ_LOCK: &str = "Failed to acquire read lock on event dispatcher";

    /// Frame validation errors
    pub const ERR_WORD_OVERRUN: &str = "Declared word length exceeds remaining frame bytes";
    pub const ERR_SIZE_OVERRUN: &str = "Declared packet size exceeds buffer length";
    pub const ERR_TRUNCATED_WORD_HEADER: &str = "Frame ends inside a word length prefix";

    /// Connection errors
    pub const ERR_WRITER_GONE: &str = "Outbound writer is no longer running";

    /// Session errors
    pub const ERR_LOCK_POISONED: &str = "Session lock poisoned";

    /// Handshake-specific errors
    pub const ERR_MISSING_SALT: &str = "Server did not return a salt word";
    pub const ERR_INVALID_SALT: &str = "Salt word is not valid hexadecimal";
}

// ProtocolError is the primary error type for all client operations
#[derive(Error, Debug, Serialize, Deserialize)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    #[serde(skip_serializing, skip_deserializing)]
    Io(#[from] io::Error),

    #[error("Invalid frame header")]
    InvalidHeader,

    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    #[error("Frame too large: {0} bytes")]
    OversizedPacket(usize),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Session closed")]
    SessionClosed,

    #[error("Command failed: {0}")]
    Command(String),

    #[error("Handshake failed: {0}")]
    HandshakeError(String),

    #[error("Timeout occurred")]
    Timeout,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Custom error: {0}")]
    Custom(String),
}

impl ProtocolError {
    /// Whether this error ends the connection it occurred on.
    ///
    /// Command errors (and handshake errors, which are command errors raised during
    /// login) leave the session usable; everything touching the byte stream does not.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            ProtocolError::Command(_)
                | ProtocolError::HandshakeError(_)
                | ProtocolError::ConfigError(_)
        )
    }

    /// The server's status word, when this is a command error.
    pub fn status(&self) -> Option<&str> {
        match self {
            ProtocolError::Command(status) => Some(status.as_str()),
            _ => None,
        }
    }
}

/// Type alias for Results using ProtocolError
pub type Result<T> = std::result::Result<T, ProtocolError>;
