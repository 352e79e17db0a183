//! Salted-digest login handshake.
//!
//! Two round trips over the ordinary request path:
//! 1. `login.hashed` with no argument; the server answers with one hex-encoded salt word.
//! 2. `login.hashed <digest>` where digest = uppercase hex of MD5(salt bytes ++ password).
//!
//! Both requests carry the `login.` prefix and bypass session gating. The session
//! transitions themselves are driven by the client; this module holds the pure parts.

use md5::{Digest, Md5};
use tracing::{debug, instrument};

use crate::error::{constants, ProtocolError, Result};
use crate::protocol::command::Command;
use crate::protocol::value::Value;

pub const LOGIN_HASHED: &str = "login.hashed";
pub const LOGIN_PLAIN_TEXT: &str = "login.plainText";
pub const LOGOUT: &str = "logout";

/// First round trip: ask for a salt.
pub fn salt_request() -> Command {
    Command::new(LOGIN_HASHED)
}

/// Second round trip: present the digest.
pub fn digest_login(digest: &str) -> Command {
    Command::new(LOGIN_HASHED).arg(digest)
}

/// Single round trip, password in clear text.
pub fn plain_text_login(password: &str) -> Command {
    Command::new(LOGIN_PLAIN_TEXT).arg(password)
}

/// Pull the salt word out of the first response and convert it to raw bytes.
pub fn salt_from_response(response: &Value) -> Result<Vec<u8>> {
    let word = response
        .as_list()
        .and_then(|words| words.first())
        .and_then(Value::as_str)
        .ok_or_else(|| ProtocolError::HandshakeError(constants::ERR_MISSING_SALT.to_string()))?;
    decode_salt(word)
}

pub fn decode_salt(hex_salt: &str) -> Result<Vec<u8>> {
    hex::decode(hex_salt.trim())
        .map_err(|_| ProtocolError::HandshakeError(constants::ERR_INVALID_SALT.to_string()))
}

/// Uppercase hex MD5 over salt followed by the UTF-8 password.
#[instrument(skip_all, fields(salt_len = salt.len()))]
pub fn hash_password(salt: &[u8], password: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    let digest = hex::encode_upper(hasher.finalize());
    debug!("Computed login digest");
    digest
}
