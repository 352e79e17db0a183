//! # rcon-protocol
//!
//! Async client core for the length-prefixed, word-oriented remote administration
//! protocol spoken by game server admin ports.
//!
//! ## Layers
//! - [`core`]: frame codec and stream reassembly
//! - [`protocol`]: sequence correlation, session state, login handshake, response decoding, events
//! - [`service`]: the public [`Client`] and its connection tasks
//! - [`transport`]: TCP connect
//! - [`config`], [`error`], [`utils`]: configuration, errors, logging, metrics
//!
//! ## Quick Start
//! ```no_run
//! use rcon_protocol::{Client, ClientConfig, Command};
//!
//! # async fn demo() -> rcon_protocol::Result<()> {
//! let client = Client::connect(ClientConfig {
//!     address: "10.0.0.5:47200".into(),
//!     password: Some("secret".into()),
//!     ..ClientConfig::default()
//! })?;
//! let version = client.version().await?;
//! println!("{:?}", version.get("game"));
//! client.submit(Command::new("admin.say").arg("hi").arg("all"), None).await?;
//! client.close()?;
//! # Ok(())
//! # }
//! ```

#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

pub mod config;
pub mod core;
pub mod error;
pub mod protocol;
pub mod service;
pub mod transport;
pub mod utils;

pub use config::{ClientConfig, LoggingConfig, RconConfig};
pub use error::{ProtocolError, Result};
pub use protocol::cast::{CastSpec, Caster, Field};
pub use protocol::command::Command;
pub use protocol::events::ServerEvent;
pub use protocol::session::SessionState;
pub use protocol::value::{Record, Value};
pub use service::client::{Client, SessionNotice};
