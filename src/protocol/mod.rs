//! # Protocol Layer
//!
//! Everything between a decoded [`Frame`](crate::core::frame::Frame) and a caller's
//! typed result.
//!
//! ## Components
//! - **Command**: outgoing word lists and login-prefix detection
//! - **Correlator**: sequence numbering and response matching
//! - **Session**: connect/authenticate state machine and the outgoing queue
//! - **Handshake**: salted-digest login helpers
//! - **Cast / Multivalue**: response decoding, including self-describing tables
//! - **Events / Dispatcher**: server-originated messages and their subscribers
//! - **Catalog**: presets for decoder-backed replies
//!
//! None of these modules perform I/O. The service layer owns the socket and feeds them.

pub mod cast;
pub mod catalog;
pub mod command;
pub mod correlator;
pub mod dispatcher;
pub mod events;
pub mod handshake;
pub mod multivalue;
pub mod session;
pub mod value;
