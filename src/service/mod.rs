//! # Service Layer
//!
//! The public asynchronous client and the tasks that own its connection.
//!
//! ## Components
//! - **Client**: command submission, login, event subscription, lifecycle notices
//! - **Connection**: reader and writer tasks bridging the byte stream and the protocol layer
//!
//! ## Concurrency
//! All protocol state of one connection (sequence counter, pending requests, session
//! state, outgoing queue) sits behind a single mutex. Every frame reaches the writer
//! task through one channel, and frames are pushed into it while that mutex is held,
//! so wire order always matches the order in which sends were decided.

pub mod client;
pub(crate) mod connection;
