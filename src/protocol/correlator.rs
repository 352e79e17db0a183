//! Sequence numbering and response correlation.
//!
//! Every serialized request takes the next value of a per-connection counter (masked
//! to 30 bits) at serialize time, whether it is sent at once or queued. Requests that
//! expect an answer are tracked by sequence; a response resolves and removes its
//! entry exactly once. Responses arrive in any order and are matched by sequence only.

use std::collections::HashMap;

use bytes::Bytes;
use tokio::sync::oneshot;
use tracing::{debug, trace};

use crate::core::frame::{encode, Frame, SEQUENCE_MASK};
use crate::error::{ProtocolError, Result};
use crate::protocol::cast::CastSpec;
use crate::protocol::command::Command;
use crate::protocol::events::ServerEvent;
use crate::protocol::value::Value;

/// Status word of a successful response.
pub const STATUS_OK: &str = "OK";

pub type Reply = oneshot::Sender<Result<Value>>;

/// An outstanding request awaiting its response.
#[derive(Debug)]
pub struct PendingRequest {
    pub sequence: u32,
    pub words: Vec<String>,
    cast: Option<CastSpec>,
    reply: Reply,
}

impl PendingRequest {
    /// Resolve with the response status and remaining words.
    fn resolve(self, status: &str, words: &[String]) -> bool {
        let result = if status == STATUS_OK {
            Ok(match &self.cast {
                Some(cast) => cast.apply(words),
                None => Value::from_words(words),
            })
        } else {
            Err(ProtocolError::Command(status.to_string()))
        };
        // The caller may have stopped waiting.
        self.reply.send(result).is_ok()
    }
}

/// What an inbound frame turned out to be.
#[derive(Debug)]
pub enum Inbound {
    /// A tracked request was resolved.
    Resolved { sequence: u32, status: String },
    /// A response nobody is waiting for (untracked, late or duplicate).
    Unmatched { sequence: u32 },
    /// A server-originated message.
    Event { sequence: u32, event: ServerEvent },
}

#[derive(Debug)]
pub struct Correlator {
    next_sequence: u32,
    pending: HashMap<u32, PendingRequest>,
}

impl Default for Correlator {
    fn default() -> Self {
        Self::new()
    }
}

impl Correlator {
    pub fn new() -> Self {
        Self {
            next_sequence: 1,
            pending: HashMap::new(),
        }
    }

    /// Take the next sequence number.
    pub fn next_sequence(&mut self) -> u32 {
        let sequence = self.next_sequence & SEQUENCE_MASK;
        self.next_sequence = self.next_sequence.wrapping_add(1) & SEQUENCE_MASK;
        sequence
    }

    /// Serialize a client request under a fresh sequence number.
    pub fn serialize(&mut self, command: &Command) -> (u32, Bytes) {
        let sequence = self.next_sequence();
        let bytes = encode(false, false, command.words(), sequence);
        trace!(sequence, command = %command, bytes = bytes.len(), "Serialized request");
        (sequence, bytes)
    }

    /// Start waiting for the response to `sequence`.
    pub fn track(
        &mut self,
        sequence: u32,
        words: Vec<String>,
        cast: Option<CastSpec>,
    ) -> oneshot::Receiver<Result<Value>> {
        let (reply, receiver) = oneshot::channel();
        let previous = self.pending.insert(
            sequence,
            PendingRequest {
                sequence,
                words,
                cast,
                reply,
            },
        );
        if previous.is_some() {
            // Only possible after the 30-bit counter wrapped onto a request that never completed.
            debug!(sequence, "Replaced stale pending request");
        }
        receiver
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, sequence: u32) -> bool {
        self.pending.contains_key(&sequence)
    }

    /// Route one complete inbound frame.
    pub fn dispatch(&mut self, frame: Frame) -> Inbound {
        let Frame {
            sequence,
            is_response,
            mut words,
            ..
        } = frame;

        if !is_response {
            let name = if words.is_empty() {
                String::new()
            } else {
                words.remove(0)
            };
            return Inbound::Event {
                sequence,
                event: ServerEvent::new(name, words),
            };
        }

        let status = if words.is_empty() {
            String::new()
        } else {
            words.remove(0)
        };

        let Some(pending) = self.pending.remove(&sequence) else {
            debug!(sequence, status = %status, "Discarding unmatched response");
            return Inbound::Unmatched { sequence };
        };

        if !pending.resolve(&status, &words) {
            trace!(sequence, "Response arrived after the caller stopped waiting");
        }
        Inbound::Resolved { sequence, status }
    }

    /// Drop every pending request without resolving it.
    pub fn abandon_all(&mut self) -> usize {
        let abandoned = self.pending.len();
        self.pending.clear();
        abandoned
    }
}
