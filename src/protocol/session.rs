//! Connection/authentication lifecycle and the outgoing queue.
//!
//! [`Session::apply`] is the single transition function: transport adapters and the
//! login flow feed it [`SessionEvent`]s, and it reports what changed through a
//! [`Transition`]. Gating decisions come from [`Session::gate`].
//!
//! ```text
//! Disconnected --ConnectStarted--> Connecting --Connected--> Connected | Authenticated
//! Connected/Authenticated --LoginStarted--> Authenticating
//! Authenticating --LoginSucceeded--> Authenticated    (queue drained)
//! Authenticating --LoginFailed--> Connected           (queue drained)
//! any --TransportFailed--> Disconnected               (queue discarded)
//! any --Quit--> Dead                                  (terminal)
//! ```

use std::collections::VecDeque;
use std::fmt;

use bytes::Bytes;
use tracing::debug;

use crate::protocol::command::Command;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
    Authenticating,
    Authenticated,
    Dead,
}

impl SessionState {
    /// Non-login traffic may be written immediately.
    pub fn permits_send(self) -> bool {
        matches!(self, SessionState::Connected | SessionState::Authenticated)
    }

    /// The transport is gone for good.
    pub fn is_closed(self) -> bool {
        matches!(self, SessionState::Disconnected | SessionState::Dead)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Disconnected => "disconnected",
            SessionState::Connecting => "connecting",
            SessionState::Connected => "connected",
            SessionState::Authenticating => "authenticating",
            SessionState::Authenticated => "authenticated",
            SessionState::Dead => "dead",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    ConnectStarted,
    /// Transport is up. `login_pending` moves straight on to `Authenticating`.
    Connected { login_pending: bool },
    LoginStarted,
    LoginSucceeded,
    LoginFailed,
    LoggedOut,
    TransportFailed,
    Quit,
}

/// What to do with one serialized command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Send,
    Queue,
    Reject(SessionState),
}

/// Outcome of one transition.
#[derive(Debug, Default)]
pub struct Transition {
    pub from: Option<SessionState>,
    pub to: Option<SessionState>,
    /// Queued frames released for sending, in enqueue order.
    pub drained: Vec<Bytes>,
    /// Queued frames thrown away by a teardown.
    pub discarded: usize,
}

impl Transition {
    pub fn changed(&self) -> bool {
        self.from != self.to
    }

    /// Pending requests must be abandoned.
    pub fn is_teardown(&self) -> bool {
        self.changed() && self.to.is_some_and(SessionState::is_closed)
    }
}

#[derive(Debug)]
pub struct Session {
    state: SessionState,
    login_requested: bool,
    queue: VecDeque<Bytes>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            state: SessionState::Disconnected,
            login_requested: false,
            queue: VecDeque::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Send, queue, or refuse a command in the current state.
    pub fn gate(&self, command: &Command) -> Gate {
        match self.state {
            SessionState::Dead | SessionState::Disconnected => Gate::Reject(self.state),
            _ if command.is_login() => Gate::Send,
            state if state.permits_send() => Gate::Send,
            _ => Gate::Queue,
        }
    }

    pub fn enqueue(&mut self, frame: Bytes) {
        self.queue.push_back(frame);
    }

    pub fn apply(&mut self, event: SessionEvent) -> Transition {
        use SessionEvent as E;
        use SessionState as S;

        let from = self.state;
        let next = match (from, event) {
            (S::Dead, _) => S::Dead,
            (_, E::Quit) => S::Dead,
            (_, E::TransportFailed) => S::Disconnected,
            (S::Disconnected, E::ConnectStarted) => S::Connecting,
            (S::Connecting, E::Connected { login_pending }) => {
                if login_pending || self.login_requested {
                    S::Authenticating
                } else {
                    S::Authenticated
                }
            }
            // Remembered until the transport comes up.
            (S::Connecting, E::LoginStarted) => {
                self.login_requested = true;
                S::Connecting
            }
            (S::Connected | S::Authenticated, E::LoginStarted) => S::Authenticating,
            (S::Authenticating | S::Connecting, E::LoginSucceeded) => S::Authenticated,
            (S::Authenticating, E::LoginFailed) => S::Connected,
            (S::Authenticated, E::LoggedOut) => S::Connected,
            (state, _) => state,
        };

        if matches!(event, E::LoginSucceeded | E::LoginFailed) {
            self.login_requested = false;
        }

        self.state = next;
        let mut transition = Transition {
            from: Some(from),
            to: Some(next),
            ..Transition::default()
        };

        if next.is_closed() {
            transition.discarded = self.queue.len();
            self.queue.clear();
            self.login_requested = false;
        } else if next.permits_send() && !self.queue.is_empty() {
            transition.drained = self.queue.drain(..).collect();
        }

        if transition.changed() {
            debug!(
                from = %from,
                to = %next,
                ?event,
                drained = transition.drained.len(),
                discarded = transition.discarded,
                "Session transition"
            );
        }

        transition
    }
}
