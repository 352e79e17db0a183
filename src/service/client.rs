//! Asynchronous client for the remote administration port.
//!
//! ```no_run
//! use rcon_protocol::config::ClientConfig;
//! use rcon_protocol::protocol::command::Command;
//! use rcon_protocol::service::client::Client;
//!
//! # async fn demo() -> rcon_protocol::error::Result<()> {
//! let client = Client::connect(ClientConfig {
//!     address: "127.0.0.1:47200".into(),
//!     password: Some("secret".into()),
//!     ..ClientConfig::default()
//! })?;
//!
//! client.subscribe("player.onJoin", |event| {
//!     println!("joined: {:?}", event.field("name"));
//! })?;
//!
//! // Queued until the login completes, then sent in order.
//! let info = client.server_info().await?;
//! client.send(Command::new("admin.say").arg("hello").arg("all"))?;
//! # let _ = info;
//! client.close()?;
//! # Ok(())
//! # }
//! ```

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::runtime::Handle;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, trace, warn};

use crate::config::ClientConfig;
use crate::core::frame::Frame;
use crate::error::{constants, ProtocolError, Result};
use crate::protocol::cast::CastSpec;
use crate::protocol::catalog::{self, PlayerSubset, Request};
use crate::protocol::command::Command;
use crate::protocol::correlator::{Correlator, Inbound, STATUS_OK};
use crate::protocol::dispatcher::EventDispatcher;
use crate::protocol::events::ServerEvent;
use crate::protocol::handshake;
use crate::protocol::session::{Gate, Session, SessionEvent, SessionState};
use crate::protocol::value::Value;
use crate::service::connection::{self, Outbound};
use crate::transport::tcp;
use crate::utils::metrics::{Metrics, MetricsSnapshot, Timer};

const NOTICE_CAPACITY: usize = 64;
const QUIT: &str = "quit";

/// Session lifecycle notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionNotice {
    Connected,
    Authenticated,
    Disconnected,
    /// A transport failure, or a login error nobody was waiting for.
    Error(String),
}

struct Shared {
    session: Session,
    correlator: Correlator,
}

pub(crate) struct Inner {
    pub(crate) config: ClientConfig,
    shared: Mutex<Shared>,
    outbound: mpsc::UnboundedSender<Outbound>,
    events: EventDispatcher,
    notices: broadcast::Sender<SessionNotice>,
    pub(crate) metrics: Metrics,
    pub(crate) shutdown: CancellationToken,
}

/// Handle to one connection. Cheap to clone; all clones share the connection.
///
/// The connection tasks keep running until [`Client::close`] is called or the server
/// goes away; dropping the handles alone does not close the socket.
#[derive(Clone)]
pub struct Client {
    inner: Arc<Inner>,
}

impl Client {
    /// Start connecting to `config.address` and return at once.
    ///
    /// Commands submitted before the transport is up are queued. When a password is
    /// configured the hashed login starts as soon as the connection is established.
    /// Must be called from within a Tokio runtime.
    #[instrument(skip(config), fields(address = %config.address))]
    pub fn connect(config: ClientConfig) -> Result<Self> {
        config.validate_strict()?;
        let handle = runtime()?;
        let (inner, outbound_rx) = Inner::new(config);

        {
            let mut shared = inner.lock()?;
            inner.transition(&mut shared, SessionEvent::ConnectStarted)?;
        }

        let task = Arc::clone(&inner);
        handle.spawn(async move {
            let attempt = tcp::connect(&task.config.address, task.config.connection_timeout);
            let result = tokio::select! {
                _ = task.shutdown.cancelled() => return,
                result = attempt => result,
            };
            match result {
                Ok(stream) => {
                    task.on_connected();
                    connection::run(stream, task, outbound_rx).await;
                }
                Err(e) => {
                    warn!(error = %e, "Connect failed");
                    task.on_transport_closed(Some(e));
                }
            }
        });

        Ok(Self { inner })
    }

    /// Run the client over an already connected stream.
    ///
    /// The session is connected on return (and authenticating, if a password is set).
    pub fn with_stream<S>(stream: S, config: ClientConfig) -> Result<Self>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let handle = runtime()?;
        let (inner, outbound_rx) = Inner::new(config);

        {
            let mut shared = inner.lock()?;
            inner.transition(&mut shared, SessionEvent::ConnectStarted)?;
        }
        inner.on_connected();
        handle.spawn(connection::run(stream, Arc::clone(&inner), outbound_rx));

        Ok(Self { inner })
    }

    /// Submit a command and wait for its response.
    ///
    /// A non-`"OK"` status resolves to [`ProtocolError::Command`]. If the session is torn
    /// down first, the future resolves to [`ProtocolError::ConnectionClosed`].
    #[instrument(skip(self, command, cast), fields(command = %command))]
    pub async fn submit(&self, command: Command, cast: Option<CastSpec>) -> Result<Value> {
        self.inner.request(command, cast).await
    }

    /// Send a command without waiting for, or tracking, its response.
    ///
    /// After teardown this is an error rather than a silent no-op:
    /// [`ProtocolError::SessionClosed`] once closed, [`ProtocolError::ConnectionClosed`]
    /// after the transport dropped.
    pub fn send(&self, command: Command) -> Result<()> {
        self.inner.submit(command, None, false).map(|_| ())
    }

    /// Submit a catalog preset.
    pub async fn request(&self, request: Request) -> Result<Value> {
        let (command, cast) = request.into_parts();
        self.submit(command, cast).await
    }

    /// Run the salted-digest login.
    #[instrument(skip_all)]
    pub async fn login(&self, password: &str) -> Result<()> {
        self.inner.begin_login()?;
        let outcome = self.inner.hashed_login(password).await;
        self.inner.finish_login(&outcome)?;
        outcome
    }

    /// Log in with the password in clear text.
    #[instrument(skip_all)]
    pub async fn login_plain_text(&self, password: &str) -> Result<()> {
        self.inner.begin_login()?;
        let outcome = self
            .inner
            .request(handshake::plain_text_login(password), None)
            .await
            .map(|_| ());
        self.inner.finish_login(&outcome)?;
        outcome
    }

    /// Drop admin rights while keeping the connection open.
    pub async fn logout(&self) -> Result<()> {
        self.inner
            .request(Command::new(handshake::LOGOUT), None)
            .await?;
        let mut shared = self.inner.lock()?;
        self.inner.transition(&mut shared, SessionEvent::LoggedOut)
    }

    /// Force the session to `Dead`, abandon every pending request and close the transport.
    #[instrument(skip(self))]
    pub fn close(&self) -> Result<()> {
        let inner = &self.inner;
        {
            let mut shared = inner.lock()?;
            let state = shared.session.state();
            if state == SessionState::Dead {
                return Ok(());
            }
            if !state.is_closed() && state != SessionState::Connecting {
                // Nobody is left to read a reply.
                let (_, bytes) = shared.correlator.serialize(&Command::new(QUIT));
                let _ = inner.outbound.send(Outbound::Frame(bytes));
            }
            inner.transition(&mut shared, SessionEvent::Quit)?;
            let _ = inner.outbound.send(Outbound::Close);
        }
        inner.shutdown.cancel();
        inner.notify(SessionNotice::Disconnected);
        info!("Client closed");
        inner.metrics.log_metrics();
        Ok(())
    }

    /// Register a handler for an event name, a namespace (`"player.*"`) or `"*"`.
    pub fn subscribe<F>(&self, key: &str, handler: F) -> Result<()>
    where
        F: Fn(&ServerEvent) + Send + Sync + 'static,
    {
        self.inner.events.register(key, handler)
    }

    pub fn subscribe_all<F>(&self, handler: F) -> Result<()>
    where
        F: Fn(&ServerEvent) + Send + Sync + 'static,
    {
        self.inner.events.register_any(handler)
    }

    /// Lifecycle notifications sent after this call.
    pub fn notices(&self) -> broadcast::Receiver<SessionNotice> {
        self.inner.notices.subscribe()
    }

    pub fn state(&self) -> SessionState {
        self.inner
            .lock()
            .map(|s| s.session.state())
            .unwrap_or(SessionState::Dead)
    }

    pub fn pending_requests(&self) -> usize {
        self.inner.lock().map(|s| s.correlator.pending_len()).unwrap_or(0)
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.inner.metrics.snapshot()
    }

    pub async fn version(&self) -> Result<Value> {
        self.request(catalog::version()).await
    }

    pub async fn server_info(&self) -> Result<Value> {
        self.request(catalog::server_info()).await
    }

    pub async fn list_players(&self, subset: PlayerSubset) -> Result<Value> {
        self.request(catalog::list_players(subset)).await
    }

    pub async fn ban_list(&self, offset: Option<u32>) -> Result<Value> {
        self.request(catalog::ban_list_entries(offset)).await
    }

    pub async fn map_list(&self) -> Result<Value> {
        self.request(catalog::map_list_entries()).await
    }

    pub async fn map_indices(&self) -> Result<Value> {
        self.request(catalog::map_list_indices()).await
    }

    pub async fn map_rounds(&self) -> Result<Value> {
        self.request(catalog::map_list_rounds()).await
    }

    pub async fn game_admins(&self) -> Result<Value> {
        self.request(catalog::game_admins()).await
    }

    pub async fn events_enabled(&self, enabled: Option<bool>) -> Result<Value> {
        self.request(catalog::events_enabled(enabled)).await
    }
}

fn runtime() -> Result<Handle> {
    Handle::try_current().map_err(|e| ProtocolError::Custom(format!("No Tokio runtime: {e}")))
}

/// Error for a submission refused in `state`.
fn rejection(state: SessionState) -> ProtocolError {
    match state {
        SessionState::Dead => ProtocolError::SessionClosed,
        _ => ProtocolError::ConnectionClosed,
    }
}

impl Inner {
    fn new(config: ClientConfig) -> (Arc<Self>, mpsc::UnboundedReceiver<Outbound>) {
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);
        let inner = Arc::new(Self {
            config,
            shared: Mutex::new(Shared {
                session: Session::new(),
                correlator: Correlator::new(),
            }),
            outbound,
            events: EventDispatcher::new(),
            notices,
            metrics: Metrics::new(),
            shutdown: CancellationToken::new(),
        });
        (inner, outbound_rx)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Shared>> {
        self.shared
            .lock()
            .map_err(|_| ProtocolError::Custom(constants::ERR_LOCK_POISONED.to_string()))
    }

    fn write(&self, bytes: bytes::Bytes) -> Result<()> {
        self.outbound
            .send(Outbound::Frame(bytes))
            .map_err(|_| ProtocolError::Custom(constants::ERR_WRITER_GONE.to_string()))
    }

    fn notify(&self, notice: SessionNotice) {
        // No receivers is fine.
        let _ = self.notices.send(notice);
    }

    /// Apply one session event, flushing drained frames and abandoning pending
    /// requests on teardown. Caller holds the lock.
    fn transition(&self, shared: &mut Shared, event: SessionEvent) -> Result<()> {
        let transition = shared.session.apply(event);
        if transition.is_teardown() {
            let abandoned = shared.correlator.abandon_all();
            debug!(abandoned, discarded = transition.discarded, "Session torn down");
        }
        for frame in transition.drained {
            self.write(frame)?;
        }
        Ok(())
    }

    /// Serialize, optionally track, then send or queue. Caller does not hold the lock.
    fn submit(
        &self,
        command: Command,
        cast: Option<CastSpec>,
        track: bool,
    ) -> Result<Option<oneshot::Receiver<Result<Value>>>> {
        let mut shared = self.lock()?;
        let gate = shared.session.gate(&command);
        if let Gate::Reject(state) = gate {
            return Err(rejection(state));
        }

        let (sequence, bytes) = shared.correlator.serialize(&command);
        let reply = if track {
            self.metrics.request_tracked();
            Some(
                shared
                    .correlator
                    .track(sequence, command.into_words(), cast),
            )
        } else {
            None
        };

        if gate == Gate::Send {
            self.write(bytes)?;
        } else {
            trace!(sequence, state = %shared.session.state(), "Queued request");
            self.metrics.frame_queued();
            shared.session.enqueue(bytes);
        }
        Ok(reply)
    }

    async fn request(&self, command: Command, cast: Option<CastSpec>) -> Result<Value> {
        let Some(reply) = self.submit(command, cast, true)? else {
            return Err(ProtocolError::ConnectionClosed);
        };
        reply.await.unwrap_or(Err(ProtocolError::ConnectionClosed))
    }

    fn begin_login(&self) -> Result<()> {
        let mut shared = self.lock()?;
        let state = shared.session.state();
        if state.is_closed() {
            return Err(rejection(state));
        }
        self.metrics.handshake_attempt();
        self.transition(&mut shared, SessionEvent::LoginStarted)
    }

    /// Both round trips of the hashed login.
    async fn hashed_login(&self, password: &str) -> Result<()> {
        let _timer = Timer::start("hashed_login");
        let response = self.request(handshake::salt_request(), None).await?;
        let salt = handshake::salt_from_response(&response)?;
        let digest = handshake::hash_password(&salt, password);
        self.request(handshake::digest_login(&digest), None).await?;
        Ok(())
    }

    fn finish_login(&self, outcome: &Result<()>) -> Result<()> {
        match outcome {
            Ok(()) => {
                self.metrics.handshake_success();
                {
                    let mut shared = self.lock()?;
                    self.transition(&mut shared, SessionEvent::LoginSucceeded)?;
                }
                info!("Logged in");
                self.notify(SessionNotice::Authenticated);
            }
            // Teardown already dealt with the session.
            Err(e) if e.is_fatal() => self.metrics.handshake_failed(),
            Err(e) => {
                self.metrics.handshake_failed();
                warn!(error = %e, "Login rejected");
                let mut shared = self.lock()?;
                self.transition(&mut shared, SessionEvent::LoginFailed)?;
            }
        }
        Ok(())
    }

    /// Transport is up. With a password configured the session moves straight on to
    /// `Authenticating` under the same lock, and the login runs in the background.
    pub(crate) fn on_connected(self: &Arc<Self>) {
        let password = self.config.password.clone();
        let state = {
            let Ok(mut shared) = self.lock() else {
                return;
            };
            let event = SessionEvent::Connected {
                login_pending: password.is_some(),
            };
            if let Err(e) = self.transition(&mut shared, event) {
                warn!(error = %e, "Failed to flush queue on connect");
            }
            shared.session.state()
        };

        info!(state = %state, "Connected");
        self.notify(SessionNotice::Connected);
        if state == SessionState::Authenticated {
            self.notify(SessionNotice::Authenticated);
        }

        if let (Some(password), SessionState::Authenticating) = (password, state) {
            self.metrics.handshake_attempt();
            let inner = Arc::clone(self);
            tokio::spawn(async move {
                let outcome = inner.hashed_login(&password).await;
                if let Err(e) = inner.finish_login(&outcome) {
                    warn!(error = %e, "Failed to record login outcome");
                }
                // No caller to hand a rejection to.
                if let Err(e) = outcome {
                    if !e.is_fatal() {
                        let code = e.status().map_or_else(|| e.to_string(), str::to_string);
                        inner.notify(SessionNotice::Error(code));
                    }
                }
            });
        }
    }

    /// The read or write side failed (`Some`) or the server closed the stream (`None`).
    pub(crate) fn on_transport_closed(&self, error: Option<ProtocolError>) {
        let torn_down = match self.lock() {
            Ok(mut shared) if !shared.session.state().is_closed() => {
                let _ = self.transition(&mut shared, SessionEvent::TransportFailed);
                true
            }
            _ => false,
        };
        let _ = self.outbound.send(Outbound::Close);
        self.shutdown.cancel();

        if !torn_down {
            return;
        }
        match error {
            Some(e) => {
                self.metrics.connection_error();
                self.notify(SessionNotice::Error(e.to_string()));
            }
            None => self.notify(SessionNotice::Disconnected),
        }
        self.metrics.log_metrics();
    }

    /// Route one inbound frame. Handlers run outside the lock.
    pub(crate) fn handle_frame(&self, frame: Frame) {
        self.metrics.frame_received(frame.packet_size() as u64);

        let inbound = match self.lock() {
            Ok(mut shared) => shared.correlator.dispatch(frame),
            Err(e) => {
                warn!(error = %e, "Dropping frame");
                return;
            }
        };

        match inbound {
            Inbound::Resolved { sequence, status } => {
                if status != STATUS_OK {
                    self.metrics.command_error();
                    debug!(sequence, status = %status, "Command error");
                }
            }
            Inbound::Unmatched { .. } => self.metrics.unmatched_response(),
            Inbound::Event { sequence, event } => {
                self.metrics.event_received();
                if self.config.acknowledge_events {
                    let ack = Frame::server_ack(sequence, vec![STATUS_OK.to_string()]);
                    if let Err(e) = self.write(ack.to_bytes()) {
                        debug!(error = %e, "Event acknowledgement not sent");
                    }
                }
                match self.events.dispatch(&event) {
                    Ok(0) => trace!(event = %event.name, "No subscribers"),
                    Ok(_) => {}
                    Err(e) => warn!(error = %e, event = %event.name, "Event dispatch failed"),
                }
            }
        }
    }
}
