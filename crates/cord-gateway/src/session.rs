//! Gateway session state machine
//!
//! One `Session` lives for one socket connection. The connection's reader
//! task feeds it every text frame through [`Session::handle_text`], one at a
//! time; each frame's cache mutations and bus publications finish before the
//! next frame is looked at. The heartbeat task runs beside it and only reads
//! the sequence counter and queues frames.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde_json::Value;
use tokio::sync::{mpsc, watch};
use uuid::Uuid;

use cord_cache::EntityCache;
use cord_common::ClientConfig;
use cord_core::{DispatchEvent, EventKind, User};

use crate::bus::{EventBus, GatewayEvent, DEBUG_EVENT};
use crate::error::GatewayError;
use crate::heartbeat::HeartbeatController;
use crate::protocol::{GatewayMessage, IdentifyPayload, OpCode};

/// Lifecycle of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Created, no socket yet
    Disconnected,
    /// URL resolved, socket opening
    Connecting,
    /// Socket open, waiting for Hello
    AwaitingHello,
    /// Hello received, Identify being sent
    Identifying,
    /// Identified; dispatches are processed
    Ready,
    /// Terminal
    Closed,
}

impl SessionState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "Disconnected",
            Self::Connecting => "Connecting",
            Self::AwaitingHello => "AwaitingHello",
            Self::Identifying => "Identifying",
            Self::Ready => "Ready",
            Self::Closed => "Closed",
        }
    }

    /// True while a socket is (or is about to be) open
    pub const fn is_active(self) -> bool {
        !matches!(self, Self::Disconnected | Self::Closed)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the session needs to identify itself
#[derive(Clone)]
pub struct SessionConfig {
    pub token: String,
    pub client_name: String,
    pub large_threshold: u32,
    /// Publish `DEBUG` events on the bus
    pub debug: bool,
}

impl SessionConfig {
    /// Take everything but the token from client configuration
    pub fn new(token: impl Into<String>, config: &ClientConfig) -> Self {
        Self {
            token: token.into(),
            client_name: config.client_name.clone(),
            large_threshold: config.large_threshold,
            debug: config.debug,
        }
    }
}

impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("token", &"***")
            .field("client_name", &self.client_name)
            .field("large_threshold", &self.large_threshold)
            .field("debug", &self.debug)
            .finish()
    }
}

/// A single gateway session
#[derive(Debug)]
pub struct Session {
    /// Local id for log correlation
    id: Uuid,
    config: SessionConfig,
    state: watch::Sender<SessionState>,
    /// Highest `s` seen; shared with the heartbeat beat closure
    sequence: Arc<AtomicU64>,
    heartbeat: HeartbeatController,
    outbound: mpsc::Sender<GatewayMessage>,
    cache: Arc<EntityCache>,
    bus: Arc<EventBus<GatewayEvent>>,
    /// Current user, set by READY
    user: RwLock<Option<User>>,
    /// Server-side session id from READY
    remote_session_id: RwLock<Option<String>>,
}

impl Session {
    /// Create a session in `Disconnected`
    ///
    /// Frames the session sends go to `outbound`; the connection's writer
    /// task drains the other end.
    pub fn new(
        config: SessionConfig,
        outbound: mpsc::Sender<GatewayMessage>,
        cache: Arc<EntityCache>,
        bus: Arc<EventBus<GatewayEvent>>,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::Disconnected);

        Self {
            id: Uuid::new_v4(),
            config,
            state,
            sequence: Arc::new(AtomicU64::new(0)),
            heartbeat: HeartbeatController::new(),
            outbound,
            cache,
            bus,
            user: RwLock::new(None),
            remote_session_id: RwLock::new(None),
        }
    }

    // === Accessors ===

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Watch state transitions
    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Highest sequence number seen
    pub fn last_sequence(&self) -> u64 {
        self.sequence.load(Ordering::Acquire)
    }

    /// Interval announced in Hello, while the heartbeat runs
    pub fn heartbeat_interval(&self) -> Option<Duration> {
        self.heartbeat.interval()
    }

    /// Round trip of the last acknowledged heartbeat
    pub fn latency(&self) -> Option<Duration> {
        self.heartbeat.latency()
    }

    /// The authenticated user, once READY arrived
    pub fn user(&self) -> Option<User> {
        self.user.read().clone()
    }

    /// Server-side session id from READY (informational only)
    pub fn remote_session_id(&self) -> Option<String> {
        self.remote_session_id.read().clone()
    }

    pub fn cache(&self) -> &Arc<EntityCache> {
        &self.cache
    }

    pub fn bus(&self) -> &Arc<EventBus<GatewayEvent>> {
        &self.bus
    }

    // === Lifecycle (driven by the connection) ===

    /// The socket URL is known and the socket is being opened
    pub fn mark_connecting(&self) {
        self.transition(SessionState::Connecting);
    }

    /// The socket is open; wait for Hello
    pub fn mark_open(&self) {
        self.transition(SessionState::AwaitingHello);
    }

    /// Close the session: stop the heartbeat and enter `Closed`
    ///
    /// Idempotent; only the first call logs.
    pub fn close(&self, reason: &str) {
        self.heartbeat.stop();
        if self.transition(SessionState::Closed) {
            tracing::info!(
                session_id = %self.id,
                reason = %reason,
                last_sequence = self.last_sequence(),
                "Session closed"
            );
        }
    }

    /// Queue an outbound frame
    pub fn send(&self, message: GatewayMessage) -> Result<(), GatewayError> {
        if !self.state().is_active() {
            return Err(GatewayError::NotConnected);
        }
        self.outbound.try_send(message).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => GatewayError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => GatewayError::NotConnected,
        })
    }

    // === Frame processing ===

    /// Process one inbound text frame
    ///
    /// Never fails: frames that cannot be decoded or are not valid in the
    /// current state are logged and dropped.
    pub fn handle_text(&self, text: &str) {
        if let Err(err) = self.process(text) {
            tracing::warn!(
                session_id = %self.id,
                state = %self.state(),
                error = %err,
                "Dropped gateway frame"
            );
            self.debug(|| format!("dropped frame: {err}"));
        }
    }

    fn process(&self, text: &str) -> Result<(), GatewayError> {
        let state = self.state();
        if state == SessionState::Closed {
            tracing::trace!(session_id = %self.id, "Frame after close ignored");
            return Ok(());
        }

        let message = GatewayMessage::from_json(text)?;
        tracing::trace!(session_id = %self.id, frame = %message, "Frame received");

        if matches!(state, SessionState::Disconnected | SessionState::Connecting) {
            return Err(GatewayError::UnexpectedFrame {
                op: message.op,
                state,
            });
        }

        match message.opcode() {
            Some(OpCode::Hello) => self.handle_hello(&message, state),
            Some(OpCode::Dispatch) => self.handle_dispatch(message, state),
            Some(OpCode::HeartbeatAck) => {
                let latency = self.heartbeat.acknowledge();
                tracing::trace!(
                    session_id = %self.id,
                    latency_ms = latency.map(|l| l.as_millis() as u64),
                    "Heartbeat acknowledged"
                );
                Ok(())
            }
            Some(OpCode::Heartbeat) => {
                tracing::debug!(session_id = %self.id, "Server requested heartbeat");
                if !self.heartbeat.beat_now() {
                    enqueue(&self.outbound, GatewayMessage::heartbeat(self.last_sequence()));
                }
                Ok(())
            }
            Some(op @ (OpCode::Reconnect | OpCode::InvalidSession)) => {
                tracing::warn!(
                    session_id = %self.id,
                    op = %op,
                    "Server requested a new session; resuming is not supported"
                );
                Ok(())
            }
            Some(op) => {
                tracing::debug!(session_id = %self.id, op = %op, "Ignoring client-only op");
                Ok(())
            }
            None => {
                tracing::debug!(session_id = %self.id, op = message.op, "Ignoring unknown op");
                Ok(())
            }
        }
    }

    fn handle_hello(&self, message: &GatewayMessage, state: SessionState) -> Result<(), GatewayError> {
        if state != SessionState::AwaitingHello {
            return Err(GatewayError::UnexpectedFrame {
                op: message.op,
                state,
            });
        }

        let hello = message.as_hello()?;
        let interval = hello.interval();

        self.transition(SessionState::Identifying);
        let identify = IdentifyPayload::new(
            self.config.token.clone(),
            &self.config.client_name,
            self.config.large_threshold,
        );
        enqueue(&self.outbound, GatewayMessage::identify(&identify));

        let sequence = Arc::clone(&self.sequence);
        let outbound = self.outbound.clone();
        self.heartbeat.start(interval, move || {
            let last_sequence = sequence.load(Ordering::Acquire);
            tracing::trace!(seq = last_sequence, "Sending heartbeat");
            enqueue(&outbound, GatewayMessage::heartbeat(last_sequence));
        });

        self.transition(SessionState::Ready);
        tracing::info!(
            session_id = %self.id,
            heartbeat_interval_ms = interval.as_millis() as u64,
            "Identified with gateway"
        );
        Ok(())
    }

    fn handle_dispatch(&self, message: GatewayMessage, state: SessionState) -> Result<(), GatewayError> {
        if state != SessionState::Ready {
            return Err(GatewayError::UnexpectedFrame {
                op: message.op,
                state,
            });
        }

        // Recorded before anything else so a heartbeat fired from inside a
        // handler already reports this frame
        if let Some(s) = message.s {
            self.sequence.fetch_max(s, Ordering::AcqRel);
        }

        let GatewayMessage { d, s, t, .. } = message;
        let name = t.ok_or(GatewayError::Malformed("dispatch without event name"))?;
        tracing::debug!(session_id = %self.id, t = %name, seq = ?s, "Dispatch received");

        // READY is also published, with the payload as received
        let ready_payload = (EventKind::from_str(&name) == Some(EventKind::Ready)).then(|| d.clone());

        match DispatchEvent::decode(&name, d)? {
            DispatchEvent::Ready(ready) => {
                self.cache.apply_ready(&ready);
                *self.user.write() = Some(ready.user.clone());
                *self.remote_session_id.write() = ready.session_id.clone();

                tracing::info!(
                    session_id = %self.id,
                    user_id = %ready.user.id,
                    guilds = ready.guilds.len(),
                    "Session ready"
                );
                self.publish(&name, s, ready_payload.unwrap_or_default());
            }
            DispatchEvent::GuildCreate(snapshot) => {
                self.cache.apply_guild_create(*snapshot);
            }
            DispatchEvent::PresenceUpdate(update) => {
                self.cache.apply_presence_update(&update);
            }
            DispatchEvent::Other { name, data } => {
                self.publish(&name, s, data);
            }
        }
        Ok(())
    }

    // === Helpers ===

    /// Move to `next` unless already `Closed`; returns whether the state changed
    fn transition(&self, next: SessionState) -> bool {
        let mut previous = next;
        let changed = self.state.send_if_modified(|current| {
            if *current == SessionState::Closed || *current == next {
                return false;
            }
            previous = *current;
            *current = next;
            true
        });

        if changed {
            tracing::debug!(
                session_id = %self.id,
                from = %previous,
                to = %next,
                "Session state changed"
            );
            self.debug(|| format!("state {previous} -> {next}"));
        }
        changed
    }

    fn publish(&self, name: &str, sequence: Option<u64>, data: Value) {
        let event = GatewayEvent::new(name, sequence, data);
        let handled = self.bus.publish(name, &event);
        tracing::trace!(session_id = %self.id, t = %name, handlers = handled, "Event published");
    }

    fn debug(&self, message: impl FnOnce() -> String) {
        if self.config.debug {
            let event = GatewayEvent::new(DEBUG_EVENT, None, Value::String(message()));
            self.bus.publish(DEBUG_EVENT, &event);
        }
    }
}

/// Append to the outbound queue without waiting
///
/// Returns `false` if the frame was dropped.
fn enqueue(outbound: &mpsc::Sender<GatewayMessage>, message: GatewayMessage) -> bool {
    match outbound.try_send(message) {
        Ok(()) => true,
        Err(mpsc::error::TrySendError::Full(message)) => {
            tracing::warn!(frame = %message, "Outbound queue full, frame dropped");
            false
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            tracing::debug!("Outbound queue closed, frame dropped");
            false
        }
    }
}
