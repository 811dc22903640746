//! Client facade
//!
//! Ties configuration, the REST client, the entity cache, the event bus and
//! one gateway session at a time together.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use cord_cache::EntityCache;
use cord_common::{ClientConfig, Credentials};
use cord_core::{Activity, Id, Message, User};
use cord_rest::{HistoryQuery, RestClient, RestError};

use crate::bus::{EventBus, GatewayEvent, Subscription};
use crate::connection::{self, ConnectionHandle};
use crate::error::GatewayError;
use crate::protocol::{GatewayMessage, StatusUpdatePayload, VoiceStatePayload};
use crate::resolver::{socket_url, GatewayUrlResolver};
use crate::session::{Session, SessionConfig, SessionState};

/// Gateway client
pub struct Client {
    config: ClientConfig,
    rest: Arc<RestClient>,
    resolver: Arc<dyn GatewayUrlResolver>,
    cache: Arc<EntityCache>,
    bus: Arc<EventBus<GatewayEvent>>,
    session: RwLock<Option<Arc<Session>>>,
    /// Also serializes login and logout
    connection: Mutex<Option<ConnectionHandle>>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("api_base", &self.config.api_base)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Create a client that resolves the gateway URL through the REST API
    pub fn new(config: ClientConfig) -> Result<Self, GatewayError> {
        let rest = Arc::new(RestClient::from_config(&config)?);
        let resolver: Arc<dyn GatewayUrlResolver> = rest.clone();

        Ok(Self {
            config,
            rest,
            resolver,
            cache: EntityCache::new_shared(),
            bus: Arc::new(EventBus::new()),
            session: RwLock::new(None),
            connection: Mutex::new(None),
        })
    }

    /// Create a client configured from `CORD_*` environment variables
    pub fn from_env() -> Result<Self, GatewayError> {
        Self::new(ClientConfig::from_env()?)
    }

    /// Use a different source for the gateway URL
    #[must_use]
    pub fn with_resolver(mut self, resolver: Arc<dyn GatewayUrlResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    // === Session lifecycle ===

    /// Open a new gateway session
    ///
    /// Email/password credentials are exchanged for a token first; only then
    /// is the gateway URL resolved and the socket opened. Returns once the
    /// socket is open; the session identifies itself when Hello arrives.
    pub async fn login(&self) -> Result<Arc<Session>, GatewayError> {
        let mut connection = self.connection.lock().await;
        if self.state().is_active() {
            return Err(GatewayError::AlreadyConnected);
        }
        if let Some(previous) = connection.take() {
            previous.shutdown().await;
        }

        let token = self.authenticate().await?;
        let base = self.resolver.resolve().await?;
        let url = socket_url(&base, self.config.gateway_version);

        let (outbound_tx, outbound_rx) = mpsc::channel(self.config.outbound_buffer.max(1));
        self.cache.clear();
        let session = Arc::new(Session::new(
            SessionConfig::new(token, &self.config),
            outbound_tx,
            Arc::clone(&self.cache),
            Arc::clone(&self.bus),
        ));
        *self.session.write() = Some(Arc::clone(&session));

        *connection = Some(connection::connect(&url, Arc::clone(&session), outbound_rx).await?);
        Ok(session)
    }

    /// Close the current session, if any
    ///
    /// Stops the heartbeat, sends a Close frame and waits for the socket
    /// tasks to end. REST calls already in flight are not cancelled.
    pub async fn logout(&self) {
        let handle = self.connection.lock().await.take();
        if let Some(session) = self.session() {
            session.close("logout");
        }
        if let Some(handle) = handle {
            handle.shutdown().await;
        }
    }

    async fn authenticate(&self) -> Result<String, GatewayError> {
        match &self.config.credentials {
            Credentials::Token(token) => Ok(token.clone()),
            Credentials::Password { email, password } => match self.rest.token() {
                Some(token) => Ok(token),
                None => Ok(self.rest.login(email, password).await?),
            },
        }
    }

    // === Accessors ===

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Current session, open or closed
    pub fn session(&self) -> Option<Arc<Session>> {
        self.session.read().clone()
    }

    pub fn state(&self) -> SessionState {
        self.session()
            .map_or(SessionState::Disconnected, |session| session.state())
    }

    /// The authenticated user of the current session
    pub fn user(&self) -> Option<User> {
        self.session().and_then(|session| session.user())
    }

    /// Last heartbeat round trip
    pub fn latency(&self) -> Option<Duration> {
        self.session().and_then(|session| session.latency())
    }

    pub fn cache(&self) -> &Arc<EntityCache> {
        &self.cache
    }

    pub fn rest(&self) -> &Arc<RestClient> {
        &self.rest
    }

    // === Events ===

    /// Register a handler for an event name (`READY`, `MESSAGE_CREATE`, `DEBUG`, ...)
    pub fn on<F>(&self, name: impl Into<String>, handler: F) -> Subscription
    where
        F: Fn(&GatewayEvent) + Send + Sync + 'static,
    {
        self.bus.subscribe(name, handler)
    }

    /// Remove a handler registered with [`Client::on`]
    pub fn off(&self, subscription: &Subscription) -> bool {
        self.bus.unsubscribe(subscription)
    }

    // === Gateway commands ===

    /// Set idle time and game (op 3)
    pub fn set_status(
        &self,
        idle_since: Option<u64>,
        game: Option<Activity>,
    ) -> Result<(), GatewayError> {
        let payload = StatusUpdatePayload::new(idle_since, game);
        self.send(GatewayMessage::status_update(&payload))
    }

    /// Join or move to a voice channel, or leave voice in the guild with `None` (op 4)
    pub fn voice_state(&self, guild_id: &str, channel_id: Option<&str>) -> Result<(), GatewayError> {
        let payload = VoiceStatePayload::new(guild_id, channel_id.map(Id::from));
        self.send(GatewayMessage::voice_state(&payload))
    }

    fn send(&self, message: GatewayMessage) -> Result<(), GatewayError> {
        self.session()
            .ok_or(GatewayError::NotConnected)?
            .send(message)
    }

    // === REST with completion callbacks ===
    //
    // Each call runs on its own task and invokes the callback exactly once.
    // Completion order relative to gateway events is unspecified.

    pub fn send_message<F>(&self, channel_id: &str, content: &str, callback: F) -> JoinHandle<()>
    where
        F: FnOnce(Result<Message, RestError>) + Send + 'static,
    {
        let (channel_id, content) = (channel_id.to_string(), content.to_string());
        self.spawn_request(
            move |rest| async move { rest.send_message(&channel_id, &content).await },
            callback,
        )
    }

    pub fn edit_message<F>(
        &self,
        channel_id: &str,
        message_id: &str,
        content: &str,
        callback: F,
    ) -> JoinHandle<()>
    where
        F: FnOnce(Result<Message, RestError>) + Send + 'static,
    {
        let (channel_id, message_id, content) =
            (channel_id.to_string(), message_id.to_string(), content.to_string());
        self.spawn_request(
            move |rest| async move { rest.edit_message(&channel_id, &message_id, &content).await },
            callback,
        )
    }

    pub fn delete_message<F>(&self, channel_id: &str, message_id: &str, callback: F) -> JoinHandle<()>
    where
        F: FnOnce(Result<(), RestError>) + Send + 'static,
    {
        let (channel_id, message_id) = (channel_id.to_string(), message_id.to_string());
        self.spawn_request(
            move |rest| async move { rest.delete_message(&channel_id, &message_id).await },
            callback,
        )
    }

    pub fn fetch_messages<F>(&self, channel_id: &str, query: HistoryQuery, callback: F) -> JoinHandle<()>
    where
        F: FnOnce(Result<Vec<Message>, RestError>) + Send + 'static,
    {
        let channel_id = channel_id.to_string();
        self.spawn_request(
            move |rest| async move { rest.fetch_messages(&channel_id, &query).await },
            callback,
        )
    }

    /// Set a member's nickname; `None` targets the current user
    pub fn set_nickname<F>(
        &self,
        guild_id: &str,
        user_id: Option<&str>,
        nick: &str,
        callback: F,
    ) -> JoinHandle<()>
    where
        F: FnOnce(Result<(), RestError>) + Send + 'static,
    {
        let (guild_id, user_id, nick) =
            (guild_id.to_string(), user_id.map(str::to_string), nick.to_string());
        self.spawn_request(
            move |rest| async move { rest.set_nickname(&guild_id, user_id.as_deref(), &nick).await },
            callback,
        )
    }

    pub fn start_typing<F>(&self, channel_id: &str, callback: F) -> JoinHandle<()>
    where
        F: FnOnce(Result<(), RestError>) + Send + 'static,
    {
        let channel_id = channel_id.to_string();
        self.spawn_request(
            move |rest| async move { rest.start_typing(&channel_id).await },
            callback,
        )
    }

    fn spawn_request<T, R, Fut, F>(&self, request: R, callback: F) -> JoinHandle<()>
    where
        T: Send + 'static,
        R: FnOnce(Arc<RestClient>) -> Fut,
        Fut: Future<Output = Result<T, RestError>> + Send + 'static,
        F: FnOnce(Result<T, RestError>) + Send + 'static,
    {
        let future = request(Arc::clone(&self.rest));
        tokio::spawn(async move {
            let result = future.await;
            if let Err(err) = &result {
                tracing::debug!(error = %err, "REST request failed");
            }
            callback(result);
        })
    }
}
