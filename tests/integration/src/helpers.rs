//! Test helpers for integration tests
//!
//! Provides a fake server speaking both the REST API and the gateway
//! protocol, plus small waiting utilities.

use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use cord_common::{try_init_tracing, ClientConfig};
use cord_gateway::{Client, GatewayEvent};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::fixtures;

/// How long any single wait may take before the test fails
pub const WAIT: Duration = Duration::from_secs(5);

/// Token the fake API hands out for valid credentials
pub const EXCHANGED_TOKEN: &str = "exchanged-token";

/// Something the fake gateway should do to the connected client
#[derive(Debug)]
enum Push {
    Frame(String),
    Close(u16),
}

struct FakeState {
    addr: SocketAddr,
    hello_interval_ms: u64,
    /// Paths of REST requests in arrival order
    requests: Mutex<Vec<String>>,
    /// Query string of the socket request
    socket_query: Mutex<Option<HashMap<String, String>>>,
    to_client: Mutex<Option<mpsc::UnboundedReceiver<Push>>>,
    from_client: mpsc::UnboundedSender<Value>,
}

impl FakeState {
    fn record(&self, path: impl Into<String>) {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(path.into());
        }
    }
}

/// In-process fake of the REST API and the gateway socket
pub struct FakeServer {
    pub addr: SocketAddr,
    state: Arc<FakeState>,
    push: mpsc::UnboundedSender<Push>,
    received: mpsc::UnboundedReceiver<Value>,
    _handle: JoinHandle<()>,
}

impl FakeServer {
    /// Start a server whose Hello announces `hello_interval_ms`
    pub async fn start(hello_interval_ms: u64) -> Result<Self> {
        // Shared by every test in the binary; only the first call installs it
        let _ = try_init_tracing();

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let (push, to_client) = mpsc::unbounded_channel();
        let (from_client, received) = mpsc::unbounded_channel();
        let state = Arc::new(FakeState {
            addr,
            hello_interval_ms,
            requests: Mutex::new(Vec::new()),
            socket_query: Mutex::new(None),
            to_client: Mutex::new(Some(to_client)),
            from_client,
        });

        let app = Router::new()
            .route("/", get(gateway_socket))
            .route("/api/gateway", get(gateway_url))
            .route("/api/auth/login", post(auth_login))
            .route("/api/channels/:channel/messages", post(create_message))
            .with_state(Arc::clone(&state));

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Ok(Self {
            addr,
            state,
            push,
            received,
            _handle: handle,
        })
    }

    /// REST base URL of this server
    pub fn api_base(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    /// Client configuration pointing at this server
    pub fn config(&self) -> ClientConfig {
        ClientConfig::with_token("test-token").api_base(self.api_base())
    }

    /// A client with token credentials pointing at this server
    pub fn client(&self) -> Result<Client> {
        Ok(Client::new(self.config())?)
    }

    /// Paths of the REST requests received so far
    pub fn requests(&self) -> Vec<String> {
        self.state
            .requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }

    /// Query parameters the client opened the socket with
    pub fn socket_query(&self) -> Option<HashMap<String, String>> {
        self.state
            .socket_query
            .lock()
            .ok()
            .and_then(|query| query.clone())
    }

    /// Queue a raw frame for the connected client
    pub fn send(&self, frame: Value) -> Result<()> {
        self.push
            .send(Push::Frame(frame.to_string()))
            .context("gateway socket task is gone")
    }

    /// Queue a dispatch frame for the connected client
    pub fn dispatch(&self, t: &str, s: u64, d: Value) -> Result<()> {
        self.send(json!({"op": 0, "t": t, "s": s, "d": d}))
    }

    /// Close the socket from the server side with `code`
    pub fn close(&self, code: u16) -> Result<()> {
        self.push
            .send(Push::Close(code))
            .context("gateway socket task is gone")
    }

    /// Next frame the client sent
    pub async fn next_frame(&mut self) -> Result<Value> {
        tokio::time::timeout(WAIT, self.received.recv())
            .await
            .context("timed out waiting for a client frame")?
            .context("gateway socket closed")
    }

    /// Next frame the client sent with op code `op`, skipping others
    pub async fn next_op(&mut self, op: u64) -> Result<Value> {
        loop {
            let frame = self.next_frame().await?;
            if frame["op"] == op {
                return Ok(frame);
            }
        }
    }
}

async fn gateway_url(State(state): State<Arc<FakeState>>) -> Json<Value> {
    state.record("/gateway");
    Json(json!({"url": format!("ws://{}", state.addr)}))
}

async fn auth_login(
    State(state): State<Arc<FakeState>>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    state.record("/auth/login");
    if body["email"] == "me@example.com" && body["password"] == "hunter2" {
        Ok(Json(json!({"token": EXCHANGED_TOKEN})))
    } else {
        Err(StatusCode::UNAUTHORIZED)
    }
}

async fn create_message(
    State(state): State<Arc<FakeState>>,
    Path(channel): Path<String>,
    Json(body): Json<Value>,
) -> Json<Value> {
    state.record(format!("/channels/{channel}/messages"));
    let content = body["content"].as_str().unwrap_or_default();
    Json(fixtures::message("m1", &channel, content))
}

async fn gateway_socket(
    State(state): State<Arc<FakeState>>,
    Query(query): Query<HashMap<String, String>>,
    ws: WebSocketUpgrade,
) -> Response {
    if let Ok(mut slot) = state.socket_query.lock() {
        *slot = Some(query);
    }
    ws.on_upgrade(move |socket| serve_socket(socket, state))
}

async fn serve_socket(mut socket: WebSocket, state: Arc<FakeState>) {
    let Some(mut to_client) = state.to_client.lock().ok().and_then(|mut slot| slot.take()) else {
        tracing::warn!("Fake gateway only serves one socket");
        return;
    };

    let hello = json!({"op": 10, "d": {"heartbeat_interval": state.hello_interval_ms}});
    if socket.send(Message::Text(hello.to_string())).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            push = to_client.recv() => match push {
                Some(Push::Frame(text)) => {
                    if socket.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                Some(Push::Close(code)) => {
                    let frame = axum::extract::ws::CloseFrame {
                        code,
                        reason: "closed by test".into(),
                    };
                    let _ = socket.send(Message::Close(Some(frame))).await;
                    break;
                }
                None => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    if let Ok(frame) = serde_json::from_str::<Value>(&text) {
                        let _ = state.from_client.send(frame);
                    }
                }
                Some(Ok(Message::Close(_)) | Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }
}

/// Forward every event named `name` into a channel
pub fn capture(client: &Client, name: &str) -> mpsc::UnboundedReceiver<GatewayEvent> {
    let (tx, rx) = mpsc::unbounded_channel();
    client.on(name, move |event| {
        let _ = tx.send(event.clone());
    });
    rx
}

/// Wait for the next captured event
pub async fn next_event(events: &mut mpsc::UnboundedReceiver<GatewayEvent>) -> Result<GatewayEvent> {
    tokio::time::timeout(WAIT, events.recv())
        .await
        .context("timed out waiting for an event")?
        .context("event channel closed")
}

/// Await `future`, failing the test after [`WAIT`]
pub async fn within<T>(future: impl Future<Output = T>) -> Result<T> {
    tokio::time::timeout(WAIT, future)
        .await
        .context("timed out")
}
