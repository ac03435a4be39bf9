//! Mock platform servers
//!
//! [`MockPlatform`] serves a small slice of the REST API and a `/gateway`
//! WebSocket endpoint from one axum app. Each accepted WebSocket is handed to
//! the test as a [`GatewaySocket`] so it can play the server side by hand.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, RawQuery, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chat_client::{Client, ClientOptions, Credentials};
use chat_gateway::{GatewayMessage, OpCode};
use chat_rest::{GovernorConfig, RestClient, RestConfig};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::fixtures::{message_json, unique_id, TEST_TOKEN};

/// How long a helper waits for the client before failing the test
pub const STEP_TIMEOUT: Duration = Duration::from_secs(10);

/// Install a test-friendly subscriber once; `RUST_LOG` picks the level
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A request the mock REST API received
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: &'static str,
    pub path: String,
    pub headers: HeaderMap,
    pub body: String,
    pub at: Instant,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// A canned response served before the default one
#[derive(Debug, Clone)]
pub struct ScriptedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Value,
}

impl ScriptedResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body,
        }
    }

    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }
}

impl IntoResponse for ScriptedResponse {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut response = (status, Json(self.body)).into_response();
        for (name, value) in self.headers {
            if let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(&value),
            ) {
                response.headers_mut().insert(name, value);
            }
        }
        response
    }
}

struct MockState {
    addr: SocketAddr,
    requests: Mutex<Vec<RecordedRequest>>,
    scripted: Mutex<VecDeque<ScriptedResponse>>,
    gateway_queries: Mutex<Vec<String>>,
    sockets: mpsc::UnboundedSender<WebSocket>,
}

impl MockState {
    fn record(&self, method: &'static str, path: String, headers: HeaderMap, body: String) {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(RecordedRequest {
                method,
                path,
                headers,
                body,
                at: Instant::now(),
            });
        }
    }

    fn next_scripted(&self) -> Option<ScriptedResponse> {
        self.scripted.lock().ok()?.pop_front()
    }
}

/// REST API plus gateway endpoint on an ephemeral port
pub struct MockPlatform {
    pub addr: SocketAddr,
    state: Arc<MockState>,
    sockets: tokio::sync::Mutex<mpsc::UnboundedReceiver<WebSocket>>,
    _handle: JoinHandle<()>,
}

impl MockPlatform {
    pub async fn start() -> Result<Self> {
        init_test_logging();

        let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
        let addr = listener.local_addr()?;
        let (tx, rx) = mpsc::unbounded_channel();

        let state = Arc::new(MockState {
            addr,
            requests: Mutex::new(Vec::new()),
            scripted: Mutex::new(VecDeque::new()),
            gateway_queries: Mutex::new(Vec::new()),
            sockets: tx,
        });

        let app = Router::new()
            .route("/api/v10/gateway", get(get_gateway))
            .route("/api/v10/channels/:channel_id/messages", post(create_message))
            .route("/gateway", get(gateway_upgrade))
            .with_state(Arc::clone(&state));

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Ok(Self {
            addr,
            state,
            sockets: tokio::sync::Mutex::new(rx),
            _handle: handle,
        })
    }

    pub fn api_base(&self) -> String {
        format!("http://{}/api/v10", self.addr)
    }

    pub fn gateway_url(&self) -> String {
        format!("ws://{}/gateway", self.addr)
    }

    /// Queue responses for the next REST calls, in order
    pub fn script(&self, responses: impl IntoIterator<Item = ScriptedResponse>) {
        if let Ok(mut scripted) = self.state.scripted.lock() {
            scripted.extend(responses);
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state
            .requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    /// Query strings the gateway endpoint was opened with
    pub fn gateway_queries(&self) -> Vec<String> {
        self.state
            .gateway_queries
            .lock()
            .map(|q| q.clone())
            .unwrap_or_default()
    }

    pub fn rest_client(&self) -> Result<RestClient> {
        self.rest_client_with(GovernorConfig::default())
    }

    pub fn rest_client_with(&self, governor: GovernorConfig) -> Result<RestClient> {
        Ok(RestClient::new(
            RestConfig::new(self.api_base(), TEST_TOKEN),
            governor,
        )?)
    }

    /// Client options pointed at this platform
    pub fn client_options(&self) -> ClientOptions {
        ClientOptions::default().api_base(self.api_base())
    }

    /// A client that has not connected yet
    pub fn client(&self, options: ClientOptions) -> Result<Client> {
        Ok(Client::new(&Credentials::new(TEST_TOKEN), options)?)
    }

    /// Wait for the next gateway connection
    pub async fn accept(&self) -> Result<GatewaySocket> {
        let mut sockets = self.sockets.lock().await;
        let socket = tokio::time::timeout(STEP_TIMEOUT, sockets.recv())
            .await
            .context("timed out waiting for a gateway connection")?
            .context("gateway endpoint stopped")?;
        Ok(GatewaySocket { socket })
    }
}

async fn get_gateway(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    state.record("GET", "/gateway".to_string(), headers, String::new());
    if let Some(scripted) = state.next_scripted() {
        return scripted.into_response();
    }
    Json(serde_json::json!({ "url": format!("ws://{}/gateway", state.addr) })).into_response()
}

async fn create_message(
    State(state): State<Arc<MockState>>,
    Path(channel_id): Path<u64>,
    headers: HeaderMap,
    body: String,
) -> Response {
    state.record(
        "POST",
        format!("/channels/{channel_id}/messages"),
        headers,
        body.clone(),
    );
    if let Some(scripted) = state.next_scripted() {
        return scripted.into_response();
    }

    let content = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| v.get("content").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_default();
    Json(message_json(unique_id(), channel_id, &content)).into_response()
}

async fn gateway_upgrade(
    State(state): State<Arc<MockState>>,
    RawQuery(query): RawQuery,
    ws: WebSocketUpgrade,
) -> Response {
    if let Ok(mut queries) = state.gateway_queries.lock() {
        queries.push(query.unwrap_or_default());
    }
    ws.on_upgrade(move |socket| async move {
        let _ = state.sockets.send(socket);
    })
}

/// Server side of one gateway connection
pub struct GatewaySocket {
    socket: WebSocket,
}

impl GatewaySocket {
    pub async fn send(&mut self, message: &GatewayMessage) -> Result<()> {
        self.socket
            .send(Message::Text(message.to_json()?))
            .await
            .context("gateway socket send failed")
    }

    pub async fn send_binary(&mut self, bytes: Vec<u8>) -> Result<()> {
        self.socket
            .send(Message::Binary(bytes))
            .await
            .context("gateway socket send failed")
    }

    /// Next envelope from the client; `None` once the client closed
    pub async fn recv(&mut self) -> Result<Option<GatewayMessage>> {
        loop {
            let next = tokio::time::timeout(STEP_TIMEOUT, self.socket.recv())
                .await
                .context("timed out waiting for the client")?;
            match next {
                Some(Ok(Message::Text(text))) => {
                    return Ok(Some(GatewayMessage::from_slice(text.as_bytes())?));
                }
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
            }
        }
    }

    /// Skip to the next envelope with `op`, acking heartbeats on the way
    pub async fn expect_op(&mut self, op: OpCode) -> Result<GatewayMessage> {
        loop {
            let message = self
                .recv()
                .await?
                .with_context(|| format!("client closed while waiting for {op}"))?;
            if message.op == op {
                return Ok(message);
            }
            if message.op == OpCode::Heartbeat {
                self.send(&GatewayMessage::heartbeat_ack()).await?;
            }
        }
    }

    /// Wait for the client's close frame and return its code
    pub async fn expect_close(&mut self) -> Result<Option<u16>> {
        loop {
            let next = tokio::time::timeout(STEP_TIMEOUT, self.socket.recv())
                .await
                .context("timed out waiting for a close frame")?;
            match next {
                Some(Ok(Message::Close(frame))) => return Ok(frame.map(|f| f.code)),
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
                None => anyhow::bail!("connection dropped without a close frame"),
            }
        }
    }

    pub async fn close(mut self, code: u16) -> Result<()> {
        self.socket
            .send(Message::Close(Some(CloseFrame {
                code,
                reason: "".into(),
            })))
            .await
            .context("gateway socket close failed")
    }
}
