//! Client facade
//!
//! One [`Client`] holds the REST client and the gateway session for a bot and
//! exposes handler registration over the shared dispatcher.

use chat_gateway::dispatch::{AwaitCallback, Registration};
use chat_gateway::protocol::PresenceUpdatePayload;
use chat_gateway::transport::ConnectionTransport;
use chat_gateway::{
    Dispatcher, EndpointResolver, Event, EventKind, GatewayClient, GatewayStatus, Predicate,
    StaticEndpoint, WebSocketTransport,
};
use chat_rest::{HttpResponse, HttpTransport, RequestSpec, RestClient};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::error::ClientResult;
use crate::options::{ClientOptions, Credentials};
use crate::resolver::RestEndpoint;

/// A connected (or connectable) bot
#[derive(Debug)]
pub struct Client {
    rest: RestClient,
    gateway: GatewayClient,
}

impl Client {
    /// Build a client over `reqwest` and a WebSocket. Nothing connects until
    /// [`start`](Self::start).
    pub fn new(credentials: &Credentials, options: ClientOptions) -> ClientResult<Self> {
        let rest = RestClient::new(options.rest_config(credentials), options.governor.clone())?;
        Self::assemble(credentials, &options, rest, Arc::new(WebSocketTransport::new()))
    }

    /// Build a client over caller-supplied transports
    pub fn with_transports(
        credentials: &Credentials,
        options: ClientOptions,
        http: Arc<dyn HttpTransport>,
        gateway: Arc<dyn ConnectionTransport>,
    ) -> ClientResult<Self> {
        let rest = RestClient::with_transport(
            options.rest_config(credentials),
            http,
            options.governor.clone(),
        )?;
        Self::assemble(credentials, &options, rest, gateway)
    }

    fn assemble(
        credentials: &Credentials,
        options: &ClientOptions,
        rest: RestClient,
        transport: Arc<dyn ConnectionTransport>,
    ) -> ClientResult<Self> {
        let resolver: Arc<dyn EndpointResolver> = match &options.gateway_url {
            Some(url) => Arc::new(StaticEndpoint::new(url.clone())),
            None => Arc::new(RestEndpoint::new(rest.clone())),
        };
        let dispatcher = Arc::new(Dispatcher::new(options.dispatcher.clone()));
        let gateway = GatewayClient::new(
            options.gateway_options(credentials),
            transport,
            resolver,
            dispatcher,
        )?;

        Ok(Self { rest, gateway })
    }

    /// Build the client and wait until the gateway session is ready.
    ///
    /// Handlers registered afterwards miss the events that arrived before
    /// they existed; use [`new`](Self::new), register, then [`start`](Self::start)
    /// to see everything from Ready on.
    pub async fn connect(credentials: Credentials, options: ClientOptions) -> ClientResult<Self> {
        let client = Self::new(&credentials, options)?;
        client.start().await?;
        Ok(client)
    }

    /// Open the gateway and wait for Ready
    pub async fn start(&self) -> ClientResult<()> {
        self.gateway.connect().await?;
        Ok(())
    }

    /// Register a handler for `kind` events matching `predicate`
    pub fn on<F, Fut>(&self, kind: EventKind, predicate: Predicate, handler: F) -> Registration
    where
        F: Fn(Arc<Event>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.dispatcher().register(kind, predicate, handler)
    }

    pub fn remove_handler(&self, registration: Registration) -> bool {
        self.dispatcher().remove(registration)
    }

    /// Register an await under `key`, replacing any await with the same key
    pub fn await_once(
        &self,
        key: impl Into<String>,
        kind: EventKind,
        predicate: Predicate,
        callback: Option<AwaitCallback>,
    ) -> bool {
        self.dispatcher().await_once(key, kind, predicate, callback)
    }

    /// Wait for the next matching event, or `None` after `timeout`
    pub async fn wait_for(
        &self,
        kind: EventKind,
        predicate: Predicate,
        timeout: Duration,
    ) -> Option<Event> {
        self.dispatcher().wait_for(kind, predicate, timeout).await
    }

    /// Send a REST request through the rate limit governor
    pub async fn send(&self, spec: RequestSpec) -> ClientResult<HttpResponse> {
        Ok(self.rest.send(spec).await?)
    }

    pub async fn update_presence(&self, presence: &PresenceUpdatePayload) -> ClientResult<()> {
        self.gateway.update_presence(presence).await?;
        Ok(())
    }

    pub fn status(&self) -> watch::Receiver<GatewayStatus> {
        self.gateway.status()
    }

    pub fn rest(&self) -> &RestClient {
        &self.rest
    }

    pub fn gateway(&self) -> &GatewayClient {
        &self.gateway
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        self.gateway.dispatcher()
    }

    /// Close the gateway with a normal close
    pub async fn disconnect(&self) -> ClientResult<()> {
        self.gateway.disconnect().await?;
        Ok(())
    }
}
