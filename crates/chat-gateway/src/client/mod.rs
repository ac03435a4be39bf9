//! Gateway client
//!
//! [`GatewayClient`] owns one shard's connection. The work happens in a
//! background runner task; the client keeps the handles to talk to it.

mod config;
mod endpoint;
mod runner;

pub use config::{GatewayOptions, LARGE_THRESHOLD_RANGE};
pub use endpoint::{connect_url, EndpointResolver, StaticEndpoint};

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::connection::{ConnectionState, GatewayStatus};
use crate::dispatch::Dispatcher;
use crate::error::{GatewayError, GatewayResult};
use crate::protocol::{
    GatewayMessage, PresenceUpdatePayload, RequestGuildMembersPayload, VoiceStateUpdatePayload,
};
use crate::transport::ConnectionTransport;
use runner::Runner;

/// Handle to a gateway session
pub struct GatewayClient {
    shard: (u32, u32),
    dispatcher: Arc<Dispatcher>,
    commands: mpsc::Sender<GatewayMessage>,
    status: watch::Receiver<GatewayStatus>,
    shutdown: watch::Sender<bool>,
    pending: Mutex<Option<Runner>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl GatewayClient {
    /// Validate the options and prepare the runner. Nothing connects until
    /// [`connect`](Self::connect).
    pub fn new(
        options: GatewayOptions,
        transport: Arc<dyn ConnectionTransport>,
        resolver: Arc<dyn EndpointResolver>,
        dispatcher: Arc<Dispatcher>,
    ) -> GatewayResult<Self> {
        options.validate()?;

        let shard = options.shard;
        let (commands_tx, commands_rx) = mpsc::channel(options.outbound_buffer.max(1));
        let (status_tx, status_rx) = watch::channel(GatewayStatus::default());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let runner = Runner::new(
            options,
            transport,
            resolver,
            Arc::clone(&dispatcher),
            status_tx,
            commands_rx,
            shutdown_rx,
        );

        Ok(Self {
            shard,
            dispatcher,
            commands: commands_tx,
            status: status_rx,
            shutdown: shutdown_tx,
            pending: Mutex::new(Some(runner)),
            task: Mutex::new(None),
        })
    }

    /// Start the runner and wait for the first Ready.
    ///
    /// Fails with the terminal error if the gateway rejects the session
    /// before it is ready. Transient failures are retried in the background.
    pub async fn connect(&self) -> GatewayResult<()> {
        let Some(mut runner) = self.pending.lock().take() else {
            return Err(GatewayError::AlreadyStarted);
        };

        let (ready_tx, ready_rx) = oneshot::channel();
        runner.notify_ready(ready_tx);

        let span = tracing::info_span!("gateway", shard = self.shard.0, shards = self.shard.1);
        *self.task.lock() = Some(tokio::spawn(runner.run().instrument(span)));

        ready_rx.await.unwrap_or(Err(GatewayError::ShuttingDown))
    }

    /// Current connection status
    pub fn status(&self) -> watch::Receiver<GatewayStatus> {
        self.status.clone()
    }

    pub fn is_ready(&self) -> bool {
        self.status.borrow().state.is_ready()
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Queue a client command. Commands wait until the session is ready.
    pub async fn send(&self, message: GatewayMessage) -> GatewayResult<()> {
        if self.task.lock().is_none() {
            return Err(GatewayError::NotConnected);
        }
        self.commands
            .send(message)
            .await
            .map_err(|_| GatewayError::ShuttingDown)
    }

    pub async fn update_presence(&self, presence: &PresenceUpdatePayload) -> GatewayResult<()> {
        self.send(GatewayMessage::presence_update(presence)).await
    }

    pub async fn update_voice_state(&self, voice: &VoiceStateUpdatePayload) -> GatewayResult<()> {
        self.send(GatewayMessage::voice_state_update(voice)).await
    }

    pub async fn request_guild_members(
        &self,
        request: &RequestGuildMembersPayload,
    ) -> GatewayResult<()> {
        self.send(GatewayMessage::request_guild_members(request))
            .await
    }

    /// Close the connection with a normal close and wait for the runner
    pub async fn disconnect(&self) -> GatewayResult<()> {
        self.pending.lock().take();
        let _ = self.shutdown.send(true);

        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "Gateway runner panicked");
            }
        }
        Ok(())
    }

    /// Whether the runner has stopped for good
    pub fn is_terminated(&self) -> bool {
        self.status.borrow().state == ConnectionState::Terminated
    }
}

impl std::fmt::Debug for GatewayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayClient")
            .field("shard", &self.shard)
            .field("status", &*self.status.borrow())
            .finish_non_exhaustive()
    }
}
