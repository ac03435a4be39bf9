//! Connection runner
//!
//! The single task that owns the transport read loop and the session. One call
//! to [`Runner::run`] covers the whole life of a client: connect, handshake,
//! read until the connection drops, then resume, re-identify or stop.

use rand::Rng;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use super::config::GatewayOptions;
use super::endpoint::{connect_url, EndpointResolver};
use crate::connection::{
    Backoff, ConnectionState, GatewayStatus, HeartbeatScheduler, HeartbeatState, SessionState,
};
use crate::dispatch::Dispatcher;
use crate::error::{GatewayError, GatewayResult};
use crate::events::Event;
use crate::protocol::{CloseCode, GatewayMessage, OpCode};
use crate::transport::{
    Compression, ConnectionTransport, Frame, FrameSink, FrameStream, Inflater,
};

/// Close code for connections we drop but want to resume
const RESUMABLE_CLOSE: u16 = 4000;

/// Close code for a deliberate shutdown; the server ends the session
const NORMAL_CLOSE: u16 = 1000;

/// How long the writer gets to flush before it is aborted
const WRITER_GRACE: Duration = Duration::from_secs(2);

/// Why a connection ended
#[derive(Debug)]
enum Outcome {
    /// Stop for good at the caller's request
    Shutdown,
    /// Connect again and resume if a session survives
    Reconnect {
        code: Option<u16>,
        reason: String,
        immediate: bool,
    },
    /// Drop the session, wait a moment, identify again
    InvalidSession,
    /// Do not reconnect
    Terminal(GatewayError),
}

/// Outcome plus the close frame we owe the server, if we are the side closing
type Exit = (Outcome, Option<(u16, &'static str)>);

/// Per-connection state
struct Link {
    outbound: mpsc::Sender<GatewayMessage>,
    heartbeat: Arc<HeartbeatState>,
    scheduler: Option<HeartbeatScheduler>,
    zombie: Option<oneshot::Sender<()>>,
    ready: bool,
}

pub(crate) struct Runner {
    options: GatewayOptions,
    transport: Arc<dyn ConnectionTransport>,
    resolver: Arc<dyn EndpointResolver>,
    dispatcher: Arc<Dispatcher>,
    session: SessionState,
    backoff: Backoff,
    endpoint: Option<String>,
    status: watch::Sender<GatewayStatus>,
    commands: mpsc::Receiver<GatewayMessage>,
    shutdown: watch::Receiver<bool>,
    ready: Option<oneshot::Sender<GatewayResult<()>>>,
    connected_once: bool,
}

impl Runner {
    pub(crate) fn new(
        options: GatewayOptions,
        transport: Arc<dyn ConnectionTransport>,
        resolver: Arc<dyn EndpointResolver>,
        dispatcher: Arc<Dispatcher>,
        status: watch::Sender<GatewayStatus>,
        commands: mpsc::Receiver<GatewayMessage>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        let backoff = options.backoff.clone();
        Self {
            options,
            transport,
            resolver,
            dispatcher,
            session: SessionState::new(),
            backoff,
            endpoint: None,
            status,
            commands,
            shutdown,
            ready: None,
            connected_once: false,
        }
    }

    /// Resolved once the first Ready/Resumed arrives or the runner gives up
    pub(crate) fn notify_ready(&mut self, tx: oneshot::Sender<GatewayResult<()>>) {
        self.ready = Some(tx);
    }

    pub(crate) async fn run(mut self) {
        loop {
            if self.is_shutting_down() {
                break;
            }

            let outcome = match self.connect_once().await {
                Ok(outcome) => outcome,
                Err(e) if !e.is_retryable() => Outcome::Terminal(e),
                Err(e) => {
                    tracing::warn!(error = %e, "Gateway connection failed");
                    self.endpoint = None;
                    Outcome::Reconnect {
                        code: None,
                        reason: e.to_string(),
                        immediate: false,
                    }
                }
            };

            match outcome {
                Outcome::Shutdown => break,
                Outcome::Terminal(err) => {
                    tracing::error!(error = %err, "Gateway closed for good");
                    let code = match &err {
                        GatewayError::Closed { code, .. } => Some(*code),
                        _ => None,
                    };
                    self.raise_disconnected(code, err.to_string(), true);
                    self.finish_ready(Err(err));
                    break;
                }
                Outcome::Reconnect {
                    code,
                    reason,
                    immediate,
                } => {
                    self.set_state(ConnectionState::Disconnected);
                    self.publish_session();
                    self.raise_disconnected(code, reason, false);
                    if immediate {
                        tracing::info!("Reconnecting immediately");
                        continue;
                    }
                    let delay = self.backoff.next_delay();
                    tracing::info!(
                        delay_ms = delay.as_millis() as u64,
                        attempt = self.backoff.attempts(),
                        resume = self.session.can_resume(),
                        "Reconnecting after backoff"
                    );
                    if !self.pause(delay).await {
                        break;
                    }
                }
                Outcome::InvalidSession => {
                    self.session.invalidate();
                    self.set_state(ConnectionState::Disconnected);
                    self.publish_session();
                    let delay = Duration::from_millis(rand::thread_rng().gen_range(1000..=5000));
                    tracing::info!(
                        delay_ms = delay.as_millis() as u64,
                        "Session invalidated, identifying again"
                    );
                    if !self.pause(delay).await {
                        break;
                    }
                }
            }
        }

        self.finish_ready(Err(GatewayError::ShuttingDown));
        self.set_state(ConnectionState::Terminated);
        tracing::info!("Gateway runner stopped");
    }

    /// One connection from open to drop
    async fn connect_once(&mut self) -> GatewayResult<Outcome> {
        self.set_state(ConnectionState::Connecting);
        let url = self.next_url().await?;
        tracing::info!(url = %url, resume = self.session.can_resume(), "Connecting to gateway");

        let (sink, mut stream) = self.transport.connect(&url).await?;
        self.set_state(ConnectionState::Handshaking);

        let (outbound_tx, outbound_rx) = mpsc::channel(self.options.outbound_buffer.max(1));
        let mut writer = spawn_writer(sink, outbound_rx);
        let (zombie_tx, mut zombie_rx) = oneshot::channel();
        let mut link = Link {
            outbound: outbound_tx,
            heartbeat: Arc::new(HeartbeatState::new(self.session.sequence())),
            scheduler: None,
            zombie: Some(zombie_tx),
            ready: false,
        };
        let mut inflater = Inflater::new(self.options.compression);

        let (outcome, close) = self
            .read_loop(&mut link, &mut stream, &mut inflater, &mut zombie_rx)
            .await;

        if let Some(scheduler) = link.scheduler.take() {
            scheduler.stop();
        }
        drop(link);

        let sink = match tokio::time::timeout(WRITER_GRACE, &mut writer).await {
            Ok(Ok(sink)) => sink,
            Ok(Err(e)) => {
                tracing::debug!(error = %e, "Writer task failed");
                None
            }
            Err(_) => {
                writer.abort();
                None
            }
        };
        if let (Some(mut sink), Some((code, reason))) = (sink, close) {
            if let Err(e) = sink.send(Frame::close(code, reason)).await {
                tracing::debug!(error = %e, "Failed to send close frame");
            }
        }

        Ok(outcome)
    }

    /// Read until the connection should end
    async fn read_loop(
        &mut self,
        link: &mut Link,
        stream: &mut Box<dyn FrameStream>,
        inflater: &mut Inflater,
        zombie_rx: &mut oneshot::Receiver<()>,
    ) -> Exit {
        loop {
            tokio::select! {
                biased;

                _ = self.shutdown.changed() => {
                    tracing::info!("Gateway shutdown requested");
                    return (Outcome::Shutdown, Some((NORMAL_CLOSE, "shutting down")));
                }

                signal = &mut *zombie_rx => {
                    let reason = if signal.is_ok() {
                        "heartbeat not acknowledged"
                    } else {
                        "heartbeat stopped"
                    };
                    tracing::warn!(reason, "Dropping connection");
                    return (
                        Outcome::Reconnect { code: Some(RESUMABLE_CLOSE), reason: reason.to_string(), immediate: false },
                        Some((RESUMABLE_CLOSE, reason)),
                    );
                }

                Some(command) = self.commands.recv(), if link.ready => {
                    if link.outbound.send(command).await.is_err() {
                        return (Self::lost("writer closed"), None);
                    }
                }

                frame = stream.next_frame() => {
                    let frame = match frame {
                        None => return (Self::lost("stream ended"), None),
                        Some(Err(e)) => {
                            tracing::warn!(error = %e, "Gateway read error");
                            return (Self::lost(&e.to_string()), None);
                        }
                        Some(Ok(Frame::Close { code, reason })) => {
                            return (self.on_close(code, reason), None);
                        }
                        Some(Ok(frame)) => frame,
                    };

                    let text = match inflater.push(frame) {
                        Ok(Some(text)) => text,
                        Ok(None) => continue,
                        Err(e) if inflater.mode() == Compression::Stream => {
                            tracing::warn!(error = %e, "Compressed stream corrupted");
                            return (
                                Outcome::Reconnect { code: Some(RESUMABLE_CLOSE), reason: e.to_string(), immediate: false },
                                Some((RESUMABLE_CLOSE, "decode error")),
                            );
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "Dropping undecodable frame");
                            continue;
                        }
                    };

                    let message = match GatewayMessage::from_slice(text.as_bytes()) {
                        Ok(message) => message,
                        Err(e) => {
                            tracing::warn!(error = %e, "Dropping malformed frame");
                            continue;
                        }
                    };

                    if let Some(exit) = self.on_message(link, message).await {
                        return exit;
                    }
                }
            }
        }
    }

    async fn on_message(
        &mut self,
        link: &mut Link,
        message: GatewayMessage,
    ) -> Option<Exit> {
        tracing::trace!(op = %message.op, "Frame received");

        match message.op {
            OpCode::Dispatch => {
                self.on_dispatch(link, message);
                None
            }
            OpCode::Hello => {
                let Some(hello) = message.as_hello() else {
                    tracing::warn!("Hello without a heartbeat interval");
                    return Some((Self::lost("bad hello"), Some((RESUMABLE_CLOSE, "bad hello"))));
                };
                if link.scheduler.is_some() {
                    tracing::warn!("Unexpected Hello mid-session");
                    return None;
                }
                let Some(zombie) = link.zombie.take() else {
                    return None;
                };
                let interval = Duration::from_millis(hello.heartbeat_interval);
                link.scheduler = Some(HeartbeatScheduler::spawn(
                    interval,
                    Arc::clone(&link.heartbeat),
                    link.outbound.clone(),
                    zombie,
                ));

                let auth = match self.session.resume_payload(&self.options.token) {
                    Some(resume) => {
                        tracing::info!(
                            session_id = %resume.session_id,
                            seq = resume.seq,
                            "Resuming session"
                        );
                        GatewayMessage::resume(&resume)
                    }
                    None => {
                        tracing::info!(
                            heartbeat_ms = hello.heartbeat_interval,
                            "Identifying new session"
                        );
                        GatewayMessage::identify(&self.options.identify_payload())
                    }
                };
                if link.outbound.send(auth).await.is_err() {
                    return Some((Self::lost("writer closed"), None));
                }
                None
            }
            OpCode::HeartbeatAck => {
                if let Some(latency) = link.heartbeat.ack() {
                    self.status.send_modify(|status| status.latency = Some(latency));
                }
                None
            }
            OpCode::Heartbeat => {
                let beat = GatewayMessage::heartbeat(self.session.sequence());
                if link.outbound.send(beat).await.is_err() {
                    return Some((Self::lost("writer closed"), None));
                }
                None
            }
            OpCode::Reconnect => {
                tracing::info!("Server requested reconnect");
                Some((
                    Outcome::Reconnect {
                        code: Some(RESUMABLE_CLOSE),
                        reason: "server requested reconnect".to_string(),
                        immediate: true,
                    },
                    Some((RESUMABLE_CLOSE, "reconnect")),
                ))
            }
            OpCode::InvalidSession => {
                let resumable = message.d.as_ref().and_then(Value::as_bool).unwrap_or(false);
                tracing::info!(resumable, "Session invalidated by server");
                Some((Outcome::InvalidSession, Some((NORMAL_CLOSE, "invalid session"))))
            }
            op => {
                tracing::debug!(op = %op, "Ignoring client opcode from server");
                None
            }
        }
    }

    fn on_dispatch(&mut self, link: &mut Link, message: GatewayMessage) {
        if let Some(sequence) = message.s {
            if self.session.observe(sequence) {
                link.heartbeat.set_sequence(sequence);
            }
        }

        let name = message.t.unwrap_or_default();
        let event = match Event::decode(&name, message.d.unwrap_or(Value::Null)) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(event = %name, error = %e, "Dropping undecodable dispatch");
                self.publish_session();
                return;
            }
        };

        match &event {
            Event::Ready(ready) => {
                self.session
                    .establish(ready.session_id.clone(), ready.resume_gateway_url.clone());
                tracing::info!(session_id = %ready.session_id, user = %ready.user.username, "Gateway ready");
                self.on_ready(link);
            }
            Event::Resumed => {
                tracing::info!(session_id = ?self.session.session_id(), "Gateway session resumed");
                self.on_ready(link);
            }
            _ => {}
        }

        self.publish_session();
        self.dispatcher.dispatch(event);
    }

    fn on_ready(&mut self, link: &mut Link) {
        link.ready = true;
        self.backoff.reset();
        let reconnected = std::mem::replace(&mut self.connected_once, true);
        self.status.send_modify(|status| {
            status.state = ConnectionState::Ready;
            if reconnected {
                status.reconnects += 1;
            }
        });
        self.finish_ready(Ok(()));
    }

    fn on_close(&mut self, code: Option<u16>, reason: String) -> Outcome {
        tracing::warn!(code = ?code, reason = %reason, "Gateway closed the connection");

        let Some(code) = code else {
            return Outcome::Reconnect {
                code: None,
                reason,
                immediate: false,
            };
        };
        if CloseCode::is_terminal_code(code) {
            return Outcome::Terminal(GatewayError::closed(code, reason));
        }
        if CloseCode::from_u16(code).is_some_and(CloseCode::invalidates_session) {
            self.session.invalidate();
        }
        Outcome::Reconnect {
            code: Some(code),
            reason,
            immediate: false,
        }
    }

    fn lost(reason: &str) -> Outcome {
        Outcome::Reconnect {
            code: None,
            reason: reason.to_string(),
            immediate: false,
        }
    }

    async fn next_url(&mut self) -> GatewayResult<String> {
        let base = match self.session.resume_url().filter(|_| self.session.can_resume()) {
            Some(url) => url.to_string(),
            None => match &self.endpoint {
                Some(endpoint) => endpoint.clone(),
                None => {
                    let endpoint = self.resolver.resolve().await?;
                    self.endpoint = Some(endpoint.clone());
                    endpoint
                }
            },
        };
        connect_url(&base, self.options.version, self.options.compression)
    }

    /// Sleep unless shutdown comes first; `false` means stop
    async fn pause(&mut self, delay: Duration) -> bool {
        tokio::select! {
            () = tokio::time::sleep(delay) => true,
            _ = self.shutdown.changed() => false,
        }
    }

    fn is_shutting_down(&self) -> bool {
        *self.shutdown.borrow() || self.shutdown.has_changed().is_err()
    }

    fn raise_disconnected(&self, code: Option<u16>, reason: String, terminal: bool) {
        self.dispatcher.dispatch(Event::Disconnected {
            code,
            reason,
            terminal,
        });
    }

    fn finish_ready(&mut self, result: GatewayResult<()>) {
        if let Some(tx) = self.ready.take() {
            let _ = tx.send(result);
        }
    }

    fn set_state(&self, state: ConnectionState) {
        self.status.send_modify(|status| status.state = state);
    }

    fn publish_session(&self) {
        let session_id = self.session.session_id().map(str::to_string);
        let sequence = self.session.sequence();
        self.status.send_modify(|status| {
            status.session_id = session_id;
            status.sequence = sequence;
        });
    }
}

/// Drain outbound messages into the sink; hands the sink back once the
/// channel closes so a close frame can follow.
fn spawn_writer(
    mut sink: Box<dyn FrameSink>,
    mut outbound: mpsc::Receiver<GatewayMessage>,
) -> JoinHandle<Option<Box<dyn FrameSink>>> {
    tokio::spawn(async move {
        while let Some(message) = outbound.recv().await {
            let json = match message.to_json() {
                Ok(json) => json,
                Err(e) => {
                    tracing::error!(op = %message.op, error = %e, "Failed to encode frame");
                    continue;
                }
            };
            if let Err(e) = sink.send(Frame::Text(json)).await {
                tracing::debug!(error = %e, "Writer stopped");
                return None;
            }
        }
        Some(sink)
    })
}
