//! Heartbeat scheduler
//!
//! One task per connection. Each tick either sends a heartbeat or, when the
//! previous one was never acknowledged, reports the connection as a zombie and
//! stops.

use parking_lot::Mutex;
use rand::Rng;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::protocol::GatewayMessage;

/// Longest heartbeat interval accepted from Hello
const MAX_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// State shared between the runner and the heartbeat task
#[derive(Debug)]
pub struct HeartbeatState {
    acked: AtomicBool,
    /// 0 until the first dispatch; real sequences start at 1
    sequence: AtomicU64,
    last_sent: Mutex<Option<Instant>>,
    latency: Mutex<Option<Duration>>,
}

impl HeartbeatState {
    pub fn new(sequence: Option<u64>) -> Self {
        Self {
            acked: AtomicBool::new(true),
            sequence: AtomicU64::new(sequence.unwrap_or(0)),
            last_sent: Mutex::new(None),
            latency: Mutex::new(None),
        }
    }

    pub fn set_sequence(&self, sequence: u64) {
        self.sequence.store(sequence, Ordering::SeqCst);
    }

    pub fn sequence(&self) -> Option<u64> {
        match self.sequence.load(Ordering::SeqCst) {
            0 => None,
            n => Some(n),
        }
    }

    pub fn is_acked(&self) -> bool {
        self.acked.load(Ordering::SeqCst)
    }

    /// Record a heartbeat ack; returns the round trip if a beat was pending
    pub fn ack(&self) -> Option<Duration> {
        self.acked.store(true, Ordering::SeqCst);
        let sent = (*self.last_sent.lock())?;
        let latency = sent.elapsed();
        *self.latency.lock() = Some(latency);
        Some(latency)
    }

    pub fn latency(&self) -> Option<Duration> {
        *self.latency.lock()
    }

    /// Claim the ack for a new beat. `false` means the last one went unanswered.
    fn begin_beat(&self) -> bool {
        self.acked.swap(false, Ordering::SeqCst)
    }

    fn mark_sent(&self) {
        *self.last_sent.lock() = Some(Instant::now());
    }
}

/// Handle to a running heartbeat task; aborts it on drop
#[derive(Debug)]
pub struct HeartbeatScheduler {
    handle: JoinHandle<()>,
}

impl HeartbeatScheduler {
    /// Start beating every `interval`. The first beat is jittered within one interval.
    pub fn spawn(
        interval: Duration,
        state: Arc<HeartbeatState>,
        outbound: mpsc::Sender<GatewayMessage>,
        zombie: oneshot::Sender<()>,
    ) -> Self {
        let interval = interval.clamp(Duration::from_millis(1), MAX_INTERVAL);
        let first = interval.mul_f64(rand::thread_rng().gen_range(0.0..1.0));
        let handle = tokio::spawn(run(first, interval, state, outbound, zombie));
        Self { handle }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn stop(self) {
        self.handle.abort();
    }
}

impl Drop for HeartbeatScheduler {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn run(
    first: Duration,
    interval: Duration,
    state: Arc<HeartbeatState>,
    outbound: mpsc::Sender<GatewayMessage>,
    zombie: oneshot::Sender<()>,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + first, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        if !state.begin_beat() {
            tracing::warn!(
                interval_ms = interval.as_millis() as u64,
                "Heartbeat not acknowledged, connection is a zombie"
            );
            let _ = zombie.send(());
            return;
        }

        let sequence = state.sequence();
        if outbound.send(GatewayMessage::heartbeat(sequence)).await.is_err() {
            tracing::debug!("Outbound channel closed, stopping heartbeat");
            return;
        }
        state.mark_sent();

        tracing::trace!(sequence = ?sequence, "Heartbeat sent");
    }
}
