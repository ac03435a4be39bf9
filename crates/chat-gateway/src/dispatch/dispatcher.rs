//! Event dispatcher
//!
//! Fans decoded events out to registered handlers. Every registration owns a
//! worker task fed by a bounded queue, so a slow handler only delays itself and
//! each handler sees events in arrival order.

use futures::FutureExt;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

use super::awaits::{AwaitCallback, AwaitOutcome, AwaitRegistry};
use super::predicate::Predicate;
use crate::events::{Event, EventKind};

/// Boxed future returned by handlers
pub type HandlerFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;

type Handler = Arc<dyn Fn(Arc<Event>) -> HandlerFuture + Send + Sync>;

/// Configuration for the dispatcher
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Events buffered per handler before new ones are dropped
    pub handler_queue: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self { handler_queue: 256 }
    }
}

/// Identifies a registered handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Registration(u64);

impl Registration {
    pub fn id(self) -> u64 {
        self.0
    }
}

struct Entry {
    kind: EventKind,
    predicate: Predicate,
    queue: mpsc::Sender<Arc<Event>>,
}

/// Routes events to handlers and awaits
pub struct Dispatcher {
    config: DispatcherConfig,
    next_id: AtomicU64,
    handlers: RwLock<HashMap<u64, Entry>>,
    awaits: AwaitRegistry,
}

impl Dispatcher {
    pub fn new(config: DispatcherConfig) -> Self {
        Self {
            config,
            next_id: AtomicU64::new(1),
            handlers: RwLock::new(HashMap::new()),
            awaits: AwaitRegistry::new(),
        }
    }

    /// Register a handler. Must be called inside a Tokio runtime.
    pub fn register<F, Fut>(&self, kind: EventKind, predicate: Predicate, handler: F) -> Registration
    where
        F: Fn(Arc<Event>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let handler: Handler = Arc::new(move |event: Arc<Event>| Box::pin(handler(event)) as HandlerFuture);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.config.handler_queue.max(1));
        tokio::spawn(run_handler(id, kind, handler, rx));

        self.handlers.write().insert(
            id,
            Entry {
                kind,
                predicate,
                queue: tx,
            },
        );

        tracing::debug!(handler = id, kind = %kind, "Handler registered");
        Registration(id)
    }

    /// Remove a handler. Events already queued for it are still delivered.
    pub fn remove(&self, registration: Registration) -> bool {
        let removed = self.handlers.write().remove(&registration.0);
        if removed.is_some() {
            tracing::debug!(handler = registration.0, "Handler removed");
        }
        removed.is_some()
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.read().len()
    }

    pub fn awaits(&self) -> &AwaitRegistry {
        &self.awaits
    }

    /// Register an await; see [`AwaitRegistry::register`]
    pub fn await_once(
        &self,
        key: impl Into<String>,
        kind: EventKind,
        predicate: Predicate,
        callback: Option<AwaitCallback>,
    ) -> bool {
        self.awaits.register(key, kind, predicate, callback)
    }

    /// Resolve with the next matching event, or `None` after `timeout`
    pub async fn wait_for(
        &self,
        kind: EventKind,
        predicate: Predicate,
        timeout: Duration,
    ) -> Option<Event> {
        let key = format!("wait_for:{}", self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = oneshot::channel();
        let slot = parking_lot::Mutex::new(Some(tx));

        let callback: AwaitCallback = Box::new(move |event: &Event| {
            if let Some(tx) = slot.lock().take() {
                let _ = tx.send(event.clone());
            }
            AwaitOutcome::Done
        });
        self.awaits.register(key.clone(), kind, predicate, Some(callback));

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(event)) => Some(event),
            _ => {
                self.awaits.remove(&key);
                None
            }
        }
    }

    /// Deliver an event: awaits first, then handlers, then one
    /// `AwaitMatched` per await that fired. Returns the number of handler
    /// queues the event itself reached.
    pub fn dispatch(&self, event: Event) -> usize {
        let matched = if event.kind() == EventKind::AwaitMatched {
            Vec::new()
        } else {
            self.awaits.process(&event)
        };

        let event = Arc::new(event);
        let delivered = self.fan_out(&event);

        for key in matched {
            let raised = Arc::new(Event::AwaitMatched {
                key,
                event: Box::new((*event).clone()),
            });
            self.fan_out(&raised);
        }

        delivered
    }

    fn fan_out(&self, event: &Arc<Event>) -> usize {
        let kind = event.kind();
        let handlers = self.handlers.read();
        let mut delivered = 0;

        for (id, entry) in handlers.iter() {
            if entry.kind != kind || !entry.predicate.matches(event) {
                continue;
            }
            match entry.queue.try_send(Arc::clone(event)) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!(handler = id, kind = %kind, "Handler queue full, dropping event");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    tracing::debug!(handler = id, kind = %kind, "Handler worker gone");
                }
            }
        }

        delivered
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(DispatcherConfig::default())
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("config", &self.config)
            .field("handlers", &self.handler_count())
            .field("awaits", &self.awaits.len())
            .finish()
    }
}

async fn run_handler(
    id: u64,
    kind: EventKind,
    handler: Handler,
    mut queue: mpsc::Receiver<Arc<Event>>,
) {
    while let Some(event) = queue.recv().await {
        let future = match catch_unwind(AssertUnwindSafe(|| handler(event))) {
            Ok(future) => future,
            Err(panic) => {
                tracing::error!(
                    handler = id,
                    kind = %kind,
                    panic = %panic_message(&*panic),
                    "Event handler panicked"
                );
                continue;
            }
        };

        match AssertUnwindSafe(future).catch_unwind().await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!(
                    handler = id,
                    kind = %kind,
                    error = %format!("{e:#}"),
                    "Event handler failed"
                );
            }
            Err(panic) => {
                tracing::error!(
                    handler = id,
                    kind = %kind,
                    panic = %panic_message(&*panic),
                    "Event handler panicked"
                );
            }
        }
    }

    tracing::trace!(handler = id, "Handler worker stopped");
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
