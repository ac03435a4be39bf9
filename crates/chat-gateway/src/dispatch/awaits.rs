//! Awaits
//!
//! Keyed, short-lived listeners. An await fires on the first event of its exact
//! kind that satisfies its predicate and is then removed, unless its callback
//! asks to keep listening. Registering under an existing key replaces the old
//! await.

use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::panic::{catch_unwind, AssertUnwindSafe};

use super::predicate::Predicate;
use crate::events::{Event, EventKind};

/// What an await callback wants after a match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AwaitOutcome {
    /// Remove the await
    Done,
    /// Keep listening for further matches
    Keep,
}

/// Callback run synchronously on the dispatching task
pub type AwaitCallback = Box<dyn Fn(&Event) -> AwaitOutcome + Send + Sync>;

struct Await {
    kind: EventKind,
    predicate: Predicate,
    callback: Option<AwaitCallback>,
}

impl Await {
    fn matches(&self, event: &Event) -> bool {
        event.kind() == self.kind && self.predicate.matches(event)
    }

    fn fire(&self, key: &str, event: &Event) -> AwaitOutcome {
        let Some(callback) = &self.callback else {
            return AwaitOutcome::Done;
        };
        match catch_unwind(AssertUnwindSafe(|| callback(event))) {
            Ok(outcome) => outcome,
            Err(_) => {
                tracing::error!(key = %key, kind = %self.kind, "Await callback panicked");
                AwaitOutcome::Done
            }
        }
    }
}

#[derive(Default)]
struct Entries {
    pending: HashMap<String, Await>,
    /// Keys whose callbacks are running right now
    firing: HashSet<String>,
    /// Firing keys removed by a caller; they must not come back on `Keep`
    cancelled: HashSet<String>,
}

/// Registry of pending awaits
#[derive(Default)]
pub struct AwaitRegistry {
    entries: Mutex<Entries>,
}

impl AwaitRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the await at `key`. Returns true if one was replaced.
    pub fn register(
        &self,
        key: impl Into<String>,
        kind: EventKind,
        predicate: Predicate,
        callback: Option<AwaitCallback>,
    ) -> bool {
        let key = key.into();
        tracing::debug!(key = %key, kind = %kind, "Await registered");
        self.entries
            .lock()
            .pending
            .insert(
                key,
                Await {
                    kind,
                    predicate,
                    callback,
                },
            )
            .is_some()
    }

    /// Drop the await at `key`. A callback running under that key will not
    /// put it back even if it returns `Keep`.
    pub fn remove(&self, key: &str) -> bool {
        let mut entries = self.entries.lock();
        let removed = entries.pending.remove(key).is_some();
        if entries.firing.contains(key) {
            entries.cancelled.insert(key.to_string());
            return true;
        }
        removed
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().pending.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().pending.is_empty()
    }

    /// Run every matching await against `event`; returns the matched keys.
    ///
    /// Matching entries are taken out before their callbacks run, so a
    /// callback may register or remove awaits. A `Keep` entry goes back in
    /// only if its key was neither re-registered nor removed meanwhile.
    pub fn process(&self, event: &Event) -> Vec<String> {
        let matched: Vec<(String, Await)> = {
            let mut entries = self.entries.lock();
            let keys: Vec<String> = entries
                .pending
                .iter()
                .filter(|(_, entry)| entry.matches(event))
                .map(|(key, _)| key.clone())
                .collect();
            let matched: Vec<(String, Await)> = keys
                .into_iter()
                .filter_map(|key| entries.pending.remove(&key).map(|entry| (key, entry)))
                .collect();
            entries
                .firing
                .extend(matched.iter().map(|(key, _)| key.clone()));
            matched
        };

        let mut keys = Vec::with_capacity(matched.len());
        for (key, entry) in matched {
            let outcome = entry.fire(&key, event);
            tracing::trace!(key = %key, outcome = ?outcome, "Await matched");

            let mut entries = self.entries.lock();
            entries.firing.remove(&key);
            let cancelled = entries.cancelled.remove(&key);
            if outcome == AwaitOutcome::Keep && !cancelled {
                entries.pending.entry(key.clone()).or_insert(entry);
            }
            drop(entries);
            keys.push(key);
        }
        keys
    }
}

impl std::fmt::Debug for AwaitRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwaitRegistry")
            .field("pending", &self.len())
            .finish()
    }
}
