//! Named-event publish/subscribe
//!
//! Handlers for a name run synchronously in registration order. A panicking
//! handler is caught and logged; later handlers and the publisher continue.

use std::any::Any;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Name of the diagnostic event published in debug mode
pub const DEBUG_EVENT: &str = "DEBUG";

type Handler<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Event published by the gateway session
///
/// `data` is the dispatch payload exactly as received; `sequence` is the
/// frame's `s`, absent for diagnostic events.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayEvent {
    pub name: String,
    pub sequence: Option<u64>,
    pub data: Value,
}

impl GatewayEvent {
    pub fn new(name: impl Into<String>, sequence: Option<u64>, data: Value) -> Self {
        Self {
            name: name.into(),
            sequence,
            data,
        }
    }

    /// Decode the payload into a typed value
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.data)
    }
}

/// Handle returned by [`EventBus::subscribe`], used to unsubscribe
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Subscription {
    name: String,
    id: u64,
}

impl Subscription {
    /// Event name this subscription listens to
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Publish/subscribe registry keyed by event name
pub struct EventBus<T> {
    handlers: RwLock<HashMap<String, Vec<(u64, Handler<T>)>>>,
    next_id: AtomicU64,
}

impl<T> Default for EventBus<T> {
    fn default() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }
}

impl<T> std::fmt::Debug for EventBus<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let handlers = self.handlers.read();
        f.debug_struct("EventBus")
            .field("events", &handlers.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl<T> EventBus<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for `name`
    pub fn subscribe<F>(&self, name: impl Into<String>, handler: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let name = name.into();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        self.handlers
            .write()
            .entry(name.clone())
            .or_default()
            .push((id, Arc::new(handler)));

        tracing::trace!(event = %name, subscription = id, "Handler subscribed");
        Subscription { name, id }
    }

    /// Remove exactly the handler registered by `subscription`
    ///
    /// Returns `false` if it was already removed.
    pub fn unsubscribe(&self, subscription: &Subscription) -> bool {
        let mut handlers = self.handlers.write();
        let Some(list) = handlers.get_mut(&subscription.name) else {
            return false;
        };

        let before = list.len();
        list.retain(|(id, _)| *id != subscription.id);
        let removed = list.len() != before;

        if list.is_empty() {
            handlers.remove(&subscription.name);
        }
        removed
    }

    /// Invoke every handler registered for `name` with `payload`
    ///
    /// Returns the number of handlers that completed without panicking.
    pub fn publish(&self, name: &str, payload: &T) -> usize {
        // Snapshot so handlers may subscribe or unsubscribe while running
        let snapshot: Vec<(u64, Handler<T>)> = match self.handlers.read().get(name) {
            Some(list) => list.clone(),
            None => return 0,
        };

        let mut completed = 0;
        for (id, handler) in snapshot {
            match catch_unwind(AssertUnwindSafe(|| handler(payload))) {
                Ok(()) => completed += 1,
                Err(panic) => {
                    tracing::error!(
                        event = %name,
                        subscription = id,
                        panic = %panic_message(panic.as_ref()),
                        "Event handler panicked"
                    );
                }
            }
        }
        completed
    }

    /// Number of handlers registered for `name`
    pub fn handler_count(&self, name: &str) -> usize {
        self.handlers.read().get(name).map_or(0, Vec::len)
    }

    /// Remove every handler
    pub fn clear(&self) {
        self.handlers.write().clear();
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}
