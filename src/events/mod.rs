//! Synchronous in-process publish/subscribe.
//!
//! The bus decouples the scheduler and actors from observers such as
//! dashboards and metric sinks. Publishing builds an immutable [`Event`] and
//! invokes every matching handler in registration order: first the handlers
//! subscribed to that kind, then the wildcard handlers.
//!
//! A handler that returns an error or panics is logged and skipped. It never
//! stops later handlers and never reaches the publisher.

mod kind;

pub use kind::EventKind;

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

/// Failure reported by an event handler.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct HandlerError(pub String);

impl HandlerError {
    /// Create a handler error from a message
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Immutable event record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Unique event id
    pub id: Uuid,
    /// Event kind
    pub kind: EventKind,
    /// Event payload
    pub payload: Value,
    /// Virtual timestamp
    pub timestamp: f64,
}

/// Event handler callback.
pub type Handler = Arc<dyn Fn(&Event) -> Result<(), HandlerError> + Send + Sync>;

/// Publish/subscribe hub.
///
/// Cloning the bus shares the same subscriber lists.
#[derive(Clone, Default)]
pub struct EventBus {
    subscribers: Arc<RwLock<HashMap<EventKind, Vec<Handler>>>>,
    wildcard: Arc<RwLock<Vec<Handler>>>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("wildcard", &self.wildcard_count())
            .finish_non_exhaustive()
    }
}

impl EventBus {
    /// Create an empty bus
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for one event kind
    pub fn subscribe<F>(&self, kind: EventKind, handler: F)
    where
        F: Fn(&Event) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        let mut subscribers = self
            .subscribers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        subscribers.entry(kind).or_default().push(Arc::new(handler));
    }

    /// Register a handler for every event kind
    pub fn subscribe_all<F>(&self, handler: F)
    where
        F: Fn(&Event) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        let mut wildcard = self
            .wildcard
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        wildcard.push(Arc::new(handler));
    }

    /// Number of wildcard handlers
    pub fn wildcard_count(&self) -> usize {
        self.wildcard
            .read()
            .map(|w| w.len())
            .unwrap_or_else(|poisoned| poisoned.into_inner().len())
    }

    /// Publish an event and return the record that was delivered.
    pub fn publish(&self, kind: EventKind, payload: Value, timestamp: f64) -> Event {
        let event = Event {
            id: Uuid::new_v4(),
            kind,
            payload,
            timestamp,
        };
        tracing::debug!(kind = %kind, timestamp, "Event published");

        // Snapshot the handler lists so handlers may subscribe without deadlocking
        let specific: Vec<Handler> = self
            .subscribers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&kind)
            .cloned()
            .unwrap_or_default();
        let wildcard: Vec<Handler> = self
            .wildcard
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();

        for handler in &specific {
            invoke(handler, &event, "event handler");
        }
        for handler in &wildcard {
            invoke(handler, &event, "wildcard handler");
        }

        event
    }
}

fn invoke(handler: &Handler, event: &Event, label: &str) {
    match catch_unwind(AssertUnwindSafe(|| handler(event))) {
        Ok(Ok(())) => {},
        Ok(Err(e)) => {
            tracing::error!(kind = %event.kind, error = %e, "Error in {}", label);
        },
        Err(panic) => {
            let msg = panic
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            tracing::error!(kind = %event.kind, panic = %msg, "Panic in {}", label);
        },
    }
}
