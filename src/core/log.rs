//! Ordered buffer of captured events.
//!
//! The log is shared between the recorder and the handler it registers on the
//! bus, so it lives behind an `Arc<Mutex<_>>`. Readers always take a cloned
//! snapshot; no caller holds the lock while dispatching.

use super::event::Event;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Ordered, shared sequence of [`Event`]s.
///
/// Cloning an `EventLog` yields another handle to the same buffer.
///
/// # Example
///
/// ```rust
/// use dispatch_recorder::core::{Event, EventLog};
/// use serde_json::json;
///
/// let log = EventLog::new();
/// let writer = log.clone();
///
/// writer.append(Event::new("a", json!(1)));
/// writer.append(Event::new("b", json!(2)));
///
/// let actions: Vec<_> = log.snapshot().into_iter().map(|e| e.action).collect();
/// assert_eq!(actions, vec!["a", "b"]);
/// ```
#[derive(Debug)]
pub struct EventLog<A> {
    events: Arc<Mutex<Vec<Event<A>>>>,
}

impl<A> Clone for EventLog<A> {
    fn clone(&self) -> Self {
        Self {
            events: Arc::clone(&self.events),
        }
    }
}

impl<A> Default for EventLog<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> EventLog<A> {
    /// Create an empty log.
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Append an event at the end of the log.
    pub fn append(&self, event: Event<A>) {
        self.lock().push(event);
    }

    /// Remove every event.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Replace the whole content of the log.
    pub fn replace(&self, events: Vec<Event<A>>) {
        *self.lock() = events;
    }

    /// Number of events currently held.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the log holds no events.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A panicking bus handler must not make the log unreadable.
    fn lock(&self) -> MutexGuard<'_, Vec<Event<A>>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<A: Clone> EventLog<A> {
    /// Copy of the events in insertion order.
    pub fn snapshot(&self) -> Vec<Event<A>> {
        self.lock().clone()
    }
}
