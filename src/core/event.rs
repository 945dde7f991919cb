//! A single captured dispatch.

use serde_json::Value;

/// One `(action, data)` pair observed on a dispatch bus.
///
/// Events are plain values: once appended to an [`EventLog`](super::EventLog)
/// they are never modified, only cloned out for replay or serialization.
///
/// # Example
///
/// ```rust
/// use dispatch_recorder::core::Event;
/// use serde_json::json;
///
/// let event = Event::new("increment", json!(1));
/// assert_eq!(event.action, "increment");
/// assert_eq!(event.data, json!(1));
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Event<A> {
    /// Opaque identifier naming the kind of action
    pub action: A,
    /// Payload exactly as it was dispatched
    pub data: Value,
}

impl<A> Event<A> {
    /// Create an event from an action identifier and its payload.
    pub fn new(action: A, data: Value) -> Self {
        Self { action, data }
    }

    /// Split the event back into the pair a bus dispatches.
    pub fn into_parts(self) -> (A, Value) {
        (self.action, self.data)
    }
}
