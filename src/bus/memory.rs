//! In-memory dispatch bus.

use super::error::{BusError, RegistryError};
use super::registry::{Symbol, SymbolRegistry};
use super::{DispatchBus, Handler};
use crate::core::{Event, SubscriptionId};
use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::trace;

/// Synchronous publish/subscribe bus keyed by [`Symbol`]s.
///
/// Handlers run on the caller's stack, in the order they subscribed. The
/// handler list is copied before delivery, so a handler may subscribe,
/// unsubscribe or dispatch without deadlocking the bus. Delivery stops at the
/// first handler that returns an error.
#[derive(Default)]
pub struct Dispatcher {
    handlers: Mutex<Vec<(SubscriptionId, Handler<Symbol>)>>,
    registry: SymbolRegistry,
    closed: AtomicBool,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bus using an existing registry.
    pub fn with_registry(registry: SymbolRegistry) -> Self {
        Self {
            registry,
            ..Self::default()
        }
    }

    /// Shorthand for `registry().symbol_for(key)`.
    pub fn symbol_for(&self, key: &str) -> Result<Symbol, RegistryError> {
        self.registry.symbol_for(key)
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.handlers().len()
    }

    /// Reject every later dispatch with [`BusError::Closed`].
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn handlers(&self) -> MutexGuard<'_, Vec<(SubscriptionId, Handler<Symbol>)>> {
        self.handlers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("subscribers", &self.subscriber_count())
            .field("registry", &self.registry)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl DispatchBus for Dispatcher {
    type Action = Symbol;
    type Registry = SymbolRegistry;

    fn dispatch(&self, action: Symbol, data: Value) -> Result<(), BusError> {
        if self.is_closed() {
            return Err(BusError::Closed);
        }

        let handlers: Vec<Handler<Symbol>> = self
            .handlers()
            .iter()
            .map(|(_, handler)| handler.clone())
            .collect();
        trace!(action = ?action, subscribers = handlers.len(), "dispatch");

        let event = Event::new(action, data);
        handlers.iter().try_for_each(|handler| handler(&event))
    }

    fn subscribe(&self, handler: Handler<Symbol>) -> SubscriptionId {
        let id = SubscriptionId::new();
        self.handlers().push((id, handler));
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers();
        let before = handlers.len();
        handlers.retain(|(existing, _)| *existing != id);
        handlers.len() != before
    }

    fn registry(&self) -> &SymbolRegistry {
        &self.registry
    }
}
