//! The dispatch bus the recorder plugs into.
//!
//! The recorder never depends on a concrete bus. It needs two capabilities:
//!
//! - **`DispatchBus`**: dispatch a pair, subscribe a handler, unsubscribe it
//! - **`ActionRegistry`**: translate an action handle to a stable text key and back
//!
//! `Dispatcher` and `SymbolRegistry` are a ready-made in-memory pair
//! implementing both.

mod error;
pub mod memory;
pub mod registry;

pub use error::{BusError, RegistryError};
pub use memory::Dispatcher;
pub use registry::{Symbol, SymbolRegistry};

use crate::core::{Event, SubscriptionId};
use serde_json::Value;
use std::fmt::Debug;
use std::sync::Arc;

/// Callback invoked synchronously for every dispatched event.
pub type Handler<A> = Arc<dyn Fn(&Event<A>) -> Result<(), BusError> + Send + Sync>;

/// Two-way mapping between action handles and stable text keys.
pub trait ActionRegistry: Send + Sync {
    type Action;

    /// Resolve `key` to its handle, registering it if absent.
    ///
    /// Fails only when the registry refuses new registrations.
    fn lookup(&self, key: &str) -> Result<Self::Action, RegistryError>;

    /// Key under which `action` is registered, or `None` for local handles.
    fn key_of(&self, action: &Self::Action) -> Option<String>;
}

/// Publish/subscribe bus broadcasting `(action, data)` pairs.
///
/// # Example
///
/// ```rust
/// use dispatch_recorder::bus::{Dispatcher, DispatchBus, Symbol};
/// use dispatch_recorder::core::Event;
/// use serde_json::json;
/// use std::sync::{Arc, Mutex};
///
/// let bus = Dispatcher::new();
/// let seen = Arc::new(Mutex::new(Vec::new()));
///
/// let sink = Arc::clone(&seen);
/// let id = bus.subscribe(Arc::new(move |event: &Event<Symbol>| {
///     sink.lock().unwrap().push(event.data.clone());
///     Ok(())
/// }));
///
/// let inc = bus.symbol_for("inc").unwrap();
/// bus.dispatch(inc, json!(1)).unwrap();
/// assert!(bus.unsubscribe(id));
///
/// assert_eq!(*seen.lock().unwrap(), vec![json!(1)]);
/// ```
pub trait DispatchBus: Send + Sync + 'static {
    type Action: Clone + PartialEq + Debug + Send + Sync + 'static;
    type Registry: ActionRegistry<Action = Self::Action>;

    /// Deliver a pair to every current subscriber, in subscription order.
    fn dispatch(&self, action: Self::Action, data: Value) -> Result<(), BusError>;

    fn subscribe(&self, handler: Handler<Self::Action>) -> SubscriptionId;

    /// Remove a subscription. Returns `false` if the id was unknown.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;

    fn registry(&self) -> &Self::Registry;
}
