//! Dispatch recorder: capture, replay and persist the traffic of an action bus
//!
//! A [`Recorder`] subscribes to a publish/subscribe dispatch bus, buffers every
//! `(action, data)` pair it sees in order, and can later put the same sequence
//! back on the bus, either all at once or spaced out in time. The buffer can be
//! written out as JSON and loaded back, so a session recorded in one process
//! can be replayed in another.
//!
//! # Core Concepts
//!
//! - **Bus**: anything implementing [`DispatchBus`]; [`Dispatcher`] is an in-memory one
//! - **Event Log**: the ordered buffer of captured pairs
//! - **Replay**: immediate, or delayed through a cancellable [`ReplayHandle`]
//! - **Serialization**: a JSON array of `{"action", "data"}` records, actions
//!   written as their registry keys
//!
//! # Example
//!
//! ```rust
//! use dispatch_recorder::{DispatchBus, Dispatcher, Recorder, Replay};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let bus = Arc::new(Dispatcher::new());
//! let inc = bus.symbol_for("inc").unwrap();
//!
//! let mut recorder = Recorder::new(Arc::clone(&bus));
//! recorder.record();
//! bus.dispatch(inc.clone(), json!(1)).unwrap();
//! bus.dispatch(inc, json!(2)).unwrap();
//! recorder.stop();
//!
//! let saved = recorder.serialize_events().unwrap();
//!
//! let mut other = Recorder::new(Arc::clone(&bus));
//! other.load_events(&saved).unwrap();
//! let replay = other.replay(None, None).unwrap();
//!
//! assert!(matches!(replay, Replay::Completed { dispatched: 2 }));
//! ```

pub mod bus;
pub mod core;
pub mod recorder;
pub mod replay;
pub mod serialize;

// Re-export commonly used types
pub use bus::{ActionRegistry, BusError, DispatchBus, Dispatcher, Symbol, SymbolRegistry};
pub use crate::core::{Event, EventLog};
pub use recorder::{Recorder, RecorderConfig, ReplayGuard};
pub use replay::{Replay, ReplayDone, ReplayError, ReplayHandle, ReplayOutcome};
pub use serialize::{RecordingCheckpoint, SerializeError};
