//! Re-emitting a recorded event log onto a dispatch bus.
//!
//! Two modes are supported:
//!
//! - **Immediate**: every event is dispatched synchronously, back to back,
//!   before the call returns.
//! - **Delayed**: a [`ReplaySchedule`] holds the events as an ordered queue of
//!   steps and a tokio task works through it, waiting the configured delay
//!   before each dispatch. The returned [`ReplayHandle`] can inspect the steps
//!   still pending and cancel them.

mod schedule;

pub use schedule::{ReplayHandle, ReplayOutcome, ReplaySchedule};

use crate::bus::{BusError, DispatchBus};
use crate::core::Event;
use tracing::{info, warn};

/// Callback run once a replay has dispatched its last event.
pub type ReplayDone = Box<dyn FnOnce() + Send + 'static>;

/// Result of starting a replay
#[derive(Debug)]
pub enum Replay<A> {
    /// Every event was dispatched before `replay` returned
    Completed { dispatched: usize },

    /// Events are being dispatched in the background
    Scheduled(ReplayHandle<A>),
}

impl<A> Replay<A> {
    /// Handle of a delayed replay, `None` for one that already completed.
    pub fn into_handle(self) -> Option<ReplayHandle<A>> {
        match self {
            Self::Scheduled(handle) => Some(handle),
            Self::Completed { .. } => None,
        }
    }
}

/// Errors that can occur when starting or running a replay
#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("Cannot replay while recording: replayed dispatches would be captured again")]
    WhileRecording,

    #[error("Dispatch of event {index} failed: {source}")]
    Dispatch {
        index: usize,
        #[source]
        source: BusError,
    },

    #[error("Delayed replay requires a running tokio runtime")]
    NoRuntime,
}

/// Dispatch `events` in order on `bus`, stopping at the first failure.
pub fn replay_now<B: DispatchBus>(
    bus: &B,
    events: Vec<Event<B::Action>>,
) -> Result<usize, ReplayError> {
    let total = events.len();
    info!(events = total, "replaying immediately");

    for (index, event) in events.into_iter().enumerate() {
        let (action, data) = event.into_parts();
        if let Err(source) = bus.dispatch(action, data) {
            warn!(index, error = %source, "replay dispatch failed");
            return Err(ReplayError::Dispatch { index, source });
        }
    }

    Ok(total)
}
