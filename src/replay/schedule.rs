//! Timer-driven replay of an ordered queue of steps.

use super::{ReplayDone, ReplayError};
use crate::bus::{BusError, DispatchBus};
use crate::core::Event;
use std::any::Any;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

type Steps<A> = Arc<Mutex<VecDeque<Event<A>>>>;

/// How a delayed replay ended
#[derive(Debug, Clone, PartialEq)]
pub enum ReplayOutcome {
    /// Every step ran and the completion callback was invoked
    Completed { dispatched: usize },

    /// Cancelled before the remaining steps could run
    Cancelled { dispatched: usize, remaining: usize },

    /// A dispatch returned an error; later steps were dropped without retry
    Failed { dispatched: usize, error: BusError },

    /// A bus handler panicked while a step was dispatching
    Panicked { dispatched: usize, message: String },
}

impl ReplayOutcome {
    /// Number of events that reached the bus.
    pub fn dispatched(&self) -> usize {
        match self {
            Self::Completed { dispatched }
            | Self::Cancelled { dispatched, .. }
            | Self::Failed { dispatched, .. }
            | Self::Panicked { dispatched, .. } => *dispatched,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

/// Ordered queue of pending replay steps, one per event.
///
/// Step *k* waits `delay`, dispatches event *k*, then hands over to step
/// *k + 1*. Event *k* therefore reaches the bus roughly `(k + 1) * delay`
/// after the schedule starts.
pub struct ReplaySchedule<A> {
    steps: VecDeque<Event<A>>,
    delay: Duration,
    in_flight: Option<Arc<AtomicUsize>>,
}

impl<A> ReplaySchedule<A> {
    pub fn new(events: Vec<Event<A>>, delay: Duration) -> Self {
        Self {
            steps: events.into(),
            delay,
            in_flight: None,
        }
    }

    /// Hold `counter` one higher from `spawn` until the replay task ends,
    /// whichever way it ends.
    pub fn tracked(mut self, counter: Arc<AtomicUsize>) -> Self {
        self.in_flight = Some(counter);
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl<A: Clone + Send + Sync + 'static> ReplaySchedule<A> {
    /// Start working through the steps on the current tokio runtime.
    pub fn spawn<B>(
        self,
        bus: Arc<B>,
        done: Option<ReplayDone>,
    ) -> Result<ReplayHandle<A>, ReplayError>
    where
        B: DispatchBus<Action = A>,
    {
        let runtime = Handle::try_current().map_err(|_| ReplayError::NoRuntime)?;

        let steps: Steps<A> = Arc::new(Mutex::new(self.steps));
        let dispatched = Arc::new(AtomicUsize::new(0));
        let token = CancellationToken::new();
        info!(
            events = lock(&steps).len(),
            delay_ms = u64::try_from(self.delay.as_millis()).unwrap_or(u64::MAX),
            "scheduling delayed replay"
        );

        let task = runtime.spawn(drive(
            bus,
            Arc::clone(&steps),
            Arc::clone(&dispatched),
            token.clone(),
            self.delay,
            done,
            self.in_flight.map(InFlight::enter),
        ));

        Ok(ReplayHandle {
            steps,
            dispatched,
            token,
            task,
        })
    }
}

/// Keeps a shared counter raised for as long as it is alive.
struct InFlight(Arc<AtomicUsize>);

impl InFlight {
    fn enter(counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        Self(counter)
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

// `_in_flight` lives in the task future, so it is released on completion,
// on cancellation and while unwinding from a panicking handler alike.
async fn drive<B: DispatchBus>(
    bus: Arc<B>,
    steps: Steps<B::Action>,
    progress: Arc<AtomicUsize>,
    token: CancellationToken,
    delay: Duration,
    done: Option<ReplayDone>,
    _in_flight: Option<InFlight>,
) -> ReplayOutcome {
    let mut dispatched = 0;

    while !lock(&steps).is_empty() {
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                let remaining = lock(&steps).len();
                warn!(dispatched, remaining, "delayed replay cancelled");
                return ReplayOutcome::Cancelled { dispatched, remaining };
            }
            _ = tokio::time::sleep(delay) => {}
        }

        let Some(event) = lock(&steps).pop_front() else {
            break;
        };
        let (action, data) = event.into_parts();
        if let Err(error) = bus.dispatch(action, data) {
            warn!(index = dispatched, error = %error, "delayed replay dispatch failed");
            lock(&steps).clear();
            return ReplayOutcome::Failed { dispatched, error };
        }
        dispatched += 1;
        progress.store(dispatched, Ordering::Release);
    }

    if let Some(done) = done {
        done();
    }
    info!(dispatched, "delayed replay complete");
    ReplayOutcome::Completed { dispatched }
}

fn lock<A>(steps: &Steps<A>) -> MutexGuard<'_, VecDeque<Event<A>>> {
    steps.lock().unwrap_or_else(PoisonError::into_inner)
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    match payload.downcast::<String>() {
        Ok(message) => *message,
        Err(payload) => match payload.downcast::<&'static str>() {
            Ok(message) => (*message).to_string(),
            Err(_) => "non-string panic payload".to_string(),
        },
    }
}

/// Control over a delayed replay running in the background.
///
/// Dropping the handle does not stop the replay.
#[derive(Debug)]
pub struct ReplayHandle<A> {
    steps: Steps<A>,
    dispatched: Arc<AtomicUsize>,
    token: CancellationToken,
    task: JoinHandle<ReplayOutcome>,
}

impl<A: Clone> ReplayHandle<A> {
    /// Events that have not been dispatched yet, in replay order.
    pub fn remaining(&self) -> Vec<Event<A>> {
        lock(&self.steps).iter().cloned().collect()
    }
}

impl<A> ReplayHandle<A> {
    pub fn remaining_len(&self) -> usize {
        lock(&self.steps).len()
    }

    /// Events that have reached the bus so far.
    pub fn dispatched(&self) -> usize {
        self.dispatched.load(Ordering::Acquire)
    }

    /// Stop before the next dispatch. Events already dispatched stay dispatched.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the replay to end.
    pub async fn wait(self) -> ReplayOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(join_error) => {
                let dispatched = self.dispatched.load(Ordering::Acquire);
                if join_error.is_panic() {
                    let message = panic_message(join_error.into_panic());
                    warn!(dispatched, %message, "bus handler panicked during delayed replay");
                    ReplayOutcome::Panicked {
                        dispatched,
                        message,
                    }
                } else {
                    // The runtime shut down under the task.
                    let remaining = lock(&self.steps).len();
                    warn!(dispatched, remaining, "delayed replay task aborted");
                    ReplayOutcome::Cancelled {
                        dispatched,
                        remaining,
                    }
                }
            }
        }
    }
}
