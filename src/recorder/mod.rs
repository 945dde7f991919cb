//! The recorder: captures dispatches off a bus and plays them back.
//!
//! A [`Recorder`] is bound to one bus for its whole life. While recording it
//! holds a single subscription on that bus and appends every dispatched pair
//! to its [`EventLog`]. Stopping drops the subscription but keeps the log,
//! which can then be replayed, serialized, or checkpointed.

mod builder;
mod config;
mod error;

pub use builder::RecorderBuilder;
pub use config::{RecorderConfig, ReplayGuard};
pub use error::BuildError;

use crate::bus::{DispatchBus, Handler};
use crate::core::{Event, EventLog, Subscription};
use crate::replay::{replay_now, Replay, ReplayDone, ReplayError, ReplaySchedule};
use crate::serialize::{self, RecordingCheckpoint, SerializeError, CHECKPOINT_VERSION};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Records the dispatches seen on a bus and replays them.
///
/// # Example
///
/// ```rust
/// use dispatch_recorder::bus::{Dispatcher, DispatchBus};
/// use dispatch_recorder::recorder::Recorder;
/// use serde_json::json;
/// use std::sync::Arc;
///
/// let bus = Arc::new(Dispatcher::new());
/// let inc = bus.symbol_for("inc").unwrap();
///
/// let mut recorder = Recorder::new(Arc::clone(&bus));
/// assert!(recorder.record());
/// bus.dispatch(inc.clone(), json!(1)).unwrap();
/// bus.dispatch(inc, json!(2)).unwrap();
/// recorder.stop();
///
/// assert_eq!(recorder.len(), 2);
/// assert_eq!(
///     recorder.serialize_events().unwrap(),
///     r#"[{"action":"inc","data":1},{"action":"inc","data":2}]"#
/// );
/// ```
pub struct Recorder<B: DispatchBus> {
    bus: Arc<B>,
    log: EventLog<B::Action>,
    subscription: Subscription,
    config: RecorderConfig,
    replays_in_flight: Arc<AtomicUsize>,
}

impl<B: DispatchBus> Recorder<B> {
    /// Create an idle recorder with the default configuration.
    pub fn new(bus: Arc<B>) -> Self {
        Self::with_config(bus, RecorderConfig::default())
    }

    pub fn with_config(bus: Arc<B>, config: RecorderConfig) -> Self {
        Self {
            bus,
            log: EventLog::new(),
            subscription: Subscription::Absent,
            config,
            replays_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn builder() -> RecorderBuilder<B> {
        RecorderBuilder::new()
    }

    /// Start capturing dispatches.
    ///
    /// Returns `false` without subscribing if already recording. Under
    /// [`ReplayGuard::RejectWhileRecording`] it also returns `false` while a
    /// delayed replay started by this recorder is still running, since its
    /// dispatches would land back in the log.
    pub fn record(&mut self) -> bool {
        if self.subscription.is_present() {
            return false;
        }
        if self.config.replay_guard == ReplayGuard::RejectWhileRecording && self.is_replaying() {
            warn!(
                replays = self.replays_in_flight.load(Ordering::Acquire),
                "recording refused while a delayed replay is running"
            );
            return false;
        }

        let log = self.log.clone();
        let handler: Handler<B::Action> = Arc::new(move |event: &Event<B::Action>| {
            log.append(event.clone());
            Ok(())
        });
        let id = self.bus.subscribe(handler);
        self.subscription = Subscription::Present(id);

        debug!(subscription = %id, events = self.log.len(), "recording started");
        true
    }

    /// Stop capturing. The log is kept. Does nothing when not recording.
    pub fn stop(&mut self) {
        if let Some(id) = self.subscription.take() {
            self.bus.unsubscribe(id);
            debug!(subscription = %id, events = self.log.len(), "recording stopped");
        }
    }

    /// Empty the log. Recording, if active, carries on into the empty log.
    pub fn clear(&mut self) {
        self.log.clear();
        debug!(recording = self.is_recording(), "log cleared");
    }

    pub fn is_recording(&self) -> bool {
        self.subscription.is_present()
    }

    /// Whether a delayed replay started by this recorder has not ended yet.
    pub fn is_replaying(&self) -> bool {
        self.replays_in_flight.load(Ordering::Acquire) > 0
    }

    /// Copy of the log in capture order.
    pub fn events(&self) -> Vec<Event<B::Action>> {
        self.log.snapshot()
    }

    pub fn len(&self) -> usize {
        self.log.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }

    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    pub fn bus(&self) -> &Arc<B> {
        &self.bus
    }

    /// Dispatch the logged events again, in order.
    ///
    /// With no `delay` every event is dispatched before this returns, and
    /// `done` runs afterwards unless `notify_immediate_done` is off. With a
    /// delay the events go out one per `delay` on the current tokio runtime
    /// and `done` runs right after the last one.
    ///
    /// The log is copied when the replay starts; later changes to it do not
    /// affect a replay in progress. Until a delayed replay ends, `record`
    /// refuses to start under the default [`ReplayGuard`].
    pub fn replay(
        &self,
        delay: Option<Duration>,
        done: Option<ReplayDone>,
    ) -> Result<Replay<B::Action>, ReplayError> {
        if self.is_recording() && self.config.replay_guard == ReplayGuard::RejectWhileRecording {
            warn!(events = self.log.len(), "replay rejected while recording");
            return Err(ReplayError::WhileRecording);
        }

        let events = self.log.snapshot();
        match delay {
            None => {
                let dispatched = replay_now(self.bus.as_ref(), events)?;
                info!(dispatched, "immediate replay complete");
                if self.config.notify_immediate_done {
                    if let Some(done) = done {
                        done();
                    }
                }
                Ok(Replay::Completed { dispatched })
            }
            // Nothing to schedule.
            Some(_) if events.is_empty() => {
                if let Some(done) = done {
                    done();
                }
                Ok(Replay::Completed { dispatched: 0 })
            }
            Some(delay) => ReplaySchedule::new(events, delay)
                .tracked(Arc::clone(&self.replays_in_flight))
                .spawn(Arc::clone(&self.bus), done)
                .map(Replay::Scheduled),
        }
    }

    /// Encode the log as a JSON array of `{"action", "data"}` records.
    pub fn serialize_events(&self) -> Result<String, SerializeError> {
        serialize::serialize_events(
            self.bus.registry(),
            &self.log.snapshot(),
            self.config.pretty,
        )
    }

    /// Replace the log with the events encoded in `text`.
    ///
    /// Nothing changes unless the whole document is valid.
    pub fn load_events(&mut self, text: &str) -> Result<(), SerializeError> {
        let events = serialize::load_events(self.bus.registry(), text)?;
        debug!(events = events.len(), "log loaded");
        self.log.replace(events);
        Ok(())
    }

    /// Snapshot the log into a versioned checkpoint.
    pub fn checkpoint(&self) -> Result<RecordingCheckpoint, SerializeError> {
        let records = serialize::encode_events(self.bus.registry(), &self.log.snapshot())?;
        let checkpoint = RecordingCheckpoint::new(records);
        debug!(checkpoint = %checkpoint.id, events = checkpoint.len(), "checkpoint taken");
        Ok(checkpoint)
    }

    /// Replace the log with the events held by `checkpoint`.
    pub fn restore(&mut self, checkpoint: &RecordingCheckpoint) -> Result<(), SerializeError> {
        if checkpoint.version != CHECKPOINT_VERSION {
            return Err(SerializeError::UnsupportedVersion {
                found: checkpoint.version,
                supported: CHECKPOINT_VERSION,
            });
        }

        let events = serialize::decode_events(self.bus.registry(), checkpoint.events.clone())?;
        debug!(checkpoint = %checkpoint.id, events = events.len(), "checkpoint restored");
        self.log.replace(events);
        Ok(())
    }
}

impl<B: DispatchBus> Drop for Recorder<B> {
    fn drop(&mut self) {
        self.stop();
    }
}

impl<B: DispatchBus> fmt::Debug for Recorder<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recorder")
            .field("subscription", &self.subscription)
            .field("events", &self.log.len())
            .field("config", &self.config)
            .field("replays_in_flight", &self.replays_in_flight.load(Ordering::Acquire))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{BusError, Dispatcher, Symbol};
    use serde_json::{json, Value};
    use std::sync::Mutex;

    fn observe(bus: &Dispatcher) -> Arc<Mutex<Vec<Event<Symbol>>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        bus.subscribe(Arc::new(move |event: &Event<Symbol>| {
            sink.lock().unwrap().push(event.clone());
            Ok(())
        }));
        seen
    }

    fn flag() -> (Arc<Mutex<bool>>, ReplayDone) {
        let called = Arc::new(Mutex::new(false));
        let slot = Arc::clone(&called);
        (called, Box::new(move || *slot.lock().unwrap() = true))
    }

    fn payloads(events: &[Event<Symbol>]) -> Vec<Value> {
        events.iter().map(|event| event.data.clone()).collect()
    }

    #[test]
    fn record_twice_subscribes_once() {
        let bus = Arc::new(Dispatcher::new());
        let inc = bus.symbol_for("inc").unwrap();
        let mut recorder = Recorder::new(Arc::clone(&bus));

        assert!(recorder.record());
        assert!(!recorder.record());
        assert_eq!(bus.subscriber_count(), 1);

        bus.dispatch(inc, json!(1)).unwrap();
        assert_eq!(recorder.len(), 1);
    }

    #[test]
    fn captures_dispatches_in_order() {
        let bus = Arc::new(Dispatcher::new());
        let a = bus.symbol_for("A").unwrap();
        let b = bus.symbol_for("B").unwrap();
        let mut recorder = Recorder::new(Arc::clone(&bus));
        recorder.record();

        bus.dispatch(a.clone(), json!("x")).unwrap();
        bus.dispatch(b.clone(), json!(42)).unwrap();
        bus.dispatch(a.clone(), json!(null)).unwrap();

        assert_eq!(
            recorder.events(),
            vec![
                Event::new(a.clone(), json!("x")),
                Event::new(b, json!(42)),
                Event::new(a, json!(null)),
            ]
        );
    }

    #[test]
    fn nothing_is_captured_before_record_or_after_stop() {
        let bus = Arc::new(Dispatcher::new());
        let inc = bus.symbol_for("inc").unwrap();
        let mut recorder = Recorder::new(Arc::clone(&bus));

        bus.dispatch(inc.clone(), json!(0)).unwrap();
        recorder.record();
        bus.dispatch(inc.clone(), json!(1)).unwrap();
        recorder.stop();
        bus.dispatch(inc, json!(2)).unwrap();

        assert!(!recorder.is_recording());
        assert_eq!(bus.subscriber_count(), 0);
        assert_eq!(payloads(&recorder.events()), vec![json!(1)]);
    }

    #[test]
    fn stop_when_idle_is_a_no_op() {
        let bus = Arc::new(Dispatcher::new());
        let other = observe(&bus);
        let mut recorder = Recorder::new(Arc::clone(&bus));

        recorder.stop();
        recorder.stop();

        assert_eq!(bus.subscriber_count(), 1);
        assert!(other.lock().unwrap().is_empty());
    }

    #[test]
    fn record_after_stop_appends_to_existing_log() {
        let bus = Arc::new(Dispatcher::new());
        let inc = bus.symbol_for("inc").unwrap();
        let mut recorder = Recorder::new(Arc::clone(&bus));

        recorder.record();
        bus.dispatch(inc.clone(), json!(1)).unwrap();
        recorder.stop();
        assert!(recorder.record());
        bus.dispatch(inc, json!(2)).unwrap();

        assert_eq!(payloads(&recorder.events()), vec![json!(1), json!(2)]);
    }

    #[test]
    fn clear_keeps_recording() {
        let bus = Arc::new(Dispatcher::new());
        let inc = bus.symbol_for("inc").unwrap();
        let mut recorder = Recorder::new(Arc::clone(&bus));
        recorder.record();

        bus.dispatch(inc.clone(), json!(1)).unwrap();
        recorder.clear();
        assert!(recorder.is_empty());
        assert!(recorder.is_recording());

        bus.dispatch(inc, json!(2)).unwrap();
        assert_eq!(payloads(&recorder.events()), vec![json!(2)]);
    }

    #[test]
    fn immediate_replay_reproduces_the_recording() {
        let bus = Arc::new(Dispatcher::new());
        let inc = bus.symbol_for("inc").unwrap();
        let mut recorder = Recorder::new(Arc::clone(&bus));

        recorder.record();
        bus.dispatch(inc.clone(), json!(1)).unwrap();
        bus.dispatch(inc.clone(), json!(2)).unwrap();
        recorder.stop();

        let seen = observe(&bus);
        let (called, done) = flag();
        let replay = recorder.replay(None, Some(done)).unwrap();

        assert!(matches!(replay, Replay::Completed { dispatched: 2 }));
        assert_eq!(
            *seen.lock().unwrap(),
            vec![Event::new(inc.clone(), json!(1)), Event::new(inc, json!(2))]
        );
        assert!(*called.lock().unwrap());
        assert_eq!(recorder.len(), 2);
    }

    #[test]
    fn immediate_done_can_be_switched_off() {
        let bus = Arc::new(Dispatcher::new());
        let recorder = Recorder::builder()
            .bus(bus)
            .notify_immediate_done(false)
            .build()
            .unwrap();

        let (called, done) = flag();
        recorder.replay(None, Some(done)).unwrap();

        assert!(!*called.lock().unwrap());
    }

    #[test]
    fn immediate_replay_failure_skips_done() {
        let bus = Arc::new(Dispatcher::new());
        let inc = bus.symbol_for("inc").unwrap();
        let mut recorder = Recorder::new(Arc::clone(&bus));
        recorder.record();
        bus.dispatch(inc, json!(1)).unwrap();
        recorder.stop();

        bus.close();
        let (called, done) = flag();
        let err = recorder.replay(None, Some(done)).unwrap_err();

        assert!(matches!(
            err,
            ReplayError::Dispatch {
                index: 0,
                source: BusError::Closed
            }
        ));
        assert!(!*called.lock().unwrap());
    }

    #[test]
    fn replay_while_recording_is_rejected_by_default() {
        let bus = Arc::new(Dispatcher::new());
        let inc = bus.symbol_for("inc").unwrap();
        let mut recorder = Recorder::new(Arc::clone(&bus));
        recorder.record();
        bus.dispatch(inc, json!(1)).unwrap();

        let err = recorder.replay(None, None).unwrap_err();

        assert!(matches!(err, ReplayError::WhileRecording));
        assert_eq!(recorder.len(), 1);
    }

    #[test]
    fn allowed_replay_while_recording_captures_itself() {
        let bus = Arc::new(Dispatcher::new());
        let inc = bus.symbol_for("inc").unwrap();
        let mut recorder = Recorder::builder()
            .bus(Arc::clone(&bus))
            .replay_guard(ReplayGuard::Allow)
            .build()
            .unwrap();
        recorder.record();
        bus.dispatch(inc.clone(), json!(1)).unwrap();
        bus.dispatch(inc, json!(2)).unwrap();

        recorder.replay(None, None).unwrap();

        assert_eq!(
            payloads(&recorder.events()),
            vec![json!(1), json!(2), json!(1), json!(2)]
        );
    }

    #[test]
    fn delayed_replay_of_empty_log_finishes_synchronously() {
        let recorder = Recorder::new(Arc::new(Dispatcher::new()));
        let (called, done) = flag();

        let replay = recorder
            .replay(Some(Duration::from_millis(100)), Some(done))
            .unwrap();

        assert!(matches!(replay, Replay::Completed { dispatched: 0 }));
        assert!(*called.lock().unwrap());
    }

    #[test]
    fn delayed_replay_needs_a_runtime() {
        let bus = Arc::new(Dispatcher::new());
        let inc = bus.symbol_for("inc").unwrap();
        let mut recorder = Recorder::new(Arc::clone(&bus));
        recorder.record();
        bus.dispatch(inc, json!(1)).unwrap();
        recorder.stop();

        let err = recorder
            .replay(Some(Duration::from_millis(10)), None)
            .unwrap_err();
        assert!(matches!(err, ReplayError::NoRuntime));
    }

    #[tokio::test(start_paused = true)]
    async fn delayed_replay_runs_in_the_background() {
        let bus = Arc::new(Dispatcher::new());
        let inc = bus.symbol_for("inc").unwrap();
        let mut recorder = Recorder::new(Arc::clone(&bus));
        recorder.record();
        bus.dispatch(inc.clone(), json!(1)).unwrap();
        bus.dispatch(inc, json!(2)).unwrap();
        recorder.stop();

        let seen = observe(&bus);
        let replay = recorder
            .replay(Some(Duration::from_millis(100)), None)
            .unwrap();
        assert!(seen.lock().unwrap().is_empty());

        let handle = replay.into_handle().unwrap();
        let outcome = handle.wait().await;

        assert_eq!(outcome.dispatched(), 2);
        assert_eq!(payloads(&seen.lock().unwrap()), vec![json!(1), json!(2)]);
    }

    #[tokio::test(start_paused = true)]
    async fn record_waits_for_pending_delayed_replay() {
        let bus = Arc::new(Dispatcher::new());
        let inc = bus.symbol_for("inc").unwrap();
        let mut recorder = Recorder::new(Arc::clone(&bus));
        recorder.record();
        bus.dispatch(inc.clone(), json!(1)).unwrap();
        bus.dispatch(inc, json!(2)).unwrap();
        recorder.stop();

        let handle = recorder
            .replay(Some(Duration::from_millis(10)), None)
            .unwrap()
            .into_handle()
            .unwrap();
        assert!(recorder.is_replaying());
        assert!(!recorder.record());
        assert_eq!(bus.subscriber_count(), 0);

        assert!(handle.wait().await.is_completed());
        assert!(!recorder.is_replaying());
        assert_eq!(payloads(&recorder.events()), vec![json!(1), json!(2)]);

        assert!(recorder.record());
    }

    #[tokio::test(start_paused = true)]
    async fn allowed_record_during_delayed_replay_captures_it() {
        let bus = Arc::new(Dispatcher::new());
        let inc = bus.symbol_for("inc").unwrap();
        let mut recorder = Recorder::builder()
            .bus(Arc::clone(&bus))
            .replay_guard(ReplayGuard::Allow)
            .build()
            .unwrap();
        recorder.record();
        bus.dispatch(inc.clone(), json!(1)).unwrap();
        bus.dispatch(inc, json!(2)).unwrap();
        recorder.stop();

        let handle = recorder
            .replay(Some(Duration::from_millis(10)), None)
            .unwrap()
            .into_handle()
            .unwrap();
        assert!(recorder.record());
        handle.wait().await;

        assert_eq!(recorder.len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_replay_no_longer_blocks_record() {
        let bus = Arc::new(Dispatcher::new());
        let inc = bus.symbol_for("inc").unwrap();
        let mut recorder = Recorder::new(Arc::clone(&bus));
        recorder.record();
        bus.dispatch(inc, json!(1)).unwrap();
        recorder.stop();

        let handle = recorder
            .replay(Some(Duration::from_secs(60)), None)
            .unwrap()
            .into_handle()
            .unwrap();
        handle.cancel();
        handle.wait().await;

        assert!(!recorder.is_replaying());
        assert!(recorder.record());
    }

    #[test]
    fn serialized_log_loads_into_another_recorder() {
        let bus = Arc::new(Dispatcher::new());
        let a = bus.symbol_for("A").unwrap();
        let b = bus.symbol_for("B").unwrap();
        let mut source = Recorder::new(Arc::clone(&bus));
        source.record();
        bus.dispatch(a, json!("x")).unwrap();
        bus.dispatch(b, json!(42)).unwrap();
        source.stop();

        let text = source.serialize_events().unwrap();
        assert_eq!(
            serde_json::from_str::<Value>(&text).unwrap(),
            json!([{"action": "A", "data": "x"}, {"action": "B", "data": 42}])
        );

        let mut target = Recorder::new(Arc::clone(&bus));
        target.load_events(&text).unwrap();
        assert_eq!(target.events(), source.events());
    }

    #[test]
    fn pretty_config_indents_output() {
        let bus = Arc::new(Dispatcher::new());
        let inc = bus.symbol_for("inc").unwrap();
        let mut recorder = Recorder::builder()
            .bus(Arc::clone(&bus))
            .pretty(true)
            .recording()
            .build()
            .unwrap();
        bus.dispatch(inc, json!(1)).unwrap();
        recorder.stop();

        assert!(recorder.serialize_events().unwrap().contains('\n'));
    }

    #[test]
    fn local_actions_cannot_be_serialized() {
        let bus = Arc::new(Dispatcher::new());
        let mut recorder = Recorder::new(Arc::clone(&bus));
        recorder.record();
        bus.dispatch(Symbol::new("local"), json!(1)).unwrap();

        let err = recorder.serialize_events().unwrap_err();
        assert!(matches!(
            err,
            SerializeError::UnregisteredAction { index: 0, .. }
        ));
    }

    #[test]
    fn failed_load_leaves_log_untouched() {
        let bus = Arc::new(Dispatcher::new());
        let inc = bus.symbol_for("inc").unwrap();
        let mut recorder = Recorder::new(Arc::clone(&bus));
        recorder.record();
        bus.dispatch(inc, json!(1)).unwrap();
        recorder.stop();
        let before = recorder.events();

        assert!(recorder.load_events("not json").is_err());
        assert!(recorder.load_events(r#"[{"action":"inc"}]"#).is_err());
        assert!(recorder.load_events(r#"{"action":"inc","data":1}"#).is_err());

        assert_eq!(recorder.events(), before);
    }

    #[test]
    fn load_replaces_existing_log() {
        let bus = Arc::new(Dispatcher::new());
        let inc = bus.symbol_for("inc").unwrap();
        let mut recorder = Recorder::new(Arc::clone(&bus));
        recorder.record();
        bus.dispatch(inc, json!(1)).unwrap();
        recorder.stop();

        recorder
            .load_events(r#"[{"action":"dec","data":5}]"#)
            .unwrap();

        let events = recorder.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].action, bus.symbol_for("dec").unwrap());
        assert_eq!(events[0].data, json!(5));
    }

    #[test]
    fn checkpoint_restores_the_log() {
        let bus = Arc::new(Dispatcher::new());
        let inc = bus.symbol_for("inc").unwrap();
        let mut recorder = Recorder::new(Arc::clone(&bus));
        recorder.record();
        bus.dispatch(inc.clone(), json!(1)).unwrap();
        bus.dispatch(inc, json!(2)).unwrap();
        recorder.stop();

        let checkpoint = recorder.checkpoint().unwrap();
        let before = recorder.events();
        recorder.clear();

        let parsed = RecordingCheckpoint::from_json(&checkpoint.to_json().unwrap()).unwrap();
        recorder.restore(&parsed).unwrap();

        assert_eq!(recorder.events(), before);
    }

    #[test]
    fn restore_rejects_unknown_version() {
        let bus = Arc::new(Dispatcher::new());
        let mut recorder = Recorder::new(bus);
        let mut checkpoint = recorder.checkpoint().unwrap();
        checkpoint.version = CHECKPOINT_VERSION + 1;

        let err = recorder.restore(&checkpoint).unwrap_err();
        assert!(matches!(err, SerializeError::UnsupportedVersion { .. }));
    }

    #[test]
    fn dropping_a_recorder_unsubscribes() {
        let bus = Arc::new(Dispatcher::new());
        {
            let mut recorder = Recorder::new(Arc::clone(&bus));
            recorder.record();
            assert_eq!(bus.subscriber_count(), 1);
        }
        assert_eq!(bus.subscriber_count(), 0);
    }
}
