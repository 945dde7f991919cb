//! Builder for constructing recorders.

use super::config::{RecorderConfig, ReplayGuard};
use super::error::BuildError;
use super::Recorder;
use crate::bus::DispatchBus;
use std::sync::Arc;

/// Builder for constructing recorders with a fluent API.
pub struct RecorderBuilder<B: DispatchBus> {
    bus: Option<Arc<B>>,
    config: RecorderConfig,
    record: bool,
}

impl<B: DispatchBus> RecorderBuilder<B> {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            bus: None,
            config: RecorderConfig::default(),
            record: false,
        }
    }

    /// Set the bus to record from and replay onto (required).
    pub fn bus(mut self, bus: Arc<B>) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: RecorderConfig) -> Self {
        self.config = config;
        self
    }

    pub fn replay_guard(mut self, guard: ReplayGuard) -> Self {
        self.config.replay_guard = guard;
        self
    }

    pub fn notify_immediate_done(mut self, notify: bool) -> Self {
        self.config.notify_immediate_done = notify;
        self
    }

    pub fn pretty(mut self, pretty: bool) -> Self {
        self.config.pretty = pretty;
        self
    }

    /// Start recording as soon as the recorder is built.
    pub fn recording(mut self) -> Self {
        self.record = true;
        self
    }

    /// Build the recorder.
    /// Returns an error if no bus was given.
    pub fn build(self) -> Result<Recorder<B>, BuildError> {
        let bus = self.bus.ok_or(BuildError::MissingBus)?;

        let mut recorder = Recorder::with_config(bus, self.config);
        if self.record {
            recorder.record();
        }

        Ok(recorder)
    }
}

impl<B: DispatchBus> Default for RecorderBuilder<B> {
    fn default() -> Self {
        Self::new()
    }
}
