//! Recorder policies.

use serde::{Deserialize, Serialize};

/// What `replay` does when the recorder is still subscribed to the bus.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplayGuard {
    /// Refuse with `ReplayError::WhileRecording`
    #[default]
    RejectWhileRecording,

    /// Replay anyway; every replayed dispatch is captured again and the log
    /// grows by its own length
    Allow,
}

/// Behaviour switches for a [`Recorder`](super::Recorder).
///
/// # Example
///
/// ```rust
/// use dispatch_recorder::recorder::{RecorderConfig, ReplayGuard};
///
/// let config: RecorderConfig = serde_json::from_str(r#"{"pretty": true}"#).unwrap();
///
/// assert!(config.pretty);
/// assert!(config.notify_immediate_done);
/// assert_eq!(config.replay_guard, ReplayGuard::RejectWhileRecording);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    pub replay_guard: ReplayGuard,

    /// Run the `done` callback after an immediate replay
    pub notify_immediate_done: bool,

    /// Indent serialized logs
    pub pretty: bool,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            replay_guard: ReplayGuard::RejectWhileRecording,
            notify_immediate_done: true,
            pretty: false,
        }
    }
}
