//! Serializer error types.

use thiserror::Error;

/// A single way a parsed record departs from `{"action": string, "data": any}`
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SchemaViolation {
    #[error("expected an array of events, found {found}")]
    NotAnArray { found: &'static str },

    #[error("event {index}: expected an object, found {found}")]
    NotAnObject { index: usize, found: &'static str },

    #[error("event {index}: missing 'action'")]
    MissingAction { index: usize },

    #[error("event {index}: 'action' must be a string, found {found}")]
    ActionNotString { index: usize, found: &'static str },

    #[error("event {index}: missing 'data'")]
    MissingData { index: usize },
}

/// Errors that can occur while encoding or decoding an event log
#[derive(Debug, Error)]
pub enum SerializeError {
    /// Input text is not valid JSON
    #[error("Parse failed: {0}")]
    Parse(String),

    /// Input is JSON but not a list of event records; holds every violation found
    #[error("Schema validation failed: {}", describe(.0))]
    Schema(Vec<SchemaViolation>),

    /// Encoding to text failed
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// A logged action has no registry key and cannot be written out
    #[error("Event {index} uses unregistered action {action}")]
    UnregisteredAction { index: usize, action: String },

    /// The registry cannot resolve or create an action for this key
    #[error("Unknown action '{key}'")]
    UnknownAction { key: String },

    /// Checkpoint version is not supported by this version
    #[error("Unsupported checkpoint version {found}, supported: {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },
}

fn describe(violations: &[SchemaViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
