//! Versioned envelope around a serialized event log.
//!
//! The bare JSON array is the interchange format. A checkpoint wraps the same
//! records with a format version, a unique id and a creation time, so a
//! recording saved by one process can be recognised and validated by another.

use super::error::SerializeError;
use super::{check_schema, SerializedEvent};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Version identifier for checkpoint format
pub const CHECKPOINT_VERSION: u32 = 1;

/// Serializable snapshot of a recorder's event log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecordingCheckpoint {
    /// Checkpoint format version
    pub version: u32,

    /// Unique checkpoint identifier
    pub id: Uuid,

    /// When checkpoint was created
    pub created_at: DateTime<Utc>,

    /// Events in log order
    pub events: Vec<SerializedEvent>,
}

impl RecordingCheckpoint {
    /// Wrap already-encoded events in a fresh checkpoint.
    pub fn new(events: Vec<SerializedEvent>) -> Self {
        Self {
            version: CHECKPOINT_VERSION,
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            events,
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String, SerializeError> {
        serde_json::to_string(self).map_err(|e| SerializeError::Serialization(e.to_string()))
    }

    /// Serialize to indented JSON.
    pub fn to_json_pretty(&self) -> Result<String, SerializeError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| SerializeError::Serialization(e.to_string()))
    }

    /// Parse a checkpoint, rejecting unknown versions and malformed events.
    pub fn from_json(text: &str) -> Result<Self, SerializeError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| SerializeError::Parse(e.to_string()))?;

        if let Some(found) = value.get("version").and_then(Value::as_u64) {
            if found != u64::from(CHECKPOINT_VERSION) {
                return Err(SerializeError::UnsupportedVersion {
                    found: u32::try_from(found).unwrap_or(u32::MAX),
                    supported: CHECKPOINT_VERSION,
                });
            }
        }
        if let Some(events) = value.get("events") {
            check_schema(events)?;
        }

        serde_json::from_value(value).map_err(|e| SerializeError::Parse(e.to_string()))
    }
}
