//! Portable text form of an event log.
//!
//! An event log is written as a JSON array of records:
//!
//! ```json
//! [{"action": "inc", "data": 1}, {"action": "dec", "data": {"by": 2}}]
//! ```
//!
//! Action handles are opaque, so each one is written as the key the bus's
//! [`ActionRegistry`] knows it by, and resolved back through the registry on
//! load. Only registry-backed actions can round-trip.
//!
//! Loading validates the whole document before decoding it and reports every
//! malformed record at once, using Stillwater's `Validation` to accumulate
//! violations instead of stopping at the first.

pub mod checkpoint;
pub mod error;

pub use checkpoint::{RecordingCheckpoint, CHECKPOINT_VERSION};
pub use error::{SchemaViolation, SerializeError};

use crate::bus::ActionRegistry;
use crate::core::Event;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Debug;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

/// Wire form of one event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SerializedEvent {
    /// Registry key of the action
    pub action: String,
    /// Original payload
    pub data: Value,
}

type SchemaCheck = Validation<(), NonEmptyVec<SchemaViolation>>;

/// Map events to their wire form, resolving each action to its registry key.
pub fn encode_events<R>(
    registry: &R,
    events: &[Event<R::Action>],
) -> Result<Vec<SerializedEvent>, SerializeError>
where
    R: ActionRegistry,
    R::Action: Debug,
{
    events
        .iter()
        .enumerate()
        .map(|(index, event)| {
            let action = registry.key_of(&event.action).ok_or_else(|| {
                SerializeError::UnregisteredAction {
                    index,
                    action: format!("{:?}", event.action),
                }
            })?;
            Ok(SerializedEvent {
                action,
                data: event.data.clone(),
            })
        })
        .collect()
}

/// Encode events as a JSON array.
///
/// # Example
///
/// ```rust
/// use dispatch_recorder::bus::SymbolRegistry;
/// use dispatch_recorder::core::Event;
/// use dispatch_recorder::serialize::serialize_events;
/// use serde_json::json;
///
/// let registry = SymbolRegistry::new();
/// let inc = registry.symbol_for("inc").unwrap();
///
/// let text = serialize_events(&registry, &[Event::new(inc, json!(1))], false).unwrap();
/// assert_eq!(text, r#"[{"action":"inc","data":1}]"#);
/// ```
pub fn serialize_events<R>(
    registry: &R,
    events: &[Event<R::Action>],
    pretty: bool,
) -> Result<String, SerializeError>
where
    R: ActionRegistry,
    R::Action: Debug,
{
    let records = encode_events(registry, events)?;
    let encoded = if pretty {
        serde_json::to_string_pretty(&records)
    } else {
        serde_json::to_string(&records)
    };
    encoded.map_err(|e| SerializeError::Serialization(e.to_string()))
}

/// Parse and validate the wire form without resolving actions.
pub fn parse_events(text: &str) -> Result<Vec<SerializedEvent>, SerializeError> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| SerializeError::Parse(e.to_string()))?;
    check_schema(&value)?;
    serde_json::from_value(value).map_err(|e| SerializeError::Parse(e.to_string()))
}

/// Resolve wire records back into events, registering unknown keys.
pub fn decode_events<R: ActionRegistry>(
    registry: &R,
    records: Vec<SerializedEvent>,
) -> Result<Vec<Event<R::Action>>, SerializeError> {
    records
        .into_iter()
        .map(|record| {
            let action = registry
                .lookup(&record.action)
                .map_err(|_| SerializeError::UnknownAction {
                    key: record.action.clone(),
                })?;
            Ok(Event::new(action, record.data))
        })
        .collect()
}

/// Parse, validate and resolve a serialized event log.
///
/// # Example
///
/// ```rust
/// use dispatch_recorder::bus::SymbolRegistry;
/// use dispatch_recorder::serialize::load_events;
/// use serde_json::json;
///
/// let registry = SymbolRegistry::new();
/// let events = load_events(&registry, r#"[{"action":"inc","data":2}]"#).unwrap();
///
/// assert_eq!(events[0].action, registry.symbol_for("inc").unwrap());
/// assert_eq!(events[0].data, json!(2));
/// ```
pub fn load_events<R: ActionRegistry>(
    registry: &R,
    text: &str,
) -> Result<Vec<Event<R::Action>>, SerializeError> {
    let records = parse_events(text)?;
    decode_events(registry, records)
}

pub(crate) fn check_schema(value: &Value) -> Result<(), SerializeError> {
    match validate_records(value) {
        Validation::Success(_) => Ok(()),
        Validation::Failure(violations) => Err(SerializeError::Schema(
            violations.iter().cloned().collect(),
        )),
    }
}

fn validate_records(value: &Value) -> SchemaCheck {
    let Some(records) = value.as_array() else {
        return Validation::fail(SchemaViolation::NotAnArray {
            found: kind_of(value),
        });
    };

    let checks: Vec<SchemaCheck> = records
        .iter()
        .enumerate()
        .map(|(index, record)| validate_record(index, record))
        .collect();

    Validation::all_vec(checks).map(|_| ())
}

fn validate_record(index: usize, record: &Value) -> SchemaCheck {
    let Some(fields) = record.as_object() else {
        return Validation::fail(SchemaViolation::NotAnObject {
            index,
            found: kind_of(record),
        });
    };

    let mut checks: Vec<SchemaCheck> = Vec::new();

    checks.push(match fields.get("action") {
        Some(Value::String(_)) => Validation::success(()),
        Some(other) => Validation::fail(SchemaViolation::ActionNotString {
            index,
            found: kind_of(other),
        }),
        None => Validation::fail(SchemaViolation::MissingAction { index }),
    });

    checks.push(if fields.contains_key("data") {
        Validation::success(())
    } else {
        Validation::fail(SchemaViolation::MissingData { index })
    });

    Validation::all_vec(checks).map(|_| ())
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
