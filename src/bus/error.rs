//! Bus and registry error types.

use thiserror::Error;

/// Errors raised while dispatching on a bus
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BusError {
    #[error("Dispatcher is closed")]
    Closed,

    #[error("Handler failed: {message}")]
    Handler { message: String },
}

impl BusError {
    /// Convenience constructor for handler failures.
    pub fn handler(message: impl Into<String>) -> Self {
        Self::Handler {
            message: message.into(),
        }
    }
}

/// Errors raised while resolving an action key
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RegistryError {
    #[error("Registry is sealed and has no action registered under '{key}'")]
    Sealed { key: String },
}
