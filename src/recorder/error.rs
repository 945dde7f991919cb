//! Build errors for the recorder builder.

use thiserror::Error;

/// Errors that can occur when building a recorder.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("Dispatch bus not specified. Call .bus(bus) before .build()")]
    MissingBus,
}
