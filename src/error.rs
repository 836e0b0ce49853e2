//! Fatal error kinds shared across the compiler.
//!
//! Structural validation collects its findings into a list before failing;
//! every other kind aborts at the first offense. None are retried.

use crate::driver::DriverError;
use thiserror::Error;

/// The closed set of compilation failures.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Input could not be read, or did not conform to the expected shape.
    #[error("malformed protocol: {0}")]
    Format(String),

    /// Structural validation failed; carries the full collected error list.
    #[error("protocol validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// A tool configuration key outside the supported option set.
    #[error("unsupported option {key:?} in tool {tool:?}")]
    ConfigKey { tool: String, key: String },

    /// A required tool option is missing, ill-typed, or otherwise unusable.
    #[error("invalid configuration for tool {tool:?}: {message}")]
    Config { tool: String, message: String },

    /// A name did not resolve to a known container, well, labware, or tool.
    #[error("unresolved reference: {0}")]
    Reference(String),

    /// A command-type tag with no handler.
    #[error("unsupported command {0:?}")]
    UnsupportedCommand(String),

    /// An actuator call failed mid-stream. Already-issued calls stand.
    #[error(transparent)]
    Driver(#[from] DriverError),
}

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        Self::Format(err.to_string())
    }
}

impl From<std::io::Error> for ProtocolError {
    fn from(err: std::io::Error) -> Self {
        Self::Format(err.to_string())
    }
}
