//! Error types for cliarg.
//!
//! Only [`SpecError`] is raised before a parse starts. Everything that goes
//! wrong while walking the tokens is collected into a
//! [`ParseReport`](crate::ParseReport) instead.

use thiserror::Error;

use crate::coerce::RootShape;
use crate::property::ValueType;
use crate::ParseReport;

/// Problems with the specification itself.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SpecError {
    /// A parameter was registered with an empty name
    #[error("Parameter name must not be empty")]
    EmptyName,

    /// Two parameters share a name
    #[error("Duplicate parameter name: {0}")]
    DuplicateName(String),

    /// No target was supplied and the spec has no way to build one
    #[error("No default instance factory registered for {0}")]
    NoFactory(&'static str),
}

/// Failure turning one raw token into a field value.
#[derive(Debug, Error)]
pub enum CoerceError {
    /// The text is not a valid rendering of the declared type
    #[error("Cannot parse `{text}` as {expected}: {reason}")]
    InvalidValue {
        expected: ValueType,
        text: String,
        reason: String,
    },

    /// An option that needs a value was the last token
    #[error("Missing value")]
    MissingValue,

    /// Structured text did not decode
    #[error("Invalid {shape} value: {source}")]
    Decode {
        shape: RootShape,
        #[source]
        source: serde_json::Error,
    },

    /// The decoded value does not fit the field's concrete type
    #[error("Value does not fit field: {0}")]
    Assign(#[source] serde_json::Error),

    /// Reading a field back out for a snapshot failed
    #[error("Cannot read field: {0}")]
    Snapshot(#[source] serde_json::Error),

    /// Every strategy in the chain declined the type
    #[error("No coercion strategy accepts {0}")]
    Unsupported(ValueType),
}

/// Umbrella error for callers that want a single `Result` type.
#[derive(Debug, Error)]
pub enum CliArgError {
    #[error(transparent)]
    Spec(#[from] SpecError),

    #[error("Invalid arguments:\n{0}")]
    Parse(ParseReport),
}

/// Result type alias for cliarg operations
pub type Result<T> = std::result::Result<T, CliArgError>;
