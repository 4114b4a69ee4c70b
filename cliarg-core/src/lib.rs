//! Core types for cliarg.
//!
//! This crate binds raw command line arguments to a strongly typed target
//! described by a declarative [`CliSpec`]: named option parameters plus an
//! ordered list of positional parameters. Parsing never stops at the first
//! problem; missing, unrecognized and malformed arguments are collected into a
//! [`ParseReport`] alongside the populated target.

mod error;
mod property;
mod spec;
pub mod coerce;
pub mod args_processor;

// Re-export core types
pub use error::{CliArgError, CoerceError, Result, SpecError};
pub use property::{ArgType, FieldAccessor, Property, ValueType};
pub use spec::{CliSpec, CliSpecBuilder, Param};
pub use coerce::{Coercer, CoercionStrategy, RootShape};
pub use args_processor::{CliParser, ParseOutcome, ParseReport, parse_env};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
