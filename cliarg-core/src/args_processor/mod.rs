//! Command argument processing.
//!
//! This module binds a token list to a target object according to a
//! [`CliSpec`](crate::CliSpec). It handles long and short options, inline
//! `name=value` forms, boolean switches and positional parameters, and reports
//! every problem it finds in a single pass.

mod parser;
mod report;

pub use parser::{CliParser, parse_env};
pub use report::{ParseOutcome, ParseReport};
