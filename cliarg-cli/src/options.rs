//! Configuration options for the `cliarg` binary.
//!
//! The binary's own flags go through clap; everything after `--` is handed to
//! the copy job specification untouched.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, ValueEnum};

use crate::job::CopyJob;

/// Log verbosity for the binary and the parser.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Debug,
    #[default]
    Normal,
    Quiet,
}

impl LogLevel {
    /// Filter directives used when `RUST_LOG` is not set
    pub fn filter(self) -> &'static str {
        match self {
            LogLevel::Debug => "cliarg=debug,cliarg_core=trace",
            LogLevel::Normal => "cliarg=info,cliarg_core=warn",
            LogLevel::Quiet => "cliarg=error,cliarg_core=off",
        }
    }
}

/// Command-line arguments for the `cliarg` binary.
#[derive(Parser, Debug)]
#[command(author, version, about = "Bind command line arguments to a copy job")]
pub struct CliOptions {
    /// Log verbosity
    #[arg(long, value_enum, default_value_t = LogLevel::Normal)]
    pub log_level: LogLevel,

    /// Print the bound job as compact JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// TOML file with default values for the job
    #[arg(long)]
    pub defaults: Option<PathBuf>,

    /// Arguments to bind, given after `--`
    #[arg(last = true)]
    pub args: Vec<String>,
}

/// Resolved settings for one run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub log_level: LogLevel,
    pub json: bool,
    pub defaults: CopyJob,
    pub args: Vec<String>,
}

impl CliOptions {
    /// Load the defaults file, if any, and convert to [`RunOptions`]
    pub fn into_run_options(self) -> anyhow::Result<RunOptions> {
        let defaults = match &self.defaults {
            Some(path) => load_defaults(path)?,
            None => CopyJob::default(),
        };

        Ok(RunOptions {
            log_level: self.log_level,
            json: self.json,
            defaults,
            args: self.args,
        })
    }
}

fn load_defaults(path: &Path) -> anyhow::Result<CopyJob> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read defaults file {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Invalid defaults file {}", path.display()))
}
