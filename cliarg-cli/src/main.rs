//! `cliarg` command-line entry point.
//!
//! Binds the arguments given after `--` to a [`CopyJob`](job::CopyJob) and
//! prints the result, or the collected errors.

mod job;
mod options;

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use serde_json::Value;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use cliarg_core::CliParser;

use crate::options::{CliOptions, LogLevel};

fn main() -> anyhow::Result<ExitCode> {
    let run = CliOptions::parse().into_run_options()?;
    init_tracing(run.log_level);

    let spec = job::copy_job_spec(run.defaults).context("Invalid copy job specification")?;
    debug!(?spec, "built specification");

    let outcome = CliParser::new(&spec, run.args, 0)?.parse();
    let snapshot = Value::Object(spec.snapshot(outcome.target())?);

    if run.json {
        println!("{}", serde_json::to_string(&snapshot)?);
    } else {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    }

    if outcome.has_error() {
        eprintln!("{}", outcome.report());
        return Ok(ExitCode::from(2));
    }

    info!("arguments bound");
    Ok(ExitCode::SUCCESS)
}

fn init_tracing(level: LogLevel) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.filter()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
