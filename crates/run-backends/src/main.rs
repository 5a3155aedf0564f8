//! run-backends
//!
//! Runs a MiniZinc model across solver backends and reports the outcomes as
//! a LaTeX table, with optional JSON records, a progress log and a
//! replayable fixture.
//!
//! # Usage
//!
//! ```bash
//! # One instance, backends and timeout from config.json
//! run-backends model.mzn
//!
//! # Sweep parameter n from 10 to 50 in steps of 10
//! run-backends model.mzn -t 30s -r n 10 50 10 --backends gecode chuffed
//!
//! # One instance per data file, table written to a file
//! run-backends model.mzn -d 'data/*.dzn' -o results.tex --json-output runs.json
//! ```
//!
//! Exit status is 2 for invalid arguments or configuration and 1 when an
//! instance cannot be built or solved.

mod cli;
mod config;

use anyhow::{Context, Result};
use clap::{error::ErrorKind, CommandFactory, Parser};
use cli::Args;
use config::{parse_timeout, HarnessConfig};
use runner::{
    ConfigError, DurationParser, ExtraFlags, FixtureReporter, LogReporter,
    MiniZincEngine, RecordReporter, Reporters, RunDriver, RunError, RunSettings, Sweep,
    TableReporter,
};
use std::process::ExitCode;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let args = Args::parse();

    let default_filter = if args.verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{:#}", err);
            exit_code(&err)
        }
    }
}

/// Configuration problems are usage errors; everything else is a failed run.
fn exit_code(err: &anyhow::Error) -> ExitCode {
    let is_config = err.downcast_ref::<ConfigError>().is_some()
        || matches!(err.downcast_ref::<RunError>(), Some(RunError::Config(_)));
    if is_config {
        ExitCode::from(2)
    } else {
        ExitCode::from(1)
    }
}

fn run(args: Args) -> Result<()> {
    let config = HarnessConfig::discover(args.config.as_deref())?.with_env_overrides();

    let parser = DurationParser::default();
    let timeout = match args.timeout_text() {
        Some(text) => parse_timeout(&parser, &text).map(Some),
        None => config.timeout(&parser),
    };
    let timeout = match timeout {
        Ok(Some(timeout)) => timeout,
        Ok(None) => usage_error("no timeout given on the command line or in the configuration"),
        Err(e) => usage_error(&e.to_string()),
    };

    let data_files = match args.expanded_data_files() {
        Ok(files) => files,
        Err(e) => usage_error(&e.to_string()),
    };
    let sweep = match (args.param_range(), data_files) {
        (Err(e), _) => usage_error(&e.to_string()),
        (Ok(Some(range)), _) => Sweep::Param(range),
        (Ok(None), Some(files)) => Sweep::DataFiles(files),
        (Ok(None), None) => Sweep::Single,
    };

    let settings = RunSettings {
        model: args.model.clone(),
        timeout,
        vars: args.vars.clone(),
        backends: args
            .backends
            .clone()
            .or_else(|| config.backends.clone())
            .unwrap_or_default(),
        extra_flags: args
            .extra
            .as_deref()
            .map(ExtraFlags::parse)
            .unwrap_or_default(),
        backend_flags: config.backend_flags()?,
    };

    let reporters = build_reporters(&args)?;
    let driver_dir = args.minizinc_path.as_deref().or(config.driver_path.as_deref());
    let engine = MiniZincEngine::locate(driver_dir);
    info!(executable = %engine.executable().display(), "Using MiniZinc");

    let mut driver = RunDriver::new(engine, settings, reporters)?;
    driver.execute(&sweep)?;
    Ok(())
}

fn build_reporters(args: &Args) -> Result<Reporters> {
    let mut reporters = Reporters::new();
    reporters.add(TableReporter::new(args.no_header, args.output.clone()));

    let level = if args.verbose {
        Level::INFO
    } else {
        Level::WARN
    };
    let log = LogReporter::new(level, args.log_output.clone()).with_context(|| {
        format!(
            "Failed to open log file {}",
            args.log_output
                .as_deref()
                .map(|p| p.display().to_string())
                .unwrap_or_default()
        )
    })?;
    reporters.add(log);

    if let Some(path) = &args.json_output {
        reporters.add(RecordReporter::new(path));
    }
    if let Some(path) = &args.create_tests {
        reporters.add(FixtureReporter::new(path));
    }
    Ok(reporters)
}

/// Report an invalid argument the way clap does and exit with status 2.
fn usage_error(message: &str) -> ! {
    Args::command().error(ErrorKind::ValueValidation, message).exit()
}
