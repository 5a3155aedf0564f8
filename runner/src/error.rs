//! Error types
//!
//! Configuration and engine errors abort a run; reporter errors propagate
//! unchanged. Outcome states such as UNKNOWN or a timeout are never errors.

use std::path::PathBuf;
use thiserror::Error;

/// Errors detected before any solving starts.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The backend list was empty or absent
    #[error("No backends submitted")]
    NoBackends,

    /// One or more requested backends are not installed
    #[error("Could not load the inputted backend(s): {{{}}}", .names.join(", "))]
    UnknownBackends { names: Vec<String> },

    /// A requested name matches several installed backends
    #[error("Backend name '{name}' is ambiguous, it matches: {}", .candidates.join(", "))]
    AmbiguousBackend {
        name: String,
        candidates: Vec<String>,
    },

    /// The step of a parameter range points away from its stop value
    #[error("the {direction} param {name} is not {bound} bounded")]
    UnboundedRange {
        name: String,
        direction: &'static str,
        bound: &'static str,
    },

    /// Backend configuration values must be scalars
    #[error("Backend config values must be of type int, str, or bool (backend '{backend}', flag '{flag}')")]
    InvalidFlagValue { backend: String, flag: String },

    /// A timeout was given but holds no duration
    #[error("Timeout is empty")]
    EmptyTimeout,

    /// A timeout could not be parsed as a duration
    #[error("Invalid timeout: {0}")]
    InvalidTimeout(#[from] DurationError),

    /// Configuration file could not be read or parsed
    #[error("Invalid configuration file {path}: {message}")]
    InvalidFile { path: PathBuf, message: String },
}

impl ConfigError {
    /// Create an invalid configuration file error
    pub fn invalid_file(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::InvalidFile {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Errors from parsing a duration string.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DurationError {
    #[error("Cannot infer time unit for \"{token}\"")]
    MissingUnit { token: String },

    #[error("Cannot parse number \"{number}\" in \"{token}\"")]
    InvalidNumber { number: String, token: String },

    #[error("Number \"{number}\" in \"{token}\" must be non-negative")]
    Negative { number: String, token: String },

    #[error("Unknown time unit: \"{unit}\"")]
    UnknownUnit { unit: String },

    #[error("Cannot specify time unit \"{unit}\" twice")]
    DuplicateUnit { unit: String },

    #[error("Cannot read a duration from \"{token}\"")]
    Unmatched { token: String },

    #[error("Duration \"{input}\" is too large")]
    Overflow { input: String },
}

/// Errors raised by a solving engine while building or solving an instance.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The engine executable could not be started
    #[error("Failed to execute {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The engine exited unsuccessfully without producing a result
    #[error("{program} exited with {status}: {stderr}")]
    Exit {
        program: String,
        status: String,
        stderr: String,
    },

    /// The engine produced output that could not be interpreted
    #[error("Invalid engine output: {message}")]
    InvalidOutput { message: String },

    /// The solver reported an error for the instance
    #[error("Solver error: {message}")]
    Solver { message: String },

    /// A replay fixture has no more instances or results
    #[error("Replay fixture exhausted: {message}")]
    ReplayExhausted { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EngineError {
    /// Create an invalid output error
    pub fn invalid_output(message: impl Into<String>) -> Self {
        Self::InvalidOutput {
            message: message.into(),
        }
    }

    /// Create a replay exhausted error
    pub fn replay_exhausted(message: impl Into<String>) -> Self {
        Self::ReplayExhausted {
            message: message.into(),
        }
    }
}

/// Errors raised inside a reporter hook.
#[derive(Error, Debug)]
pub enum ReporterError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Hooks arrived in an order the reporter cannot record
    #[error("Reporter protocol violation in {reporter}: {message}")]
    Protocol {
        reporter: &'static str,
        message: String,
    },
}

impl ReporterError {
    pub fn protocol(reporter: &'static str, message: impl Into<String>) -> Self {
        Self::Protocol {
            reporter,
            message: message.into(),
        }
    }
}

/// Errors that end a run.
#[derive(Error, Debug)]
pub enum RunError {
    /// Instance build or solve failed; reporters have already been notified
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// A reporter hook failed
    #[error(transparent)]
    Reporter(#[from] ReporterError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type alias for run operations
pub type RunResult<T> = Result<T, RunError>;
