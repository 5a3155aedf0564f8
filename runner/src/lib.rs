//! Constraint Model Experiment Runner
//!
//! This library runs one constraint model across several solver backends
//! and reports how they did:
//! - Sweeps over a single instance, an integer parameter range, or data files
//! - Outcome records with status predicates and a best-outcome ranking
//! - Reporters for LaTeX tables, JSON records, progress logs and replayable
//!   fixtures
//! - Duration strings such as `1h 2m 3s` for timeouts
//!
//! # Modules
//!
//! - [`driver`]: The sweep loop and the reporter protocol dispatch
//! - [`engine`]: Solving engines (`minizinc` executable, fixture replay)
//! - [`outcome`]: Outcome records and their comparator
//! - [`reporter`]: The reporter protocol and its implementations
//! - [`backend`]: Backend resolution and extra solver flags
//! - [`duration`]: Duration string parsing

pub mod backend;
pub mod driver;
pub mod duration;
pub mod engine;
pub mod error;
pub mod outcome;
pub mod reporter;

pub use backend::{BackendFlags, BackendIdentity, ExtraFlags, FlagValue};
pub use driver::{ParamBinding, ParamRange, RunDriver, RunSettings, Sweep};
pub use duration::{DurationParser, TimeUnit};
pub use engine::{Instance, MiniZincEngine, ReplayEngine, SolvingEngine};
pub use error::{ConfigError, DurationError, EngineError, ReporterError, RunError, RunResult};
pub use outcome::{best_outcome, Objective, Outcome, ProblemClass, SolveResult, Statistics, Status};
pub use reporter::{
    Fixture, FixtureReporter, LogReporter, RecordReporter, Reporter, Reporters,
    TableReporter,
};
