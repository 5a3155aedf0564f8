//! Reporter protocol
//!
//! The run driver notifies every reporter at fixed points of a run:
//!
//! ```text
//! set_up ─► intro ─► ( pre_run ─► post_run )* per backend ─► instance ─► ... ─► outro ─► tear_down
//!                                                   └─ exception (engine failure, run aborts)
//! ```
//!
//! `intro` fires once, before the first cell of the run. All hooks default to
//! no-ops so a reporter only implements what it needs. [`Reporters`] holds
//! the configured reporters and calls each hook on all of them in order,
//! stopping at the first error.

pub mod fixture;
pub mod log;
pub mod record;
pub mod table;

pub use fixture::{Fixture, FixtureReporter, FixtureRun, RecordedOutcome};
pub use log::LogReporter;
pub use record::RecordReporter;
pub use table::TableReporter;

use crate::backend::{BackendIdentity, ExtraFlags};
use crate::driver::ParamBinding;
use crate::error::{EngineError, ReporterError};
use crate::outcome::Outcome;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Result type alias for reporter hooks
pub type ReporterResult = Result<(), ReporterError>;

/// Run-wide information sent once before the first cell
#[derive(Debug, Clone, Copy)]
pub struct Intro<'a> {
    pub backends: &'a [BackendIdentity],
    pub model_name: &'a str,
    pub timeout_ms: u64,
    pub is_csp: bool,
    pub vars: &'a [String],
    /// Name of the swept parameter, if any
    pub param_name: Option<&'a str>,
    pub is_data_file_run: bool,
    /// Global extra flags
    pub extra_flags: &'a ExtraFlags,
}

/// Position of one (instance, backend) cell in the sweep
#[derive(Debug, Clone, Copy)]
pub struct Cell<'a> {
    pub backend: &'a BackendIdentity,
    pub backend_index: usize,
    pub num_backends: usize,
    pub instance_index: usize,
    pub num_instances: usize,
    pub param: Option<&'a ParamBinding>,
    pub data_file: Option<&'a Path>,
}

/// Lifecycle hooks of a run. Every hook defaults to doing nothing.
pub trait Reporter {
    fn name(&self) -> &str;

    /// Start of a run; `param_name` is set for parameter sweeps.
    fn set_up(&mut self, _param_name: Option<&str>) -> ReporterResult {
        Ok(())
    }

    fn intro(&mut self, _intro: &Intro<'_>) -> ReporterResult {
        Ok(())
    }

    fn pre_run(&mut self, _cell: &Cell<'_>) -> ReporterResult {
        Ok(())
    }

    fn post_run(&mut self, _cell: &Cell<'_>, _outcome: &Outcome) -> ReporterResult {
        Ok(())
    }

    /// All outcomes of one instance, in backend order.
    fn instance(
        &mut self,
        _outcomes: &[Outcome],
        _param: Option<&ParamBinding>,
        _data_file: Option<&Path>,
    ) -> ReporterResult {
        Ok(())
    }

    fn outro(&mut self) -> ReporterResult {
        Ok(())
    }

    fn tear_down(&mut self) -> ReporterResult {
        Ok(())
    }

    /// An instance could not be built or solved; the run ends after this.
    fn exception(&mut self, _error: &EngineError) -> ReporterResult {
        Ok(())
    }
}

impl std::fmt::Debug for dyn Reporter + '_ {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Reporter({})", self.name())
    }
}

/// Ordered list of reporters that forwards every hook to each of them.
#[derive(Default)]
pub struct Reporters {
    reporters: Vec<Box<dyn Reporter>>,
}

impl std::fmt::Debug for Reporters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names = self
            .reporters
            .iter()
            .map(|r| r.name())
            .collect::<Vec<&str>>()
            .join(", ");
        f.debug_struct("Reporters").field("reporters", &names).finish()
    }
}

impl Reporters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_vec(reporters: Vec<Box<dyn Reporter>>) -> Self {
        Self { reporters }
    }

    pub fn add<R: Reporter + 'static>(&mut self, reporter: R) {
        self.reporters.push(Box::new(reporter));
    }

    pub fn add_boxed(&mut self, reporter: Box<dyn Reporter>) {
        self.reporters.push(reporter);
    }

    pub fn len(&self) -> usize {
        self.reporters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reporters.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Reporter> {
        self.reporters.iter().map(|r| r.as_ref())
    }
}

impl FromIterator<Box<dyn Reporter>> for Reporters {
    fn from_iter<I: IntoIterator<Item = Box<dyn Reporter>>>(iter: I) -> Self {
        Self {
            reporters: iter.into_iter().collect(),
        }
    }
}

impl Reporter for Reporters {
    fn name(&self) -> &str {
        "Reporters"
    }

    fn set_up(&mut self, param_name: Option<&str>) -> ReporterResult {
        self.reporters
            .iter_mut()
            .try_for_each(|r| r.set_up(param_name))
    }

    fn intro(&mut self, intro: &Intro<'_>) -> ReporterResult {
        self.reporters.iter_mut().try_for_each(|r| r.intro(intro))
    }

    fn pre_run(&mut self, cell: &Cell<'_>) -> ReporterResult {
        self.reporters.iter_mut().try_for_each(|r| r.pre_run(cell))
    }

    fn post_run(&mut self, cell: &Cell<'_>, outcome: &Outcome) -> ReporterResult {
        self.reporters
            .iter_mut()
            .try_for_each(|r| r.post_run(cell, outcome))
    }

    fn instance(
        &mut self,
        outcomes: &[Outcome],
        param: Option<&ParamBinding>,
        data_file: Option<&Path>,
    ) -> ReporterResult {
        self.reporters
            .iter_mut()
            .try_for_each(|r| r.instance(outcomes, param, data_file))
    }

    fn outro(&mut self) -> ReporterResult {
        self.reporters.iter_mut().try_for_each(|r| r.outro())
    }

    fn tear_down(&mut self) -> ReporterResult {
        self.reporters.iter_mut().try_for_each(|r| r.tear_down())
    }

    fn exception(&mut self, error: &EngineError) -> ReporterResult {
        self.reporters
            .iter_mut()
            .try_for_each(|r| r.exception(error))
    }
}

/// Destination of line-oriented report output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sink {
    Stdout,
    /// Appended to; created when missing
    File(PathBuf),
}

impl Sink {
    pub fn from_path(path: Option<PathBuf>) -> Self {
        path.map(Self::File).unwrap_or(Self::Stdout)
    }

    /// Write `text` followed by a newline.
    pub fn write_line(&self, text: &str) -> std::io::Result<()> {
        match self {
            Self::Stdout => {
                let mut out = std::io::stdout().lock();
                writeln!(out, "{}", text)
            }
            Self::File(path) => {
                let mut file = OpenOptions::new().create(true).append(true).open(path)?;
                writeln!(file, "{}", text)
            }
        }
    }
}

/// Local time in the format used by report headers and log files
pub(crate) fn timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}
