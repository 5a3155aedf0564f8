//! Run driver
//!
//! Sweeps a model over its instances (a single instance, a range of values
//! for one integer parameter, or a list of data files) and solves each
//! instance with every selected backend, reporting through the reporter
//! protocol as it goes.
//!
//! Cells run strictly in order: instance by instance, backend by backend.
//! An engine failure notifies the reporters through `exception` and ends the
//! run with [`RunError::Engine`].

use crate::backend::{resolve_backends, BackendFlags, BackendIdentity, ExtraFlags};
use crate::engine::SolvingEngine;
use crate::error::{ConfigError, EngineError, RunResult};
use crate::outcome::{Outcome, ProblemClass};
use crate::reporter::{Cell, Intro, Reporter, Reporters};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

/// An integer parameter assigned for one instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamBinding {
    pub name: String,
    pub value: i64,
}

impl ParamBinding {
    pub fn new(name: impl Into<String>, value: i64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Values for one integer parameter, `start` to `stop` inclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamRange {
    name: String,
    start: i64,
    stop: i64,
    step: i64,
}

impl ParamRange {
    /// Validate a range. The step must move `start` towards `stop`; when the
    /// two are equal the step is ignored.
    pub fn new(name: impl Into<String>, start: i64, stop: i64, step: i64) -> Result<Self, ConfigError> {
        let name = name.into();
        if start < stop && step <= 0 {
            return Err(ConfigError::UnboundedRange {
                name,
                direction: "non-increasing",
                bound: "lower",
            });
        }
        if start > stop && step >= 0 {
            return Err(ConfigError::UnboundedRange {
                name,
                direction: "non-decreasing",
                bound: "upper",
            });
        }
        Ok(Self {
            name,
            start,
            stop,
            step,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Every value of the range, in sweep order.
    ///
    /// `stop` is included when the steps land on it exactly; otherwise the
    /// last value is the final step that does not pass it.
    pub fn values(&self) -> Vec<i64> {
        if self.start == self.stop {
            return vec![self.start];
        }
        let step = i128::from(self.step);
        let stop = i128::from(self.stop);
        let mut value = i128::from(self.start);
        let mut values = Vec::new();
        while (step > 0 && value <= stop) || (step < 0 && value >= stop) {
            values.push(value as i64);
            value += step;
        }
        values
    }
}

/// The instances a run sweeps over
#[derive(Debug, Clone, PartialEq)]
pub enum Sweep {
    /// The model with no extra data
    Single,
    Param(ParamRange),
    /// One instance per data file, duplicates removed
    DataFiles(Vec<PathBuf>),
}

/// Run inputs as the caller supplies them
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub model: PathBuf,
    pub timeout: Duration,
    /// Variables whose values are reported
    pub vars: Vec<String>,
    /// Backend names or ids to resolve against the engine's backends
    pub backends: Vec<String>,
    /// Flags passed to every backend; they win over `backend_flags`
    pub extra_flags: ExtraFlags,
    pub backend_flags: BackendFlags,
}

/// Validated run inputs, fixed for the lifetime of a driver
#[derive(Debug, Clone)]
pub struct RunContext {
    pub model: PathBuf,
    pub timeout: Duration,
    pub vars: Vec<String>,
    pub backends: Vec<BackendIdentity>,
    pub extra_flags: ExtraFlags,
    pub backend_flags: BackendFlags,
}

impl RunContext {
    fn model_name(&self) -> String {
        self.model.display().to_string()
    }

    fn timeout_ms(&self) -> u64 {
        self.timeout.as_millis() as u64
    }
}

/// One instance of a sweep, before a backend is chosen
#[derive(Debug, Clone, Default)]
struct InstanceSpec {
    param: Option<ParamBinding>,
    data_file: Option<PathBuf>,
}

/// Where one sweep stands, shared by all its cells
struct SweepState<'a> {
    param_name: Option<&'a str>,
    is_data_file_run: bool,
    num_instances: usize,
    problem_class: Option<ProblemClass>,
}

/// Drives a solving engine over a sweep and notifies reporters.
pub struct RunDriver<E> {
    engine: E,
    context: RunContext,
    reporters: Reporters,
}

impl<E: SolvingEngine> RunDriver<E> {
    /// Resolve the requested backends against the engine and prepare a run.
    pub fn new(mut engine: E, settings: RunSettings, reporters: Reporters) -> RunResult<Self> {
        if settings.backends.is_empty() {
            return Err(ConfigError::NoBackends.into());
        }
        let installed = engine.available_backends()?;
        let backends = resolve_backends(&settings.backends, &installed)?;
        info!(
            backends = ?backends.iter().map(|b| b.id.as_str()).collect::<Vec<_>>(),
            model = %settings.model.display(),
            "Resolved backends"
        );

        Ok(Self {
            engine,
            context: RunContext {
                model: settings.model,
                timeout: settings.timeout,
                vars: settings.vars,
                backends,
                extra_flags: settings.extra_flags,
                backend_flags: settings.backend_flags,
            },
            reporters,
        })
    }

    pub fn context(&self) -> &RunContext {
        &self.context
    }

    pub fn backends(&self) -> &[BackendIdentity] {
        &self.context.backends
    }

    pub fn reporters(&self) -> &Reporters {
        &self.reporters
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Consume the driver, returning the engine and the reporters.
    pub fn into_parts(self) -> (E, Reporters) {
        (self.engine, self.reporters)
    }

    /// Solve the model once with every backend.
    pub fn run(&mut self) -> RunResult<()> {
        self.sweep(None, false, vec![InstanceSpec::default()])
    }

    /// Solve the model once per value of an integer parameter.
    pub fn run_with_param(&mut self, name: &str, start: i64, stop: i64, step: i64) -> RunResult<()> {
        let range = ParamRange::new(name, start, stop, step)?;
        self.run_with_range(&range)
    }

    pub fn run_with_range(&mut self, range: &ParamRange) -> RunResult<()> {
        let instances = range
            .values()
            .into_iter()
            .map(|value| InstanceSpec {
                param: Some(ParamBinding::new(range.name(), value)),
                data_file: None,
            })
            .collect();
        self.sweep(Some(range.name()), false, instances)
    }

    /// Solve the model once per data file. Repeated files run once, at their
    /// first position.
    pub fn run_with_data_files(&mut self, data_files: &[PathBuf]) -> RunResult<()> {
        let mut seen = HashSet::new();
        let instances = data_files
            .iter()
            .filter(|file| seen.insert(file.as_path()))
            .map(|file| InstanceSpec {
                param: None,
                data_file: Some(file.clone()),
            })
            .collect();
        self.sweep(None, true, instances)
    }

    pub fn execute(&mut self, sweep: &Sweep) -> RunResult<()> {
        match sweep {
            Sweep::Single => self.run(),
            Sweep::Param(range) => self.run_with_range(range),
            Sweep::DataFiles(files) => self.run_with_data_files(files),
        }
    }

    fn sweep(
        &mut self,
        param_name: Option<&str>,
        is_data_file_run: bool,
        instances: Vec<InstanceSpec>,
    ) -> RunResult<()> {
        let mut state = SweepState {
            param_name,
            is_data_file_run,
            num_instances: instances.len(),
            problem_class: None,
        };
        info!(
            instances = state.num_instances,
            backends = self.context.backends.len(),
            param = ?param_name,
            "Starting sweep"
        );

        self.reporters.set_up(param_name)?;

        for (instance_index, spec) in instances.iter().enumerate() {
            let mut outcomes = Vec::with_capacity(self.context.backends.len());
            for backend_index in 0..self.context.backends.len() {
                outcomes.push(self.run_cell(&mut state, instance_index, backend_index, spec)?);
            }
            self.reporters
                .instance(&outcomes, spec.param.as_ref(), spec.data_file.as_deref())?;
        }

        self.reporters.outro()?;
        self.reporters.tear_down()?;
        info!("Sweep finished");
        Ok(())
    }

    fn run_cell(
        &mut self,
        state: &mut SweepState<'_>,
        instance_index: usize,
        backend_index: usize,
        spec: &InstanceSpec,
    ) -> RunResult<Outcome> {
        let Self {
            engine,
            context,
            reporters,
        } = self;
        let backend = &context.backends[backend_index];

        let mut instance = engine
            .build_instance(&context.model, spec.data_file.as_deref(), backend)
            .map_err(|e| abort(reporters, e))?;

        if let Some(class) = state.problem_class {
            if class != instance.class {
                warn!(
                    backend = %backend.id,
                    expected = %class,
                    found = %instance.class,
                    "Instance problem class differs from the first instance"
                );
            }
        } else {
            state.problem_class = Some(instance.class);
        }

        if instance_index == 0 && backend_index == 0 {
            let model_name = context.model_name();
            reporters.intro(&Intro {
                backends: &context.backends,
                model_name: &model_name,
                timeout_ms: context.timeout_ms(),
                is_csp: instance.class.is_csp(),
                vars: &context.vars,
                param_name: state.param_name,
                is_data_file_run: state.is_data_file_run,
                extra_flags: &context.extra_flags,
            })?;
        }

        let cell = Cell {
            backend,
            backend_index,
            num_backends: context.backends.len(),
            instance_index,
            num_instances: state.num_instances,
            param: spec.param.as_ref(),
            data_file: spec.data_file.as_deref(),
        };
        reporters.pre_run(&cell)?;

        if let Some(param) = &spec.param {
            instance.bind_variable(&param.name, param.value);
        }
        let flags = context.backend_flags.merged(&backend.id, &context.extra_flags);
        debug!(
            backend = %backend.id,
            instance = instance_index,
            flags = ?flags.to_args(),
            "Solving"
        );

        let result = engine
            .solve(&instance, context.timeout, &flags)
            .map_err(|e| abort(reporters, e))?;
        let outcome = Outcome::new(
            instance.class,
            result,
            flags.requests_all_solutions(),
            &context.vars,
        );
        debug!(
            backend = %backend.id,
            instance = instance_index,
            status = %outcome.status(),
            time_ms = outcome.time_ms(),
            "Solved"
        );

        reporters.post_run(&cell, &outcome)?;
        Ok(outcome)
    }
}

/// Tell the reporters about an engine failure and turn it into the error
/// that ends the run.
fn abort(reporters: &mut Reporters, error: EngineError) -> crate::error::RunError {
    if let Err(reporter_error) = reporters.exception(&error) {
        warn!(error = %reporter_error, "Reporter failed while handling an engine error");
    }
    error.into()
}

impl<E> std::fmt::Debug for RunDriver<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunDriver")
            .field("context", &self.context)
            .field("reporters", &self.reporters)
            .finish()
    }
}
