//! Fixture reporter
//!
//! Records everything a run produced (run parameters, instance layout and
//! the raw result of every cell) into a JSON fixture. The
//! [`ReplayEngine`](crate::engine::ReplayEngine) feeds a fixture back
//! through the driver, so a recorded run can be reproduced without any
//! solver installed.

use super::{Cell, Intro, Reporter, ReporterResult};
use crate::backend::{BackendIdentity, ExtraFlags};
use crate::driver::{ParamBinding, ParamRange, Sweep};
use crate::error::{EngineError, ReporterError};
use crate::outcome::{Outcome, ProblemClass, SolveResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const REPORTER: &str = "FixtureReporter";

/// A recorded run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fixture {
    pub backends: Vec<BackendIdentity>,
    pub model_name: String,
    /// Timeout in milliseconds
    pub timeout: u64,
    pub is_csp: bool,
    pub vars: Vec<String>,
    pub param: Option<String>,
    pub is_data_file_run: bool,
    pub extra_flags: ExtraFlags,
    pub runs: Vec<FixtureRun>,
    pub num_instances: usize,
    pub num_backends: usize,
}

/// One instance of a recorded run, with one result per backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureRun {
    pub instance_index: usize,
    pub param_name: Option<String>,
    pub param_value: Option<i64>,
    pub data_file: Option<PathBuf>,
    pub results: Vec<RecordedOutcome>,
}

/// Raw result of one cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedOutcome {
    pub method: ProblemClass,
    pub all_solutions: bool,
    pub result: SolveResult,
}

impl From<&Outcome> for RecordedOutcome {
    fn from(outcome: &Outcome) -> Self {
        Self {
            method: outcome.class(),
            all_solutions: outcome.all_solutions_mode(),
            result: outcome.result().clone(),
        }
    }
}

impl Fixture {
    fn from_intro(intro: &Intro<'_>) -> Self {
        Self {
            backends: intro.backends.to_vec(),
            model_name: intro.model_name.to_string(),
            timeout: intro.timeout_ms,
            is_csp: intro.is_csp,
            vars: intro.vars.to_vec(),
            param: intro.param_name.map(str::to_string),
            is_data_file_run: intro.is_data_file_run,
            extra_flags: intro.extra_flags.clone(),
            runs: Vec::new(),
            num_instances: 0,
            num_backends: intro.backends.len(),
        }
    }

    /// Load a fixture from a JSON file.
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Write the fixture as pretty-printed JSON, replacing the file.
    pub fn save(&self, path: &Path) -> Result<(), ReporterError> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content + "\n")?;
        Ok(())
    }

    /// The sweep that reproduces this recording.
    ///
    /// Data file runs replay their files in order, parameter runs are
    /// rebuilt from the first and last values with the step between the
    /// first two.
    pub fn sweep(&self) -> Result<Sweep, EngineError> {
        let first = self
            .runs
            .first()
            .ok_or_else(|| EngineError::invalid_output("fixture contains no runs"))?;

        if first.data_file.is_some() && first.param_name.is_some() {
            return Err(EngineError::invalid_output(
                "fixture run has both a data file and a parameter",
            ));
        }

        if first.data_file.is_some() {
            let files = self
                .runs
                .iter()
                .map(|run| {
                    run.data_file.clone().ok_or_else(|| {
                        EngineError::invalid_output(format!(
                            "run {} has no data file",
                            run.instance_index
                        ))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(Sweep::DataFiles(files));
        }

        if let Some(name) = &first.param_name {
            let values = self
                .runs
                .iter()
                .map(|run| {
                    run.param_value.ok_or_else(|| {
                        EngineError::invalid_output(format!(
                            "run {} has no parameter value",
                            run.instance_index
                        ))
                    })
                })
                .collect::<Result<Vec<i64>, _>>()?;
            let start = values[0];
            let stop = values[values.len() - 1];
            let step = values.get(1).map(|next| next - start).unwrap_or(1);
            let range = ParamRange::new(name.clone(), start, stop, step)
                .map_err(|e| EngineError::invalid_output(e.to_string()))?;
            return Ok(Sweep::Param(range));
        }

        Ok(Sweep::Single)
    }
}

/// Writes a [`Fixture`] of the run to a file at `outro`.
#[derive(Debug)]
pub struct FixtureReporter {
    path: PathBuf,
    fixture: Option<Fixture>,
}

impl FixtureReporter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            fixture: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn fixture_mut(&mut self, hook: &str) -> Result<&mut Fixture, ReporterError> {
        self.fixture
            .as_mut()
            .ok_or_else(|| ReporterError::protocol(REPORTER, format!("{hook} before intro")))
    }
}

impl Reporter for FixtureReporter {
    fn name(&self) -> &str {
        REPORTER
    }

    fn set_up(&mut self, _param_name: Option<&str>) -> ReporterResult {
        self.fixture = None;
        Ok(())
    }

    fn intro(&mut self, intro: &Intro<'_>) -> ReporterResult {
        self.fixture = Some(Fixture::from_intro(intro));
        Ok(())
    }

    fn pre_run(&mut self, cell: &Cell<'_>) -> ReporterResult {
        let fixture = self.fixture_mut("pre_run")?;
        fixture.num_instances = cell.num_instances;

        let expected = if cell.backend_index == 0 {
            cell.instance_index
        } else {
            cell.instance_index + 1
        };
        if fixture.runs.len() != expected {
            return Err(ReporterError::protocol(
                REPORTER,
                format!(
                    "instance {} backend {} arrived with {} runs recorded",
                    cell.instance_index,
                    cell.backend_index,
                    fixture.runs.len()
                ),
            ));
        }

        if cell.backend_index == 0 {
            fixture.runs.push(FixtureRun {
                instance_index: cell.instance_index,
                param_name: cell.param.map(|p| p.name.clone()),
                param_value: cell.param.map(|p| p.value),
                data_file: cell.data_file.map(Path::to_path_buf),
                results: Vec::new(),
            });
        }
        Ok(())
    }

    fn instance(
        &mut self,
        outcomes: &[Outcome],
        param: Option<&ParamBinding>,
        data_file: Option<&Path>,
    ) -> ReporterResult {
        let fixture = self.fixture_mut("instance")?;
        let run = fixture
            .runs
            .last_mut()
            .ok_or_else(|| ReporterError::protocol(REPORTER, "instance without pre_run"))?;

        if run.param_name.as_deref() != param.map(|p| p.name.as_str())
            || run.param_value != param.map(|p| p.value)
            || run.data_file.as_deref() != data_file
        {
            return Err(ReporterError::protocol(
                REPORTER,
                format!("instance {} does not match its pre_run", run.instance_index),
            ));
        }

        run.results = outcomes.iter().map(RecordedOutcome::from).collect();
        Ok(())
    }

    fn outro(&mut self) -> ReporterResult {
        let path = self.path.clone();
        self.fixture_mut("outro")?.save(&path)
    }

    fn tear_down(&mut self) -> ReporterResult {
        self.fixture = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::Status;
    use std::time::Duration;
    use tempfile::tempdir;

    fn backends() -> Vec<BackendIdentity> {
        vec![
            BackendIdentity::new("gecode", "Gecode"),
            BackendIdentity::new("chuffed", "Chuffed"),
        ]
    }

    fn make_outcome(status: Status, ms: u64) -> Outcome {
        Outcome::new(
            ProblemClass::Satisfy,
            SolveResult::new(status).with_time(Duration::from_millis(ms)),
            false,
            &[],
        )
    }

    fn record_param_run(reporter: &mut FixtureReporter, values: &[i64]) {
        let backends = backends();
        let flags = ExtraFlags::parse("-p 2");
        reporter.set_up(Some("n")).unwrap();
        for (i, value) in values.iter().enumerate() {
            let binding = ParamBinding::new("n", *value);
            let mut outcomes = Vec::new();
            for (b, backend) in backends.iter().enumerate() {
                if i == 0 && b == 0 {
                    reporter
                        .intro(&Intro {
                            backends: &backends,
                            model_name: "queens.mzn",
                            timeout_ms: 1000,
                            is_csp: true,
                            vars: &[],
                            param_name: Some("n"),
                            is_data_file_run: false,
                            extra_flags: &flags,
                        })
                        .unwrap();
                }
                let cell = Cell {
                    backend,
                    backend_index: b,
                    num_backends: backends.len(),
                    instance_index: i,
                    num_instances: values.len(),
                    param: Some(&binding),
                    data_file: None,
                };
                reporter.pre_run(&cell).unwrap();
                let outcome = make_outcome(Status::Satisfied, 10 * (b as u64 + 1));
                reporter.post_run(&cell, &outcome).unwrap();
                outcomes.push(outcome);
            }
            reporter.instance(&outcomes, Some(&binding), None).unwrap();
        }
        reporter.outro().unwrap();
        reporter.tear_down().unwrap();
    }

    #[test]
    fn test_records_param_run() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("queens.json");
        let mut reporter = FixtureReporter::new(&path);
        record_param_run(&mut reporter, &[1, 3, 5]);

        let fixture = Fixture::load(&path).unwrap();
        assert_eq!(fixture.backends, backends());
        assert_eq!(fixture.num_backends, 2);
        assert_eq!(fixture.num_instances, 3);
        assert_eq!(fixture.param.as_deref(), Some("n"));
        assert_eq!(fixture.extra_flags, ExtraFlags::parse("-p 2"));
        assert_eq!(fixture.runs.len(), 3);
        assert_eq!(fixture.runs[2].param_value, Some(5));
        assert_eq!(fixture.runs[1].results.len(), 2);
        assert_eq!(
            fixture.runs[1].results[1].result.statistics.time_ms,
            Some(20)
        );
    }

    #[test]
    fn test_sweep_from_param_fixture() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("queens.json");
        let mut reporter = FixtureReporter::new(&path);
        record_param_run(&mut reporter, &[1, 3, 5]);

        let sweep = Fixture::load(&path).unwrap().sweep().unwrap();
        match sweep {
            Sweep::Param(range) => assert_eq!(range.values(), vec![1, 3, 5]),
            other => panic!("unexpected sweep: {other:?}"),
        }
    }

    #[test]
    fn test_pre_run_before_intro_is_protocol_error() {
        let mut reporter = FixtureReporter::new("unused.json");
        let backends = backends();
        let cell = Cell {
            backend: &backends[0],
            backend_index: 0,
            num_backends: 2,
            instance_index: 0,
            num_instances: 1,
            param: None,
            data_file: None,
        };
        assert!(matches!(
            reporter.pre_run(&cell),
            Err(ReporterError::Protocol { .. })
        ));
    }

    #[test]
    fn test_instance_mismatch_is_protocol_error() {
        let backends = backends();
        let flags = ExtraFlags::new();
        let mut reporter = FixtureReporter::new("unused.json");
        reporter.set_up(None).unwrap();
        reporter
            .intro(&Intro {
                backends: &backends,
                model_name: "m.mzn",
                timeout_ms: 10,
                is_csp: true,
                vars: &[],
                param_name: None,
                is_data_file_run: true,
                extra_flags: &flags,
            })
            .unwrap();
        reporter
            .pre_run(&Cell {
                backend: &backends[0],
                backend_index: 0,
                num_backends: 2,
                instance_index: 0,
                num_instances: 1,
                param: None,
                data_file: Some(Path::new("a.dzn")),
            })
            .unwrap();

        let err = reporter
            .instance(&[], None, Some(Path::new("b.dzn")))
            .unwrap_err();
        assert!(matches!(err, ReporterError::Protocol { .. }));
    }

    #[test]
    fn test_sweep_of_single_and_data_file_fixtures() {
        let mut fixture = Fixture {
            backends: backends(),
            model_name: "m.mzn".into(),
            timeout: 10,
            is_csp: true,
            vars: Vec::new(),
            param: None,
            is_data_file_run: false,
            extra_flags: ExtraFlags::new(),
            runs: vec![FixtureRun {
                instance_index: 0,
                param_name: None,
                param_value: None,
                data_file: None,
                results: Vec::new(),
            }],
            num_instances: 1,
            num_backends: 2,
        };
        assert!(matches!(fixture.sweep().unwrap(), Sweep::Single));

        fixture.runs[0].data_file = Some(PathBuf::from("a.dzn"));
        match fixture.sweep().unwrap() {
            Sweep::DataFiles(files) => assert_eq!(files, vec![PathBuf::from("a.dzn")]),
            other => panic!("unexpected sweep: {other:?}"),
        }

        fixture.runs.clear();
        assert!(fixture.sweep().is_err());
    }
}
