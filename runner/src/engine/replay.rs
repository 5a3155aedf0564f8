//! Replay engine
//!
//! Serves the instances and results of a recorded [`Fixture`] in the order
//! the driver asks for them, so a recorded run can be pushed through the
//! reporters again without a solver.

use super::{Instance, SolvingEngine};
use crate::backend::{BackendIdentity, ExtraFlags};
use crate::error::EngineError;
use crate::outcome::SolveResult;
use crate::reporter::Fixture;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Engine backed by a recorded fixture
#[derive(Debug, Clone)]
pub struct ReplayEngine {
    fixture: Fixture,
    instance_index: usize,
    backend_index: usize,
}

impl ReplayEngine {
    pub fn new(fixture: Fixture) -> Self {
        Self {
            fixture,
            instance_index: 0,
            backend_index: 0,
        }
    }

    /// Load the fixture at `path`.
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        Ok(Self::new(Fixture::load(path)?))
    }

    pub fn fixture(&self) -> &Fixture {
        &self.fixture
    }

    /// Whether every recorded result has been served
    pub fn is_exhausted(&self) -> bool {
        self.instance_index >= self.fixture.runs.len()
    }

    fn advance(&mut self) {
        self.backend_index += 1;
        if self.backend_index >= self.fixture.backends.len() {
            self.backend_index = 0;
            self.instance_index += 1;
        }
    }
}

impl SolvingEngine for ReplayEngine {
    fn available_backends(&mut self) -> Result<Vec<BackendIdentity>, EngineError> {
        Ok(self.fixture.backends.clone())
    }

    fn build_instance(
        &mut self,
        model: &Path,
        data_file: Option<&Path>,
        backend: &BackendIdentity,
    ) -> Result<Instance, EngineError> {
        let run = self.fixture.runs.get(self.instance_index).ok_or_else(|| {
            EngineError::replay_exhausted(format!(
                "no recorded instance {}",
                self.instance_index
            ))
        })?;
        let first = run.results.first().ok_or_else(|| {
            EngineError::replay_exhausted(format!(
                "instance {} has no recorded results",
                run.instance_index
            ))
        })?;

        Ok(Instance::new(
            model,
            data_file.map(Path::to_path_buf),
            backend.clone(),
            first.method,
        ))
    }

    fn solve(
        &mut self,
        instance: &Instance,
        _timeout: Duration,
        _flags: &ExtraFlags,
    ) -> Result<SolveResult, EngineError> {
        let expected = self.fixture.backends.get(self.backend_index);
        if expected.map(|b| b.id.as_str()) != Some(instance.backend.id.as_str()) {
            return Err(EngineError::invalid_output(format!(
                "replay expected backend {:?}, got {}",
                expected.map(|b| b.id.as_str()),
                instance.backend.id
            )));
        }

        let recorded = self
            .fixture
            .runs
            .get(self.instance_index)
            .and_then(|run| run.results.get(self.backend_index))
            .ok_or_else(|| {
                EngineError::replay_exhausted(format!(
                    "no result for instance {} backend {}",
                    self.instance_index, self.backend_index
                ))
            })?;
        let result = recorded.result.clone();

        debug!(
            instance = self.instance_index,
            backend = %instance.backend.id,
            status = %result.status,
            "Replaying recorded result"
        );
        self.advance();
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::{ProblemClass, Status};
    use crate::reporter::{FixtureRun, RecordedOutcome};

    fn make_fixture() -> Fixture {
        let recorded = |status| RecordedOutcome {
            method: ProblemClass::Minimize,
            all_solutions: false,
            result: SolveResult::new(status),
        };
        Fixture {
            backends: vec![
                BackendIdentity::new("gecode", "Gecode"),
                BackendIdentity::new("chuffed", "Chuffed"),
            ],
            model_name: "m.mzn".into(),
            timeout: 100,
            is_csp: false,
            vars: Vec::new(),
            param: None,
            is_data_file_run: false,
            extra_flags: ExtraFlags::new(),
            runs: vec![FixtureRun {
                instance_index: 0,
                param_name: None,
                param_value: None,
                data_file: None,
                results: vec![
                    recorded(Status::OptimalSolution),
                    recorded(Status::Unknown),
                ],
            }],
            num_instances: 1,
            num_backends: 2,
        }
    }

    #[test]
    fn test_replays_results_in_order() {
        let mut engine = ReplayEngine::new(make_fixture());
        let backends = engine.available_backends().unwrap();
        let flags = ExtraFlags::new();

        let mut statuses = Vec::new();
        for backend in &backends {
            let instance = engine
                .build_instance(Path::new("m.mzn"), None, backend)
                .unwrap();
            assert_eq!(instance.class, ProblemClass::Minimize);
            let result = engine
                .solve(&instance, Duration::from_millis(100), &flags)
                .unwrap();
            statuses.push(result.status);
        }

        assert_eq!(statuses, vec![Status::OptimalSolution, Status::Unknown]);
        assert!(engine.is_exhausted());
        assert!(matches!(
            engine.build_instance(Path::new("m.mzn"), None, &backends[0]),
            Err(EngineError::ReplayExhausted { .. })
        ));
    }

    #[test]
    fn test_backend_mismatch_is_error() {
        let mut engine = ReplayEngine::new(make_fixture());
        let other = BackendIdentity::new("chuffed", "Chuffed");
        let instance = engine
            .build_instance(Path::new("m.mzn"), None, &other)
            .unwrap();
        assert!(matches!(
            engine.solve(&instance, Duration::ZERO, &ExtraFlags::new()),
            Err(EngineError::InvalidOutput { .. })
        ));
    }
}
