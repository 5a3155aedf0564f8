//! Solving engines
//!
//! The harness never solves anything itself. A [`SolvingEngine`] discovers
//! installed backends, builds instances of a model and solves them with a
//! timeout, returning the raw [`SolveResult`].
//!
//! - [`minizinc::MiniZincEngine`]: drives the `minizinc` executable.
//! - [`replay::ReplayEngine`]: replays results recorded by the fixture
//!   reporter.

pub mod minizinc;
pub mod replay;

pub use minizinc::MiniZincEngine;
pub use replay::ReplayEngine;

use crate::backend::{BackendIdentity, ExtraFlags};
use crate::error::EngineError;
use crate::outcome::{ProblemClass, SolveResult};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// A model bound to one backend and optional data, ready to solve.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    pub model: PathBuf,
    pub data_file: Option<PathBuf>,
    pub backend: BackendIdentity,
    /// Problem class stated by the model's solve item
    pub class: ProblemClass,
    /// Parameter assignments added on top of the data
    pub bindings: Vec<(String, i64)>,
}

impl Instance {
    pub fn new(
        model: impl Into<PathBuf>,
        data_file: Option<PathBuf>,
        backend: BackendIdentity,
        class: ProblemClass,
    ) -> Self {
        Self {
            model: model.into(),
            data_file,
            backend,
            class,
            bindings: Vec::new(),
        }
    }

    /// Assign an integer parameter, replacing an earlier assignment.
    pub fn bind_variable(&mut self, name: &str, value: i64) {
        match self.bindings.iter_mut().find(|(n, _)| n == name) {
            Some(binding) => binding.1 = value,
            None => self.bindings.push((name.to_string(), value)),
        }
    }
}

/// External solving capability consumed by the run driver.
pub trait SolvingEngine {
    /// Backends this engine can run.
    fn available_backends(&mut self) -> Result<Vec<BackendIdentity>, EngineError>;

    /// Build an instance of `model` for `backend`, attaching `data_file`.
    fn build_instance(
        &mut self,
        model: &Path,
        data_file: Option<&Path>,
        backend: &BackendIdentity,
    ) -> Result<Instance, EngineError>;

    /// Solve an instance. The engine enforces `timeout` itself and reports a
    /// timeout through the result status, not as an error.
    fn solve(
        &mut self,
        instance: &Instance,
        timeout: Duration,
        flags: &ExtraFlags,
    ) -> Result<SolveResult, EngineError>;
}

impl<E: SolvingEngine + ?Sized> SolvingEngine for Box<E> {
    fn available_backends(&mut self) -> Result<Vec<BackendIdentity>, EngineError> {
        (**self).available_backends()
    }

    fn build_instance(
        &mut self,
        model: &Path,
        data_file: Option<&Path>,
        backend: &BackendIdentity,
    ) -> Result<Instance, EngineError> {
        (**self).build_instance(model, data_file, backend)
    }

    fn solve(
        &mut self,
        instance: &Instance,
        timeout: Duration,
        flags: &ExtraFlags,
    ) -> Result<SolveResult, EngineError> {
        (**self).solve(instance, timeout, flags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_variable_replaces() {
        let mut instance = Instance::new(
            "model.mzn",
            None,
            BackendIdentity::new("gecode", "Gecode"),
            ProblemClass::Satisfy,
        );
        instance.bind_variable("n", 3);
        instance.bind_variable("m", 1);
        instance.bind_variable("n", 5);
        assert_eq!(
            instance.bindings,
            vec![("n".to_string(), 5), ("m".to_string(), 1)]
        );
    }
}
