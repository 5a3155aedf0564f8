//! JSON record reporter
//!
//! Collects one flat record per (instance, backend) cell and writes them as
//! `{"runs": [...]}` when the run ends.

use super::{Cell, Reporter, ReporterResult};
use crate::outcome::{Objective, Outcome};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// One solve attempt as written to the record file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunRecord {
    pub backend_id: String,
    pub backend_name: String,
    pub instance_index: usize,
    pub data_file: Option<PathBuf>,
    /// `{name: value}` of the swept parameter
    pub param: Option<BTreeMap<String, i64>>,
    pub objective: Option<Objective>,
    pub error: bool,
    pub unknown: bool,
    pub unsat: bool,
    pub sat: bool,
    pub all_solutions: bool,
    pub optimal_solution: bool,
    pub is_csp: bool,
    pub is_cop: bool,
    pub timed_out: bool,
    /// Milliseconds
    pub time: u64,
    pub has_solution: bool,
    pub vars: Map<String, Value>,
}

impl RunRecord {
    pub fn new(cell: &Cell<'_>, outcome: &Outcome) -> Self {
        Self {
            backend_id: cell.backend.id.clone(),
            backend_name: cell.backend.name.clone(),
            instance_index: cell.instance_index,
            data_file: cell.data_file.map(Path::to_path_buf),
            param: cell
                .param
                .map(|p| BTreeMap::from([(p.name.clone(), p.value)])),
            objective: outcome.objective(),
            error: outcome.error(),
            unknown: outcome.unknown(),
            unsat: outcome.unsat(),
            sat: outcome.sat(),
            all_solutions: outcome.all_solutions_reached(),
            optimal_solution: outcome.optimal(),
            is_csp: outcome.is_csp(),
            is_cop: outcome.is_cop(),
            timed_out: outcome.timed_out(),
            time: outcome.time_ms(),
            has_solution: outcome.has_solution(),
            vars: outcome.all_vars(),
        }
    }
}

#[derive(Serialize)]
struct RecordFile<'a> {
    runs: &'a [RunRecord],
}

/// Writes every cell of a run to a JSON file, replacing it at `outro`.
#[derive(Debug)]
pub struct RecordReporter {
    path: PathBuf,
    runs: Vec<RunRecord>,
}

impl RecordReporter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            runs: Vec::new(),
        }
    }

    /// Records collected so far
    pub fn runs(&self) -> &[RunRecord] {
        &self.runs
    }
}

impl Reporter for RecordReporter {
    fn name(&self) -> &str {
        "RecordReporter"
    }

    fn set_up(&mut self, _param_name: Option<&str>) -> ReporterResult {
        self.runs.clear();
        Ok(())
    }

    fn post_run(&mut self, cell: &Cell<'_>, outcome: &Outcome) -> ReporterResult {
        self.runs.push(RunRecord::new(cell, outcome));
        Ok(())
    }

    fn outro(&mut self) -> ReporterResult {
        let content = serde_json::to_string_pretty(&RecordFile { runs: &self.runs })?;
        std::fs::write(&self.path, content + "\n")?;
        tracing::debug!(path = %self.path.display(), runs = self.runs.len(), "Wrote run records");
        Ok(())
    }

    fn tear_down(&mut self) -> ReporterResult {
        self.runs.clear();
        Ok(())
    }
}
