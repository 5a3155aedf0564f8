//! MiniZinc command-line engine
//!
//! Runs the `minizinc` executable once per request:
//!
//! - `--solvers-json` lists installed backends
//! - `--model-interface-only` builds an instance and reads its problem class
//! - `--json-stream` solving, whose message stream is folded into a
//!   [`SolveResult`]
//!
//! The time limit is enforced by `minizinc --time-limit`; a run cut short
//! comes back as a normal result with an UNKNOWN or non-optimal status.

use crate::backend::{BackendIdentity, ExtraFlags};
use crate::engine::{Instance, SolvingEngine};
use crate::error::EngineError;
use crate::outcome::{Objective, ProblemClass, SolveResult, Statistics, Status};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::Duration;
use tracing::{debug, warn};

/// Name of the MiniZinc driver executable
pub const EXECUTABLE: &str = "minizinc";

/// Solver entries never offered as backends
const EXCLUDED_SOLVERS: &[&str] = &["findmus"];

/// Engine backed by the MiniZinc command-line driver
#[derive(Debug, Clone)]
pub struct MiniZincEngine {
    executable: PathBuf,
}

impl Default for MiniZincEngine {
    fn default() -> Self {
        Self::new(EXECUTABLE)
    }
}

impl MiniZincEngine {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
        }
    }

    /// Use the driver inside `dir`, or the one on `PATH` when `dir` is `None`.
    pub fn locate(dir: Option<&Path>) -> Self {
        match dir {
            Some(dir) => Self::new(dir.join(EXECUTABLE)),
            None => Self::default(),
        }
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    fn run(&self, args: &[String]) -> Result<Output, EngineError> {
        debug!(
            executable = %self.executable.display(),
            args = %args.join(" "),
            "Running MiniZinc"
        );
        Command::new(&self.executable)
            .args(args)
            .output()
            .map_err(|source| EngineError::Spawn {
                program: self.executable.display().to_string(),
                source,
            })
    }

    fn exit_error(&self, output: &Output) -> EngineError {
        EngineError::Exit {
            program: self.executable.display().to_string(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }
    }

    /// Arguments of a solve call for `instance`.
    pub fn solve_args(instance: &Instance, timeout: Duration, flags: &ExtraFlags) -> Vec<String> {
        let mut args: Vec<String> = [
            "--solver",
            instance.backend.id.as_str(),
            "--json-stream",
            "--output-mode",
            "json",
            "--output-objective",
            "--output-time",
            "--statistics",
            "--time-limit",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        args.push(timeout.as_millis().to_string());
        args.extend(flags.to_args());
        for (name, value) in &instance.bindings {
            args.push("-D".to_string());
            args.push(format!("{name} = {value};"));
        }
        args.push(instance.model.display().to_string());
        if let Some(data) = &instance.data_file {
            args.push(data.display().to_string());
        }
        args
    }
}

impl SolvingEngine for MiniZincEngine {
    fn available_backends(&mut self) -> Result<Vec<BackendIdentity>, EngineError> {
        let output = self.run(&["--solvers-json".to_string()])?;
        if !output.status.success() {
            return Err(self.exit_error(&output));
        }
        parse_solvers(&String::from_utf8_lossy(&output.stdout))
    }

    fn build_instance(
        &mut self,
        model: &Path,
        data_file: Option<&Path>,
        backend: &BackendIdentity,
    ) -> Result<Instance, EngineError> {
        let mut args = vec![
            "--solver".to_string(),
            backend.id.clone(),
            "--model-interface-only".to_string(),
            model.display().to_string(),
        ];
        if let Some(data) = data_file {
            args.push(data.display().to_string());
        }

        let output = self.run(&args)?;
        if !output.status.success() {
            return Err(self.exit_error(&output));
        }
        let class = parse_interface(&String::from_utf8_lossy(&output.stdout))?;

        Ok(Instance::new(
            model,
            data_file.map(Path::to_path_buf),
            backend.clone(),
            class,
        ))
    }

    fn solve(
        &mut self,
        instance: &Instance,
        timeout: Duration,
        flags: &ExtraFlags,
    ) -> Result<SolveResult, EngineError> {
        let output = self.run(&Self::solve_args(instance, timeout, flags))?;
        let stream = fold_stream(&String::from_utf8_lossy(&output.stdout))?;

        if !output.status.success() && !stream.decided() {
            return Err(self.exit_error(&output));
        }
        Ok(stream.into_result(instance.class))
    }
}

#[derive(Debug, Deserialize)]
struct SolverEntry {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default, rename = "isGUIApplication")]
    is_gui_application: bool,
}

/// Parse `minizinc --solvers-json` output into backend identities.
///
/// GUI applications and excluded tools are skipped, duplicate ids are kept
/// once, and ids are shortened to their last dotted segment.
pub fn parse_solvers(json: &str) -> Result<Vec<BackendIdentity>, EngineError> {
    let entries: Vec<SolverEntry> = serde_json::from_str(json)?;
    let mut seen: Vec<String> = Vec::new();
    let mut backends = Vec::new();

    for entry in entries {
        if seen.contains(&entry.id) {
            continue;
        }
        seen.push(entry.id.clone());

        if entry.is_gui_application {
            continue;
        }
        let id = entry.id.rsplit('.').next().unwrap_or_default();
        if id.is_empty() || entry.name.is_empty() || EXCLUDED_SOLVERS.contains(&id) {
            warn!(id = %entry.id, "Skipping solver entry");
            continue;
        }
        backends.push(BackendIdentity::new(id, entry.name));
    }
    Ok(backends)
}

/// Parse `--model-interface-only` output into the model's problem class.
pub fn parse_interface(json: &str) -> Result<ProblemClass, EngineError> {
    let interface: Value = serde_json::from_str(json)?;
    match interface.get("method").and_then(Value::as_str) {
        Some("sat") => Ok(ProblemClass::Satisfy),
        Some("min") => Ok(ProblemClass::Minimize),
        Some("max") => Ok(ProblemClass::Maximize),
        other => Err(EngineError::invalid_output(format!(
            "unknown solve method {other:?} in model interface"
        ))),
    }
}

/// Everything of interest in one `--json-stream` run
#[derive(Debug, Default, Clone, PartialEq)]
pub struct StreamSummary {
    pub status: Option<Status>,
    pub solution: Option<Map<String, Value>>,
    pub objective: Option<Objective>,
    pub time_ms: Option<u64>,
    pub statistics: Map<String, Value>,
}

impl StreamSummary {
    /// Whether the stream carried a final status or at least one solution
    pub fn decided(&self) -> bool {
        self.status.is_some() || self.solution.is_some()
    }

    pub fn into_result(self, class: ProblemClass) -> SolveResult {
        let status = match self.status {
            Some(status) => status,
            None if self.solution.is_some() => Status::Satisfied,
            None => Status::Unknown,
        };
        SolveResult {
            status,
            statistics: Statistics {
                time_ms: self.time_ms,
                extra: self.statistics,
            },
            objective: if class.is_cop() { self.objective } else { None },
            solution: self.solution,
        }
    }
}

/// Fold a `--json-stream` message stream.
///
/// The last solution wins. An `error` message fails the whole solve.
pub fn fold_stream(stdout: &str) -> Result<StreamSummary, EngineError> {
    let mut summary = StreamSummary::default();

    for line in stdout.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let message: Value = serde_json::from_str(line)
            .map_err(|e| EngineError::invalid_output(format!("{e}: {line}")))?;
        let time = message.get("time").and_then(Value::as_u64);

        match message.get("type").and_then(Value::as_str) {
            Some("solution") => {
                let mut solution = message
                    .pointer("/output/json")
                    .and_then(Value::as_object)
                    .cloned()
                    .unwrap_or_default();
                summary.objective = solution
                    .remove("_objective")
                    .and_then(|obj| Objective::from_json(&obj))
                    .or(summary.objective);
                solution.remove("_checker");
                summary.solution = Some(solution);
                if time.is_some() {
                    summary.time_ms = time;
                }
            }
            Some("status") => {
                summary.status = message
                    .get("status")
                    .and_then(Value::as_str)
                    .map(parse_status);
                if time.is_some() {
                    summary.time_ms = time;
                }
            }
            Some("statistics") => {
                if let Some(stats) = message.get("statistics").and_then(Value::as_object) {
                    // "time" is owned by the status and solution messages
                    let mut stats = stats.clone();
                    stats.remove("time");
                    summary.statistics.extend(stats);
                }
            }
            Some("error") => {
                let what = message.get("what").and_then(Value::as_str).unwrap_or("error");
                let text = message
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                return Err(EngineError::Solver {
                    message: format!("{what}: {text}"),
                });
            }
            _ => {}
        }
    }

    Ok(summary)
}

fn parse_status(status: &str) -> Status {
    match status {
        "OPTIMAL_SOLUTION" => Status::OptimalSolution,
        "ALL_SOLUTIONS" => Status::AllSolutions,
        "SATISFIED" => Status::Satisfied,
        "UNSATISFIABLE" => Status::Unsatisfiable,
        "ERROR" => Status::Error,
        _ => Status::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_solvers_filters_entries() {
        let json = r#"[
            {"id": "org.gecode.gecode", "name": "Gecode", "isGUIApplication": false},
            {"id": "org.gecode.gist", "name": "Gecode Gist", "isGUIApplication": true},
            {"id": "org.minizinc.findmus", "name": "FindMUS"},
            {"id": "org.chuffed.chuffed", "name": "Chuffed"},
            {"id": "org.chuffed.chuffed", "name": "Chuffed"},
            {"id": "org.unnamed.solver", "name": ""}
        ]"#;
        let backends = parse_solvers(json).unwrap();
        assert_eq!(
            backends,
            vec![
                BackendIdentity::new("gecode", "Gecode"),
                BackendIdentity::new("chuffed", "Chuffed"),
            ]
        );
    }

    #[test]
    fn test_parse_interface() {
        assert_eq!(
            parse_interface(r#"{"type": "interface", "method": "min", "input": {}}"#).unwrap(),
            ProblemClass::Minimize
        );
        assert_eq!(
            parse_interface(r#"{"method": "sat"}"#).unwrap(),
            ProblemClass::Satisfy
        );
        assert!(parse_interface(r#"{"method": "foo"}"#).is_err());
        assert!(parse_interface("not json").is_err());
    }

    #[test]
    fn test_fold_stream_optimisation() {
        let stdout = [
            r#"{"type": "solution", "output": {"json": {"x": 3, "_objective": 12}}, "time": 40}"#,
            r#"{"type": "solution", "output": {"json": {"x": 5, "_objective": 9}}, "time": 80}"#,
            r#"{"type": "statistics", "statistics": {"nodes": 120, "failures": 33}}"#,
            r#"{"type": "status", "status": "OPTIMAL_SOLUTION", "time": 95}"#,
        ]
        .join("\n");

        let result = fold_stream(&stdout)
            .unwrap()
            .into_result(ProblemClass::Minimize);
        assert_eq!(result.status, Status::OptimalSolution);
        assert_eq!(result.objective, Some(Objective::Int(9)));
        assert_eq!(result.statistics.time_ms, Some(95));
        assert_eq!(result.statistics.extra["nodes"], json!(120));
        let solution = result.solution.unwrap();
        assert_eq!(solution["x"], json!(5));
        assert!(!solution.contains_key("_objective"));
    }

    #[test]
    fn test_fold_stream_solution_without_status_is_satisfied() {
        let stdout = r#"{"type": "solution", "output": {"json": {"q": [1, 3, 0, 2]}}, "time": 7}"#;
        let result = fold_stream(stdout)
            .unwrap()
            .into_result(ProblemClass::Satisfy);
        assert_eq!(result.status, Status::Satisfied);
        assert_eq!(result.statistics.time_ms, Some(7));
        assert_eq!(result.objective, None);
    }

    #[test]
    fn test_fold_stream_empty_is_unknown() {
        let summary = fold_stream("").unwrap();
        assert!(!summary.decided());
        let result = summary.into_result(ProblemClass::Maximize);
        assert_eq!(result.status, Status::Unknown);
        assert_eq!(result.statistics.time_ms, None);
    }

    #[test]
    fn test_fold_stream_unsatisfiable() {
        let stdout = r#"{"type": "status", "status": "UNSATISFIABLE", "time": 12}"#;
        let result = fold_stream(stdout)
            .unwrap()
            .into_result(ProblemClass::Satisfy);
        assert_eq!(result.status, Status::Unsatisfiable);
        assert!(result.solution.is_none());
    }

    #[test]
    fn test_fold_stream_error_message() {
        let stdout = concat!(
            r#"{"type": "warning", "message": "unused"}"#,
            "\n",
            r#"{"type": "error", "what": "type error", "message": "undefined identifier `n'"}"#
        );
        match fold_stream(stdout) {
            Err(EngineError::Solver { message }) => {
                assert_eq!(message, "type error: undefined identifier `n'")
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_fold_stream_rejects_garbage() {
        assert!(matches!(
            fold_stream("Segmentation fault"),
            Err(EngineError::InvalidOutput { .. })
        ));
    }

    #[test]
    fn test_solve_args() {
        let mut instance = Instance::new(
            "queens.mzn",
            Some(PathBuf::from("data/8.dzn")),
            BackendIdentity::new("gecode", "Gecode"),
            ProblemClass::Satisfy,
        );
        instance.bind_variable("n", 8);
        let args = MiniZincEngine::solve_args(
            &instance,
            Duration::from_secs(2),
            &ExtraFlags::parse("-p 4 -a"),
        );
        assert_eq!(&args[..2], ["--solver", "gecode"]);
        let limit = args.iter().position(|a| a == "--time-limit").unwrap();
        assert_eq!(args[limit + 1], "2000");
        assert!(args.windows(2).any(|w| w == ["-p", "4"]));
        assert!(args.contains(&"-a".to_string()));
        assert!(args.windows(2).any(|w| w == ["-D", "n = 8;"]));
        assert_eq!(&args[args.len() - 2..], ["queens.mzn", "data/8.dzn"]);
    }

    #[test]
    fn test_locate_uses_directory() {
        let engine = MiniZincEngine::locate(Some(Path::new("/opt/minizinc/bin")));
        assert_eq!(
            engine.executable(),
            Path::new("/opt/minizinc/bin/minizinc")
        );
        assert_eq!(
            MiniZincEngine::locate(None).executable(),
            Path::new(EXECUTABLE)
        );
    }
}
