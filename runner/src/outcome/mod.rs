//! Outcome Records
//!
//! An [`Outcome`] wraps the raw [`SolveResult`] one backend produced for one
//! instance and derives the status predicates the comparator and the
//! reporters work with. It is built once, right after the engine returns,
//! and never modified afterwards.

pub mod compare;

pub use compare::best_outcome;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::time::Duration;

/// Time reported for a timed-out outcome whose statistics carry no time.
///
/// Large enough that sorting treats it as the worst case.
pub const TIMEOUT_SENTINEL: Duration = Duration::from_millis(1 << 32);

/// Displayed in place of a report variable the solution does not bind.
pub const MISSING_VALUE: &str = "--";

/// Kind of problem the model states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProblemClass {
    /// Constraint satisfaction problem
    Satisfy,
    /// Optimisation problem, smaller objective is better
    Minimize,
    /// Optimisation problem, larger objective is better
    Maximize,
}

impl ProblemClass {
    pub fn is_csp(&self) -> bool {
        matches!(self, Self::Satisfy)
    }

    pub fn is_cop(&self) -> bool {
        matches!(self, Self::Minimize | Self::Maximize)
    }
}

impl std::fmt::Display for ProblemClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Satisfy => write!(f, "SATISFY"),
            Self::Minimize => write!(f, "MINIMIZE"),
            Self::Maximize => write!(f, "MAXIMIZE"),
        }
    }
}

/// Final status a solver reports for an instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Error,
    Unknown,
    Unsatisfiable,
    Satisfied,
    AllSolutions,
    OptimalSolution,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "ERROR"),
            Self::Unknown => write!(f, "UNKNOWN"),
            Self::Unsatisfiable => write!(f, "UNSATISFIABLE"),
            Self::Satisfied => write!(f, "SATISFIED"),
            Self::AllSolutions => write!(f, "ALL_SOLUTIONS"),
            Self::OptimalSolution => write!(f, "OPTIMAL_SOLUTION"),
        }
    }
}

/// Solver statistics. Only `time` is interpreted, the rest is carried along.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    /// Elapsed solve time in milliseconds
    #[serde(rename = "time", default, skip_serializing_if = "Option::is_none")]
    pub time_ms: Option<u64>,
    /// Everything else the solver reported
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Statistics {
    pub fn with_time(time: Duration) -> Self {
        Self {
            time_ms: Some(time.as_millis() as u64),
            extra: Map::new(),
        }
    }

    pub fn time(&self) -> Option<Duration> {
        self.time_ms.map(Duration::from_millis)
    }
}

/// Objective value of a solution.
///
/// Integer objectives stay exact; an integer and a float compare as `f64`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Objective {
    Int(i64),
    Float(f64),
}

impl Objective {
    /// Read an objective from a JSON number.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value.as_i64() {
            Some(int) => Some(Self::Int(int)),
            None => value.as_f64().map(Self::Float),
        }
    }

    pub fn as_f64(&self) -> f64 {
        match self {
            Self::Int(int) => *int as f64,
            Self::Float(float) => *float,
        }
    }
}

impl PartialOrd for Objective {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => Some(a.cmp(b)),
            _ => self.as_f64().partial_cmp(&other.as_f64()),
        }
    }
}

impl From<i64> for Objective {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Objective {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl std::fmt::Display for Objective {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(int) => write!(f, "{}", int),
            Self::Float(float) => write!(f, "{}", float),
        }
    }
}

/// Raw result of one solve call, as returned by a solving engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolveResult {
    pub status: Status,
    #[serde(default)]
    pub statistics: Statistics,
    /// Objective of the best solution found (optimisation problems only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objective: Option<Objective>,
    /// Variable bindings of the best solution found
    #[serde(default)]
    pub solution: Option<Map<String, Value>>,
}

impl SolveResult {
    /// A result with the given status and nothing else.
    pub fn new(status: Status) -> Self {
        Self {
            status,
            statistics: Statistics::default(),
            objective: None,
            solution: None,
        }
    }

    pub fn with_time(mut self, time: Duration) -> Self {
        self.statistics.time_ms = Some(time.as_millis() as u64);
        self
    }

    pub fn with_objective(mut self, objective: impl Into<Objective>) -> Self {
        self.objective = Some(objective.into());
        self
    }

    pub fn with_solution(mut self, solution: Map<String, Value>) -> Self {
        self.solution = Some(solution);
        self
    }
}

/// One backend's solve attempt over one instance.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    class: ProblemClass,
    result: SolveResult,
    all_solutions_mode: bool,
    vars: Vec<(String, String)>,
}

impl Outcome {
    /// Wrap a solve result.
    ///
    /// `vars` names the variables selected for reporting; each is looked up
    /// in the solution and displayed as [`MISSING_VALUE`] when unbound.
    pub fn new(
        class: ProblemClass,
        result: SolveResult,
        all_solutions_mode: bool,
        vars: &[String],
    ) -> Self {
        let vars = vars
            .iter()
            .map(|name| {
                let value = result
                    .solution
                    .as_ref()
                    .and_then(|solution| solution.get(name))
                    .map(display_value)
                    .unwrap_or_else(|| MISSING_VALUE.to_string());
                (name.clone(), value)
            })
            .collect();

        Self {
            class,
            result,
            all_solutions_mode,
            vars,
        }
    }

    pub fn class(&self) -> ProblemClass {
        self.class
    }

    pub fn status(&self) -> Status {
        self.result.status
    }

    pub fn result(&self) -> &SolveResult {
        &self.result
    }

    pub fn objective(&self) -> Option<Objective> {
        self.result.objective
    }

    pub fn solution(&self) -> Option<&Map<String, Value>> {
        self.result.solution.as_ref()
    }

    /// Whether the run asked the solver for all solutions
    pub fn all_solutions_mode(&self) -> bool {
        self.all_solutions_mode
    }

    /// Report variables with their displayed values, in request order
    pub fn vars(&self) -> &[(String, String)] {
        &self.vars
    }

    pub fn error(&self) -> bool {
        self.result.status == Status::Error
    }

    pub fn unknown(&self) -> bool {
        self.result.status == Status::Unknown
    }

    pub fn unsat(&self) -> bool {
        self.result.status == Status::Unsatisfiable
    }

    pub fn sat(&self) -> bool {
        self.result.status == Status::Satisfied
    }

    pub fn all_solutions_reached(&self) -> bool {
        self.result.status == Status::AllSolutions
    }

    pub fn optimal(&self) -> bool {
        self.result.status == Status::OptimalSolution
    }

    pub fn is_csp(&self) -> bool {
        self.class.is_csp()
    }

    pub fn is_cop(&self) -> bool {
        self.class.is_cop()
    }

    /// Whether the solver stopped before finishing its job.
    ///
    /// An optimisation run must prove optimality, an all-solutions run must
    /// exhaust the search, and any other run must at least decide the
    /// instance.
    pub fn timed_out(&self) -> bool {
        if self.is_cop() {
            return !self.optimal();
        }
        if self.all_solutions_mode {
            return !self.all_solutions_reached();
        }
        self.unknown()
    }

    /// Elapsed solve time, with [`TIMEOUT_SENTINEL`] standing in for a
    /// timed-out run that reported no time.
    pub fn time(&self) -> Duration {
        match self.result.statistics.time() {
            Some(time) => time,
            None if self.timed_out() => TIMEOUT_SENTINEL,
            None => Duration::ZERO,
        }
    }

    /// Elapsed solve time in whole milliseconds
    pub fn time_ms(&self) -> u64 {
        self.time().as_millis() as u64
    }

    pub fn has_solution(&self) -> bool {
        self.result
            .solution
            .as_ref()
            .is_some_and(|solution| !solution.is_empty())
    }

    /// Solution bindings overlaid with the displayed report variables.
    pub fn all_vars(&self) -> Map<String, Value> {
        let mut all = self.result.solution.clone().unwrap_or_default();
        for (name, value) in &self.vars {
            all.insert(name.clone(), Value::String(value.clone()));
        }
        all
    }
}

/// Render a solution value the way reports show it.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => MISSING_VALUE.to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Render an objective, or `None` when there is none.
///
/// Float objectives use `f64`'s `Display`, which prints integral values
/// without a fraction.
pub fn display_objective(objective: Option<Objective>) -> String {
    match objective {
        Some(obj) => obj.to_string(),
        None => "None".to_string(),
    }
}
