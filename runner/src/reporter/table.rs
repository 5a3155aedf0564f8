//! LaTeX table reporter
//!
//! Emits one booktabs-style table row per instance with two columns per
//! backend (the status or report variables, and the solve time). The best
//! objective and the best time of a row are set in bold unless the row has
//! a single result.

use super::{timestamp, Intro, Reporter, ReporterResult, Sink};
use crate::driver::ParamBinding;
use crate::outcome::{best_outcome, display_objective, Outcome};
use std::cmp::Ordering;
use std::path::{Path, PathBuf};

/// Escape underscores for LaTeX text.
fn escape(text: &str) -> String {
    text.replace('_', "\\_")
}

fn texttt(text: &str) -> String {
    format!("\\texttt{{{}}}", escape(text))
}

/// Render the two cells of one outcome, compared against the best outcome
/// of its row.
fn outcome_cells(outcome: &Outcome, best: &Outcome, single: bool) -> String {
    if outcome.error() {
        return "ERR\t&\t--".to_string();
    }

    let mut text = if !outcome.vars().is_empty() {
        outcome
            .vars()
            .iter()
            .map(|(_, value)| value.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    } else if outcome.is_csp() {
        if outcome.sat() {
            "SAT"
        } else if outcome.unsat() {
            "UNSAT"
        } else {
            "--"
        }
        .to_string()
    } else {
        String::new()
    };

    if outcome.is_cop() {
        if !text.is_empty() {
            text.push_str(", ");
        }
        let objective = display_objective(outcome.objective());
        if !outcome.has_solution() {
            text.push_str("--");
        } else if !single && outcome.compare(best) != Ordering::Greater {
            text.push_str(&format!("$\\mathbf{{{}}}$", objective));
        } else {
            text.push_str(&format!("${}$", objective));
        }
    }

    let time = if outcome.timed_out() {
        "t/o".to_string()
    } else if !single && outcome.compare_time(best) != Ordering::Greater {
        format!("\\textbf{{{}}}", outcome.time_ms())
    } else {
        outcome.time_ms().to_string()
    };

    format!("{}\t&\t{}", text, time)
}

/// Writes a LaTeX table to stdout or appends it to a file.
#[derive(Debug)]
pub struct TableReporter {
    sink: Sink,
    no_header: bool,
}

impl TableReporter {
    /// `no_header` comments out the column header lines.
    pub fn new(no_header: bool, path: Option<PathBuf>) -> Self {
        Self {
            sink: Sink::from_path(path),
            no_header,
        }
    }

    fn header(&self, intro: &Intro<'_>) -> Vec<String> {
        let mut lines = vec![
            format!("% table generation started {}", timestamp()),
            format!("% timeout: {}ms", intro.timeout_ms),
            "Backend".to_string(),
        ];

        lines.extend(
            intro
                .backends
                .iter()
                .map(|b| format!("\t& \\multicolumn{{2}}{{c}}{{{}}}", b.name)),
        );
        lines.push("\\\\".to_string());
        lines.extend(
            (1..=intro.backends.len())
                .map(|i| format!("\t\\cmidrule(lr){{{}-{}}}", 2 * i, 2 * i + 1)),
        );

        let caption = match intro.param_name {
            Some(name) => texttt(name),
            None if intro.is_data_file_run => "instance".to_string(),
            None => String::new(),
        };
        lines.push(caption);

        let mut status = intro
            .vars
            .iter()
            .map(|name| texttt(name))
            .collect::<Vec<_>>()
            .join(", ");
        if !intro.is_csp {
            if !status.is_empty() {
                status.push_str(", ");
            }
            status.push_str("\\texttt{obj}");
        } else if status.is_empty() {
            status = "\\texttt{status}".to_string();
        }
        lines.extend(intro.backends.iter().map(|_| format!("\t& {} & time", status)));
        lines.push("\\\\\\midrule".to_string());

        lines
            .into_iter()
            .map(|line| line.trim_end().to_string())
            .map(|line| {
                if self.no_header && !line.starts_with('%') {
                    format!("% {}", line)
                } else {
                    line
                }
            })
            .collect()
    }
}

impl Reporter for TableReporter {
    fn name(&self) -> &str {
        "TableReporter"
    }

    fn intro(&mut self, intro: &Intro<'_>) -> ReporterResult {
        let lines = self.header(intro);
        self.sink.write_line(&lines.join("\n"))?;
        Ok(())
    }

    fn instance(
        &mut self,
        outcomes: &[Outcome],
        param: Option<&ParamBinding>,
        data_file: Option<&Path>,
    ) -> ReporterResult {
        let Some(best) = best_outcome(outcomes) else {
            return Ok(());
        };

        let mut lines = Vec::with_capacity(outcomes.len() + 2);
        if let Some(param) = param {
            lines.push(format!("${}$", param.value));
        } else if let Some(data_file) = data_file {
            let stem = data_file
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            lines.push(escape(&stem));
        }

        let single = outcomes.len() == 1;
        lines.extend(
            outcomes
                .iter()
                .map(|o| format!("\t& {}", outcome_cells(o, best, single))),
        );
        lines.push("\\\\".to_string());

        self.sink.write_line(&lines.join("\n"))?;
        Ok(())
    }

    fn outro(&mut self) -> ReporterResult {
        self.sink
            .write_line(&format!("% table generation ended {}", timestamp()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendIdentity, ExtraFlags};
    use crate::outcome::{ProblemClass, SolveResult, Status};
    use serde_json::json;
    use std::time::Duration;
    use tempfile::tempdir;

    fn make_cop(status: Status, objective: Option<f64>, ms: u64) -> Outcome {
        let mut result = SolveResult::new(status).with_time(Duration::from_millis(ms));
        if let Some(obj) = objective {
            result = result
                .with_objective(obj)
                .with_solution(json!({"x": obj}).as_object().cloned().unwrap());
        }
        Outcome::new(ProblemClass::Minimize, result, false, &[])
    }

    fn make_csp(status: Status, ms: u64) -> Outcome {
        Outcome::new(
            ProblemClass::Satisfy,
            SolveResult::new(status).with_time(Duration::from_millis(ms)),
            false,
            &[],
        )
    }

    fn read_lines(path: &Path) -> Vec<String> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_header_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("table.tex");
        let backends = vec![
            BackendIdentity::new("gecode", "Gecode"),
            BackendIdentity::new("chuffed", "Chuffed"),
        ];
        let vars = vec!["max_x".to_string()];
        let flags = ExtraFlags::new();
        let mut reporter = TableReporter::new(false, Some(path.clone()));
        reporter
            .intro(&Intro {
                backends: &backends,
                model_name: "m.mzn",
                timeout_ms: 2000,
                is_csp: false,
                vars: &vars,
                param_name: Some("n_items"),
                is_data_file_run: false,
                extra_flags: &flags,
            })
            .unwrap();

        let lines = read_lines(&path);
        assert!(lines[0].starts_with("% table generation started "));
        assert_eq!(
            &lines[1..],
            &[
                "% timeout: 2000ms",
                "Backend",
                "\t& \\multicolumn{2}{c}{Gecode}",
                "\t& \\multicolumn{2}{c}{Chuffed}",
                "\\\\",
                "\t\\cmidrule(lr){2-3}",
                "\t\\cmidrule(lr){4-5}",
                "\\texttt{n\\_items}",
                "\t& \\texttt{max\\_x}, \\texttt{obj} & time",
                "\t& \\texttt{max\\_x}, \\texttt{obj} & time",
                "\\\\\\midrule",
            ]
        );
    }

    #[test]
    fn test_no_header_comments_out_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("table.tex");
        let backends = vec![BackendIdentity::new("gecode", "Gecode")];
        let flags = ExtraFlags::new();
        let mut reporter = TableReporter::new(true, Some(path.clone()));
        reporter
            .intro(&Intro {
                backends: &backends,
                model_name: "m.mzn",
                timeout_ms: 10,
                is_csp: true,
                vars: &[],
                param_name: None,
                is_data_file_run: false,
                extra_flags: &flags,
            })
            .unwrap();

        let lines = read_lines(&path);
        assert!(lines.iter().all(|line| line.starts_with('%')));
        assert!(lines.contains(&"% \t& \\texttt{status} & time".to_string()));
        // Empty caption line becomes a bare "% ".
        assert!(lines.contains(&"% ".to_string()));
    }

    #[test]
    fn test_row_bolds_best_values() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("table.tex");
        let mut reporter = TableReporter::new(false, Some(path.clone()));
        let outcomes = vec![
            make_cop(Status::OptimalSolution, Some(3.0), 40),
            make_cop(Status::Satisfied, Some(5.0), 100),
            make_cop(Status::OptimalSolution, Some(3.0), 20),
            make_cop(Status::Error, None, 0),
        ];
        let binding = ParamBinding::new("n", 4);
        reporter.instance(&outcomes, Some(&binding), None).unwrap();

        assert_eq!(
            read_lines(&path),
            vec![
                "$4$",
                "\t& $\\mathbf{3}$\t&\t40",
                "\t& $5$\t&\tt/o",
                "\t& $\\mathbf{3}$\t&\t\\textbf{20}",
                "\t& ERR\t&\t--",
                "\\\\",
            ]
        );
    }

    #[test]
    fn test_single_result_row_is_plain() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("table.tex");
        let mut reporter = TableReporter::new(false, Some(path.clone()));
        reporter
            .instance(
                &[make_csp(Status::Satisfied, 7)],
                None,
                Some(Path::new("data/big_one.dzn")),
            )
            .unwrap();

        assert_eq!(
            read_lines(&path),
            vec!["big\\_one", "\t& SAT\t&\t7", "\\\\"]
        );
    }

    #[test]
    fn test_csp_statuses() {
        let best = make_csp(Status::Satisfied, 5);
        assert_eq!(
            outcome_cells(&make_csp(Status::Unsatisfiable, 5), &best, false),
            "UNSAT\t&\t\\textbf{5}"
        );
        assert_eq!(
            outcome_cells(&make_csp(Status::Unknown, 9), &best, false),
            "--\t&\tt/o"
        );
    }

    #[test]
    fn test_cop_without_solution() {
        let best = make_cop(Status::OptimalSolution, Some(1.0), 5);
        assert_eq!(
            outcome_cells(&make_cop(Status::Unknown, None, 9), &best, false),
            "--\t&\tt/o"
        );
    }

    #[test]
    fn test_empty_instance_writes_nothing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("table.tex");
        let mut reporter = TableReporter::new(false, Some(path.clone()));
        reporter.instance(&[], None, None).unwrap();
        assert!(!path.exists());
    }
}
