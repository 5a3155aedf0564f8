//! Human-readable progress log
//!
//! Writes plain lines to stderr and, optionally, timestamped lines
//! (`%Y-%m-%d %H:%M:%S | message`) to a log file. Messages below the
//! configured level are dropped from both.

use super::{timestamp, Cell, Intro, Reporter, ReporterResult};
use crate::error::EngineError;
use crate::outcome::{display_objective, Outcome};
use std::error::Error as _;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use tracing::Level;

const INDENT: &str = "    ";

/// Logs run progress for a human watching the terminal.
pub struct LogReporter {
    level: Level,
    console: Box<dyn Write>,
    file: Option<File>,
}

impl std::fmt::Debug for LogReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogReporter")
            .field("level", &self.level)
            .field("file", &self.file.is_some())
            .finish()
    }
}

impl LogReporter {
    /// Log to stderr, and to `log_file` when given. The file is created if
    /// missing and appended to otherwise.
    pub fn new(level: Level, log_file: Option<PathBuf>) -> std::io::Result<Self> {
        let file = match log_file {
            Some(path) => Some(OpenOptions::new().create(true).append(true).open(path)?),
            None => None,
        };
        Ok(Self {
            level,
            console: Box::new(std::io::stderr()),
            file,
        })
    }

    /// Replace the stderr console with another writer.
    pub fn with_console(mut self, console: Box<dyn Write>) -> Self {
        self.console = console;
        self
    }

    fn log(&mut self, level: Level, message: &str) -> ReporterResult {
        // more verbose levels compare greater
        if level > self.level {
            return Ok(());
        }
        writeln!(self.console, "{}", message)?;
        if let Some(file) = self.file.as_mut() {
            writeln!(file, "{} | {}", timestamp(), message)?;
        }
        Ok(())
    }

    fn info(&mut self, message: &str) -> ReporterResult {
        self.log(Level::INFO, message)
    }
}

/// `label:` left-aligned in a column of `width` characters
fn padded_label(label: &str, width: usize) -> String {
    format!("{:<width$}", format!("{}:", label), width = width)
}

impl Reporter for LogReporter {
    fn name(&self) -> &str {
        "LogReporter"
    }

    fn intro(&mut self, intro: &Intro<'_>) -> ReporterResult {
        let problem_type = if intro.is_csp {
            "Constraint Satisfaction Problem (CSP)"
        } else {
            "Constrained Optimisation Problem (COP)"
        };
        let entries = [
            ("model", intro.model_name.to_string()),
            ("problem type", problem_type.to_string()),
            ("timeout", format!("{}ms", intro.timeout_ms)),
        ];
        let width = 2 + entries.iter().map(|(l, _)| l.len()).max().unwrap_or(0);
        for (label, value) in &entries {
            self.info(&format!("{}{}", padded_label(label, width), value))?;
        }

        if intro.extra_flags.is_empty() {
            return Ok(());
        }

        self.info(&format!("extra flags ({}):", intro.extra_flags.len()))?;
        let width = 2 + intro.extra_flags.iter().map(|(f, _)| f.len()).max().unwrap_or(0);
        let lines: Vec<String> = intro
            .extra_flags
            .iter()
            .map(|(flag, value)| format!("  flag: {}value: {}", padded_label(flag, width), value))
            .collect();
        for line in &lines {
            self.info(line)?;
        }
        Ok(())
    }

    fn pre_run(&mut self, cell: &Cell<'_>) -> ReporterResult {
        if cell.backend_index == 0 {
            let suffix = if cell.num_instances == 0 {
                String::new()
            } else {
                format!(" ({} of {})", cell.instance_index + 1, cell.num_instances)
            };
            if let Some(param) = cell.param {
                self.info(&format!("instance: {} = {}{}", param.name, param.value, suffix))?;
            } else if let Some(data_file) = cell.data_file {
                self.info(&format!("instance: {}{}", data_file.display(), suffix))?;
            }
        }

        let suffix = if cell.num_backends == 0 {
            String::new()
        } else {
            format!(" ({} of {})", cell.backend_index + 1, cell.num_backends)
        };
        self.info(&format!("  backend: {}{}", cell.backend.name, suffix))
    }

    fn post_run(&mut self, _cell: &Cell<'_>, outcome: &Outcome) -> ReporterResult {
        for (name, value) in outcome.vars() {
            self.info(&format!("{INDENT}{name}: {value}"))?;
        }

        let time = if outcome.timed_out() {
            "t/o".to_string()
        } else {
            format!("{}ms", outcome.time_ms())
        };
        self.info(&format!("{INDENT}time: {time}"))?;

        if outcome.is_csp() {
            let status = if outcome.sat() {
                "SAT"
            } else if outcome.unsat() {
                "UNSAT"
            } else {
                "UNKNOWN"
            };
            self.info(&format!("{INDENT}{status}"))
        } else {
            let proven = if outcome.optimal() { " (proven optimum)" } else { "" };
            self.info(&format!(
                "{INDENT}obj:  {}{}",
                display_objective(outcome.objective()),
                proven
            ))
        }
    }

    fn exception(&mut self, error: &EngineError) -> ReporterResult {
        let mut message = error.to_string();
        let mut source = error.source();
        while let Some(cause) = source {
            message.push_str(&format!("\n  caused by: {}", cause));
            source = cause.source();
        }
        self.log(Level::ERROR, &message)
    }
}
