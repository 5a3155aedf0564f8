//! Command-line arguments

use clap::Parser;
use runner::ParamRange;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Rejected argument values
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ArgError {
    #[error("{0} is not a valid file path")]
    NotAFile(String),

    #[error("{0} is not a valid directory path")]
    NotADirectory(String),

    #[error("{0} cannot be created: its directory does not exist")]
    NotCreatable(String),

    #[error("<start>, <stop>, and <step> must be integers, got \"{0}\"")]
    NotAnInteger(String),

    #[error("invalid data file pattern \"{pattern}\": {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("no data files match the given paths")]
    NoDataFiles,
}

/// Helper for running MiniZinc experiments across solver backends.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// The model file to run
    #[arg(value_name = "MZN_FILE", value_parser = existing_file)]
    pub model: PathBuf,

    /// Timeout in milliseconds or as space separated time units, e.g. "1h 2m03s 100ms"
    #[arg(short, long, num_args = 1.., value_name = "TIMEOUT")]
    pub timeout: Option<Vec<String>>,

    /// Configuration file, JSON or TOML (overrides RUN_BACKENDS_CONFIG)
    #[arg(long, visible_alias = "json-config", value_parser = existing_file)]
    pub config: Option<PathBuf>,

    /// Sweep an integer parameter from <start> to <stop> in steps of <step>
    #[arg(
        short = 'r',
        long = "param",
        num_args = 4,
        value_names = ["PARAM", "START", "STOP", "STEP"],
        allow_hyphen_values = true,
        conflicts_with = "data_files"
    )]
    pub param: Option<Vec<String>>,

    /// Data files to run, one instance each; glob patterns are expanded
    #[arg(short = 'd', long = "data", num_args = 1.., value_name = "DATA_FILE")]
    pub data_files: Option<Vec<PathBuf>>,

    /// Append the LaTeX table to this file instead of printing it
    #[arg(short, long, value_parser = creatable_file)]
    pub output: Option<PathBuf>,

    /// Write a JSON record of every run to this file
    #[arg(long, value_parser = creatable_file)]
    pub json_output: Option<PathBuf>,

    /// Variables whose values are included in the table
    #[arg(long, num_args = 1.., value_name = "VAR")]
    pub vars: Vec<String>,

    /// Solvers to run (default: the config file's backends)
    #[arg(long, num_args = 1.., value_name = "BACKEND")]
    pub backends: Option<Vec<String>>,

    /// Verbose logging
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Append progress log lines to this file
    #[arg(long, value_parser = creatable_file)]
    pub log_output: Option<PathBuf>,

    /// Directory containing the minizinc executable (overrides MINIZINC_PATH)
    #[arg(long, value_parser = existing_dir)]
    pub minizinc_path: Option<PathBuf>,

    /// Comment out the table header
    #[arg(long, default_value_t = false)]
    pub no_header: bool,

    /// Extra flags passed to every solver, e.g. " -p 4 --free-search"
    #[arg(long, allow_hyphen_values = true, value_name = "FLAGS")]
    pub extra: Option<String>,

    /// Record the run as a replayable JSON fixture (overwrites the file)
    #[arg(long, value_parser = creatable_file)]
    pub create_tests: Option<PathBuf>,
}

impl Args {
    /// The parameter sweep requested with `-r`, if any.
    ///
    /// Returns `Ok(None)` when no sweep was requested; range direction is
    /// checked by [`ParamRange::new`].
    pub fn param_values(&self) -> Result<Option<(String, i64, i64, i64)>, ArgError> {
        let Some([name, start, stop, step]) = self.param.as_deref() else {
            return Ok(None);
        };
        Ok(Some((name.clone(), integer(start)?, integer(stop)?, integer(step)?)))
    }

    pub fn param_range(&self) -> anyhow::Result<Option<ParamRange>> {
        match self.param_values()? {
            Some((name, start, stop, step)) => Ok(Some(ParamRange::new(name, start, stop, step)?)),
            None => Ok(None),
        }
    }

    /// Data files named with `-d`, glob patterns expanded.
    ///
    /// Paths matching no file are skipped. A file matched more than once is
    /// kept at its first position.
    pub fn expanded_data_files(&self) -> Result<Option<Vec<PathBuf>>, ArgError> {
        let Some(patterns) = &self.data_files else {
            return Ok(None);
        };
        let mut files: Vec<PathBuf> = Vec::new();
        for pattern in patterns {
            let pattern = pattern.to_string_lossy();
            let matches = glob::glob(&pattern).map_err(|e| ArgError::InvalidPattern {
                pattern: pattern.to_string(),
                message: e.to_string(),
            })?;
            for path in matches.filter_map(Result::ok) {
                if path.is_file() && !files.contains(&path) {
                    files.push(path);
                }
            }
        }
        if files.is_empty() {
            return Err(ArgError::NoDataFiles);
        }
        Ok(Some(files))
    }

    /// Timeout tokens joined back into one duration string
    pub fn timeout_text(&self) -> Option<String> {
        self.timeout.as_ref().map(|tokens| tokens.join(" "))
    }
}

fn integer(value: &str) -> Result<i64, ArgError> {
    value
        .parse()
        .map_err(|_| ArgError::NotAnInteger(value.to_string()))
}

fn absolute(path: &str) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| PathBuf::from(path))
}

/// Accept a path naming an existing file.
pub fn existing_file(value: &str) -> Result<PathBuf, ArgError> {
    let path = absolute(value);
    if path.is_file() {
        Ok(path)
    } else {
        Err(ArgError::NotAFile(value.to_string()))
    }
}

/// Accept a path naming an existing directory.
pub fn existing_dir(value: &str) -> Result<PathBuf, ArgError> {
    let path = absolute(value);
    if path.is_dir() {
        Ok(path)
    } else {
        Err(ArgError::NotADirectory(value.to_string()))
    }
}

/// Accept an existing file, or a new file in an existing directory.
pub fn creatable_file(value: &str) -> Result<PathBuf, ArgError> {
    let path = absolute(value);
    let parent_exists = path.parent().is_some_and(Path::is_dir);
    if path.is_file() || parent_exists {
        Ok(path)
    } else {
        Err(ArgError::NotCreatable(value.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use tempfile::tempdir;

    fn parse(args: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("run-backends").chain(args.iter().copied()))
    }

    #[test]
    fn test_command_is_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_param_sweep_arguments() {
        let dir = tempdir().unwrap();
        let model = dir.path().join("model.mzn");
        std::fs::write(&model, "solve satisfy;").unwrap();

        let args = parse(&[
            model.to_str().unwrap(),
            "-r",
            "n",
            "10",
            "-2",
            "-3",
            "--backends",
            "gecode",
            "chuffed",
        ])
        .unwrap();
        assert_eq!(
            args.param_values().unwrap(),
            Some(("n".to_string(), 10, -2, -3))
        );
        assert_eq!(
            args.backends,
            Some(vec!["gecode".to_string(), "chuffed".to_string()])
        );
        assert!(args.param_range().unwrap().is_some());
    }

    #[test]
    fn test_param_values_must_be_integers() {
        let dir = tempdir().unwrap();
        let model = dir.path().join("model.mzn");
        std::fs::write(&model, "solve satisfy;").unwrap();

        let args = parse(&[model.to_str().unwrap(), "-r", "n", "1", "x", "1"]).unwrap();
        assert_eq!(
            args.param_values().unwrap_err(),
            ArgError::NotAnInteger("x".into())
        );
    }

    #[test]
    fn test_param_and_data_conflict() {
        let dir = tempdir().unwrap();
        let model = dir.path().join("model.mzn");
        std::fs::write(&model, "solve satisfy;").unwrap();

        let result = parse(&[
            model.to_str().unwrap(),
            "-r",
            "n",
            "1",
            "2",
            "1",
            "-d",
            "a.dzn",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_timeout_tokens_are_joined() {
        let dir = tempdir().unwrap();
        let model = dir.path().join("model.mzn");
        std::fs::write(&model, "solve satisfy;").unwrap();

        let args = parse(&[model.to_str().unwrap(), "-t", "1h", "2m03s", "--extra", " -p 4"]).unwrap();
        assert_eq!(args.timeout_text().as_deref(), Some("1h 2m03s"));
        assert_eq!(args.extra.as_deref(), Some(" -p 4"));
    }

    #[test]
    fn test_blank_timeout_is_not_zero() {
        let dir = tempdir().unwrap();
        let model = dir.path().join("model.mzn");
        std::fs::write(&model, "solve satisfy;").unwrap();

        let args = parse(&[model.to_str().unwrap(), "-t", ""]).unwrap();
        let text = args.timeout_text().unwrap();
        assert!(crate::config::parse_timeout(&runner::DurationParser::default(), &text).is_err());
    }

    #[test]
    fn test_data_file_patterns_are_expanded() {
        let dir = tempdir().unwrap();
        let model = dir.path().join("model.mzn");
        std::fs::write(&model, "solve satisfy;").unwrap();
        let data = dir.path().join("data");
        std::fs::create_dir(&data).unwrap();
        for name in ["b.dzn", "a.dzn", "notes.txt"] {
            std::fs::write(data.join(name), "").unwrap();
        }

        let pattern = data.join("*.dzn");
        let explicit = data.join("b.dzn");
        let missing = data.join("missing.dzn");
        let args = parse(&[
            model.to_str().unwrap(),
            "-d",
            explicit.to_str().unwrap(),
            pattern.to_str().unwrap(),
            missing.to_str().unwrap(),
        ])
        .unwrap();
        assert_eq!(
            args.expanded_data_files().unwrap(),
            Some(vec![data.join("b.dzn"), data.join("a.dzn")])
        );
    }

    #[test]
    fn test_data_file_patterns_without_matches() {
        let dir = tempdir().unwrap();
        let model = dir.path().join("model.mzn");
        std::fs::write(&model, "solve satisfy;").unwrap();

        let pattern = dir.path().join("*.dzn");
        let args = parse(&[model.to_str().unwrap(), "-d", pattern.to_str().unwrap()]).unwrap();
        assert_eq!(args.expanded_data_files(), Err(ArgError::NoDataFiles));

        let args = parse(&[model.to_str().unwrap()]).unwrap();
        assert_eq!(args.expanded_data_files(), Ok(None));
    }

    #[test]
    fn test_missing_model_is_rejected() {
        assert!(parse(&["/definitely/not/here.mzn"]).is_err());
    }

    #[test]
    fn test_path_validators() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("exists.txt");
        std::fs::write(&file, "").unwrap();

        assert!(existing_file(file.to_str().unwrap()).is_ok());
        assert!(existing_file(dir.path().to_str().unwrap()).is_err());
        assert!(existing_dir(dir.path().to_str().unwrap()).is_ok());

        let new_file = dir.path().join("new.tex");
        assert!(creatable_file(new_file.to_str().unwrap()).is_ok());
        let orphan = dir.path().join("missing").join("new.tex");
        assert!(matches!(
            creatable_file(orphan.to_str().unwrap()),
            Err(ArgError::NotCreatable(_))
        ));
    }
}
