//! Configuration file
//!
//! Defaults for the command line, read from JSON (`.json`) or TOML:
//!
//! ```json
//! {
//!   "driver_path": "/opt/minizinc/bin",
//!   "backends": ["gecode", "chuffed"],
//!   "timeout": "1m",
//!   "backend_config": { "gecode": { "extra": { "-p": 4 } } }
//! }
//! ```

use runner::{BackendFlags, ConfigError, DurationParser};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming the configuration file
pub const CONFIG_ENV: &str = "RUN_BACKENDS_CONFIG";

/// Environment variable naming the directory of the minizinc executable
pub const DRIVER_PATH_ENV: &str = "MINIZINC_PATH";

/// Configuration file looked for next to the executable
pub const DEFAULT_CONFIG_FILE: &str = "config.json";

/// Timeout as written in the configuration file
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TimeoutSetting {
    /// Milliseconds
    Millis(f64),
    /// Duration string, e.g. `"1h 30m"`
    Text(String),
}

/// Settings for one backend
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BackendSection {
    /// Flags passed to this backend only
    #[serde(default)]
    pub extra: Map<String, Value>,
}

/// Command-line defaults
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct HarnessConfig {
    /// Directory containing the minizinc executable
    #[serde(default)]
    pub driver_path: Option<PathBuf>,

    #[serde(default)]
    pub backends: Option<Vec<String>>,

    #[serde(default)]
    pub timeout: Option<TimeoutSetting>,

    /// Per-backend settings keyed by backend id
    #[serde(default)]
    pub backend_config: BTreeMap<String, BackendSection>,
}

impl HarnessConfig {
    /// Read a configuration file; `.json` files are JSON, anything else TOML.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::invalid_file(path, e.to_string()))?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            serde_json::from_str(&content).map_err(|e| ConfigError::invalid_file(path, e.to_string()))
        } else {
            toml::from_str(&content).map_err(|e| ConfigError::invalid_file(path, e.to_string()))
        }
    }

    /// Find and load the configuration.
    ///
    /// An explicit path wins, then `RUN_BACKENDS_CONFIG`, then
    /// `config.json` next to the executable. With none of them present the
    /// defaults are used.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Self::load(Path::new(&path));
        }
        match default_config_path() {
            Some(path) if path.is_file() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Apply environment overrides.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(dir) = std::env::var(DRIVER_PATH_ENV) {
            self.driver_path = Some(PathBuf::from(dir));
        }
        self
    }

    /// The configured timeout, read with `parser`.
    pub fn timeout(&self, parser: &DurationParser) -> Result<Option<Duration>, ConfigError> {
        match &self.timeout {
            Some(TimeoutSetting::Millis(ms)) => Ok(Some(parser.parse_number(*ms)?)),
            Some(TimeoutSetting::Text(text)) => parse_timeout(parser, text).map(Some),
            None => Ok(None),
        }
    }

    /// Per-backend extra flags, with values checked and stringified.
    pub fn backend_flags(&self) -> Result<BackendFlags, ConfigError> {
        let mut flags = BackendFlags::new();
        for (backend, section) in &self.backend_config {
            flags.insert_json(backend, &section.extra)?;
        }
        Ok(flags)
    }
}

/// Parse a timeout string, rejecting blank text.
pub fn parse_timeout(parser: &DurationParser, text: &str) -> Result<Duration, ConfigError> {
    if text.trim().is_empty() {
        return Err(ConfigError::EmptyTimeout);
    }
    Ok(parser.parse(text)?)
}

fn default_config_path() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    Some(exe.parent()?.join(DEFAULT_CONFIG_FILE))
}
