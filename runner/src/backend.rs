//! Backend identities and solver flags
//!
//! Requested backend names are resolved against the backends an engine has
//! installed, and free-form extra flags are parsed and merged per backend.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An installed solver backend
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BackendIdentity {
    /// Short identifier passed to the engine (e.g. `gecode`)
    pub id: String,
    /// Human-readable name used in reports (e.g. `Gecode`)
    pub name: String,
}

impl BackendIdentity {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    fn matches(&self, requested: &str) -> bool {
        self.id.eq_ignore_ascii_case(requested) || self.name.eq_ignore_ascii_case(requested)
    }
}

impl std::fmt::Display for BackendIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

/// Resolve requested backend names against the installed backends.
///
/// Matching is case-insensitive on either id or name. The result keeps the
/// requested order; a backend requested twice is kept at its first position.
pub fn resolve_backends(
    requested: &[String],
    installed: &[BackendIdentity],
) -> Result<Vec<BackendIdentity>, ConfigError> {
    if requested.is_empty() {
        return Err(ConfigError::NoBackends);
    }

    let mut resolved: Vec<BackendIdentity> = Vec::with_capacity(requested.len());
    let mut unknown = Vec::new();

    for name in requested {
        let mut candidates: Vec<&BackendIdentity> =
            installed.iter().filter(|b| b.matches(name)).collect();
        candidates.dedup_by(|a, b| a.id == b.id);

        match candidates.as_slice() {
            [] => {
                if !unknown.contains(&name.to_lowercase()) {
                    unknown.push(name.to_lowercase());
                }
            }
            [backend] => {
                if !resolved.iter().any(|b| b.id == backend.id) {
                    resolved.push((*backend).clone());
                }
            }
            several => {
                return Err(ConfigError::AmbiguousBackend {
                    name: name.clone(),
                    candidates: several.iter().map(|b| b.id.clone()).collect(),
                })
            }
        }
    }

    if !unknown.is_empty() {
        return Err(ConfigError::UnknownBackends { names: unknown });
    }
    Ok(resolved)
}

/// Value of an extra solver flag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlagValue {
    /// Boolean flag, passed without a value
    Present(bool),
    Value(String),
}

impl std::fmt::Display for FlagValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Present(_) => write!(f, "True"),
            Self::Value(v) => write!(f, "{}", v),
        }
    }
}

/// Ordered flag → value map passed through to the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtraFlags(Vec<(String, FlagValue)>);

impl ExtraFlags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a whitespace-separated flag string such as `" -p 4 --free-search"`.
    ///
    /// A token following a flag is that flag's value unless it starts with
    /// `-`, in which case the flag is boolean.
    pub fn parse(input: &str) -> Self {
        let mut flags = Self::new();
        let mut tokens = input.split_whitespace().peekable();

        while let Some(flag) = tokens.next() {
            let value = match tokens.next_if(|next| !next.starts_with('-')) {
                Some(value) => FlagValue::Value(value.to_string()),
                None => FlagValue::Present(true),
            };
            flags.insert(flag, value);
        }
        flags
    }

    /// Insert a flag, replacing the value of an existing one in place.
    pub fn insert(&mut self, flag: impl Into<String>, value: FlagValue) {
        let flag = flag.into();
        match self.0.iter_mut().find(|(f, _)| *f == flag) {
            Some(entry) => entry.1 = value,
            None => self.0.push((flag, value)),
        }
    }

    pub fn get(&self, flag: &str) -> Option<&FlagValue> {
        self.0.iter().find(|(f, _)| f == flag).map(|(_, v)| v)
    }

    pub fn contains(&self, flag: &str) -> bool {
        self.get(flag).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FlagValue)> {
        self.0.iter().map(|(f, v)| (f.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Overlay `overrides` on top of `self`; overriding flags win.
    pub fn merged_with(&self, overrides: &ExtraFlags) -> ExtraFlags {
        let mut merged = self.clone();
        for (flag, value) in overrides.iter() {
            merged.insert(flag, value.clone());
        }
        merged
    }

    /// Whether these flags ask the solver for every solution
    pub fn requests_all_solutions(&self) -> bool {
        self.contains("--all-solutions") || self.contains("-a")
    }

    /// Render as command-line arguments.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::with_capacity(self.0.len() * 2);
        for (flag, value) in &self.0 {
            args.push(flag.clone());
            if let FlagValue::Value(v) = value {
                args.push(v.clone());
            }
        }
        args
    }
}

impl<S: Into<String>> FromIterator<(S, FlagValue)> for ExtraFlags {
    fn from_iter<I: IntoIterator<Item = (S, FlagValue)>>(iter: I) -> Self {
        let mut flags = ExtraFlags::new();
        for (flag, value) in iter {
            flags.insert(flag, value);
        }
        flags
    }
}

/// Extra flags configured for individual backends, keyed by backend id.
#[derive(Debug, Clone, Default)]
pub struct BackendFlags {
    per_backend: HashMap<String, ExtraFlags>,
}

impl BackendFlags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add configured flags for a backend.
    ///
    /// Integers and strings become flag values. `true` passes the flag on its
    /// own and `false` leaves it out. Any other JSON value is a configuration
    /// error.
    pub fn insert_json(
        &mut self,
        backend_id: &str,
        flags: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<(), ConfigError> {
        let entry = self.per_backend.entry(backend_id.to_string()).or_default();
        for (flag, value) in flags {
            let value = match value {
                serde_json::Value::String(s) => FlagValue::Value(s.clone()),
                serde_json::Value::Bool(true) => FlagValue::Present(true),
                serde_json::Value::Bool(false) => continue,
                serde_json::Value::Number(n) if n.is_i64() || n.is_u64() => {
                    FlagValue::Value(n.to_string())
                }
                _ => {
                    return Err(ConfigError::InvalidFlagValue {
                        backend: backend_id.to_string(),
                        flag: flag.clone(),
                    })
                }
            };
            entry.insert(flag.clone(), value);
        }
        Ok(())
    }

    pub fn insert(&mut self, backend_id: impl Into<String>, flags: ExtraFlags) {
        self.per_backend.insert(backend_id.into(), flags);
    }

    pub fn get(&self, backend_id: &str) -> Option<&ExtraFlags> {
        self.per_backend.get(backend_id)
    }

    /// Flags for one backend with `global` taking precedence.
    pub fn merged(&self, backend_id: &str, global: &ExtraFlags) -> ExtraFlags {
        match self.per_backend.get(backend_id) {
            Some(flags) => flags.merged_with(global),
            None => global.clone(),
        }
    }
}
