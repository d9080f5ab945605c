//! Environment maps handed to every child process.
//!
//! The resolved toolchain environment is never written back into the
//! current process. It is carried as an [`EnvironmentMap`] value and applied
//! to each [`ProcessBuilder`](crate::util::process::ProcessBuilder) instead.

use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};

/// A snapshot of environment variables.
///
/// Names and values are kept as OS strings, so variables that are not valid
/// UTF-8 reach child processes untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentMap {
    vars: BTreeMap<OsString, OsString>,
}

impl EnvironmentMap {
    /// Create an empty environment.
    pub fn new() -> Self {
        EnvironmentMap::default()
    }

    /// Snapshot the environment of the current process.
    pub fn from_current() -> Self {
        Self::from_os_vars(std::env::vars_os())
    }

    /// Build a map from OS-level pairs.
    pub fn from_os_vars(vars: impl IntoIterator<Item = (OsString, OsString)>) -> Self {
        EnvironmentMap {
            vars: vars.into_iter().collect(),
        }
    }

    /// Look up a variable by its exact name.
    ///
    /// Returns `None` when the variable is unset or its value is not UTF-8.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.get_os(key).and_then(OsStr::to_str)
    }

    /// Look up a variable by its exact name, as an OS string.
    pub fn get_os(&self, key: impl AsRef<OsStr>) -> Option<&OsStr> {
        self.vars.get(key.as_ref()).map(OsString::as_os_str)
    }

    /// Set a variable, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<OsString>, value: impl Into<OsString>) {
        self.vars.insert(key.into(), value.into());
    }

    /// Number of variables.
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Whether the map holds no variables.
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Iterate over `(name, value)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&OsStr, &OsStr)> {
        self.vars.iter().map(|(k, v)| (k.as_os_str(), v.as_os_str()))
    }

    /// First variable whose name matches `key` ignoring ASCII case.
    pub fn find_ignore_case(&self, key: &str) -> Option<&OsStr> {
        self.get_os(key).or_else(|| {
            self.vars
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(key))
                .map(|(_, v)| v.as_os_str())
        })
    }

    /// The executable search path.
    ///
    /// Windows spells the variable `Path`, so the lookup ignores case.
    pub fn search_path(&self) -> Option<&OsStr> {
        self.find_ignore_case("PATH")
    }

    /// Parse a `NAME=VALUE` dump as printed by `set` or `env`.
    ///
    /// Names are upper-cased. Lines without `=` or with an empty name are
    /// ignored, and only the first `=` separates name from value.
    pub fn parse_dump(output: &str) -> BTreeMap<String, String> {
        output
            .lines()
            .filter_map(|line| line.split_once('='))
            .filter(|(key, _)| !key.is_empty())
            .map(|(key, value)| (key.to_uppercase(), value.to_string()))
            .collect()
    }

    /// Lay captured variables over a parent environment.
    ///
    /// Both sides are keyed by upper-cased names so `Path` and `PATH` collapse
    /// into one entry; on collision the captured value wins. Parent names
    /// that are not UTF-8 are kept as they are.
    pub fn merge_captured(parent: &EnvironmentMap, captured: BTreeMap<String, String>) -> Self {
        let mut vars: BTreeMap<OsString, OsString> = parent
            .vars
            .iter()
            .map(|(k, v)| {
                let key = match k.to_str() {
                    Some(name) => OsString::from(name.to_uppercase()),
                    None => k.clone(),
                };
                (key, v.clone())
            })
            .collect();
        vars.extend(
            captured
                .into_iter()
                .map(|(k, v)| (OsString::from(k), OsString::from(v))),
        );
        EnvironmentMap { vars }
    }
}

impl<K: Into<OsString>, V: Into<OsString>> FromIterator<(K, V)> for EnvironmentMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        EnvironmentMap {
            vars: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}
