//! Cross-compilation target triples.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Marker that identifies a Windows destination inside a triple.
const WINDOWS_MARKER: &str = "windows";

/// A platform triple naming a cross-compilation destination.
///
/// The triple is passed through to the cross front-end verbatim, so no
/// component structure is enforced beyond being non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CrossTargetSpec {
    triple: String,
}

impl CrossTargetSpec {
    /// Create a target from a triple string.
    pub fn new(triple: impl Into<String>) -> Result<Self, String> {
        let triple = triple.into();
        let trimmed = triple.trim();
        if trimmed.is_empty() {
            return Err("target triple cannot be empty".to_string());
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(format!("invalid target triple '{}': contains whitespace", trimmed));
        }
        Ok(CrossTargetSpec {
            triple: trimmed.to_string(),
        })
    }

    /// The triple as given.
    pub fn as_str(&self) -> &str {
        &self.triple
    }

    /// Whether the triple names a Windows platform.
    pub fn is_windows(&self) -> bool {
        self.triple.contains(WINDOWS_MARKER)
    }

    /// Executable suffix for artifacts built for this target.
    ///
    /// Decided by the triple alone, never by the host running the build.
    pub fn exe_suffix(&self) -> &'static str {
        if self.is_windows() {
            ".exe"
        } else {
            ""
        }
    }
}

impl fmt::Display for CrossTargetSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.triple)
    }
}

impl FromStr for CrossTargetSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CrossTargetSpec::new(s)
    }
}

impl TryFrom<String> for CrossTargetSpec {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        CrossTargetSpec::new(s)
    }
}

impl From<CrossTargetSpec> for String {
    fn from(t: CrossTargetSpec) -> Self {
        t.triple
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_windows_marker() {
        let win: CrossTargetSpec = "x86_64-windows-gnu".parse().unwrap();
        assert!(win.is_windows());
        assert_eq!(win.exe_suffix(), ".exe");

        let msvc: CrossTargetSpec = "aarch64-pc-windows-msvc".parse().unwrap();
        assert!(msvc.is_windows());

        let linux: CrossTargetSpec = "x86_64-linux".parse().unwrap();
        assert!(!linux.is_windows());
        assert_eq!(linux.exe_suffix(), "");

        let mac: CrossTargetSpec = "aarch64-macos".parse().unwrap();
        assert_eq!(mac.exe_suffix(), "");
    }

    #[test]
    fn test_rejects_empty_and_whitespace() {
        assert!("".parse::<CrossTargetSpec>().is_err());
        assert!("   ".parse::<CrossTargetSpec>().is_err());
        assert!("x86_64 linux".parse::<CrossTargetSpec>().is_err());
        assert_eq!(
            " x86_64-linux ".parse::<CrossTargetSpec>().unwrap().as_str(),
            "x86_64-linux"
        );
    }
}
