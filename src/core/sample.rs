//! Sample programs to compile.

use std::path::PathBuf;

use super::triple::CrossTargetSpec;

/// A single-file C sample.
///
/// The source lives at `<dir>/<name>.c` and every artifact is written next
/// to it as `<dir>/<name>` plus the destination's executable suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleTarget {
    /// Logical name, also the artifact stem
    pub name: String,
    /// Directory holding the source and receiving the artifacts
    pub dir: PathBuf,
}

impl SampleTarget {
    /// Create a sample named `name` inside `dir`.
    pub fn new(name: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        SampleTarget {
            name: name.into(),
            dir: dir.into(),
        }
    }

    /// Path to the C source file.
    pub fn source_path(&self) -> PathBuf {
        self.dir.join(format!("{}.c", self.name))
    }

    /// Artifact path for a build running on, and targeting, this host.
    pub fn host_output(&self) -> PathBuf {
        self.output_with_suffix(if cfg!(windows) { ".exe" } else { "" })
    }

    /// Artifact path for a cross build.
    pub fn cross_output(&self, target: &CrossTargetSpec) -> PathBuf {
        self.output_with_suffix(target.exe_suffix())
    }

    fn output_with_suffix(&self, suffix: &str) -> PathBuf {
        self.dir.join(format!("{}{}", self.name, suffix))
    }
}
