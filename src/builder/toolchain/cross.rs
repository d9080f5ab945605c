//! Cross compilation through a universal front-end (`zig cc`).

use std::path::PathBuf;
use std::time::Duration;

use crate::builder::errors::{BuildError, BuildResult};
use crate::core::{CrossTargetSpec, SampleTarget};
use crate::util::env::EnvironmentMap;

use super::locate::find_program;
use super::CommandSpec;

/// Drives a cross-compiler front-end that accepts `-target <triple>`.
#[derive(Debug, Clone)]
pub struct CrossCompileInvoker {
    frontend: PathBuf,
    mode: String,
    timeout: Option<Duration>,
}

impl CrossCompileInvoker {
    /// Front-end looked up when none is configured.
    pub const DEFAULT_FRONTEND: &'static str = "zig";

    /// Compile-mode subcommand passed to the front-end.
    pub const DEFAULT_MODE: &'static str = "cc";

    pub fn new(frontend: impl Into<PathBuf>, mode: impl Into<String>) -> Self {
        CrossCompileInvoker {
            frontend: frontend.into(),
            mode: mode.into(),
            timeout: None,
        }
    }

    /// Look `frontend` up on the search path of `env`.
    ///
    /// Returns `None` when it is absent; cross builds are best-effort.
    pub fn locate(frontend: &str, mode: &str, env: &EnvironmentMap) -> Option<Self> {
        let path = find_program(frontend, env)?;
        tracing::debug!("Found cross front-end {} at {}", frontend, path.display());
        Some(CrossCompileInvoker::new(path, mode))
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Path of the front-end executable.
    pub fn frontend(&self) -> &std::path::Path {
        &self.frontend
    }

    /// Generate the cross-compile command for `sample` on `target`.
    pub fn command(&self, sample: &SampleTarget, target: &CrossTargetSpec) -> CommandSpec {
        CommandSpec::new(&self.frontend)
            .arg(self.mode.as_str())
            .arg("-target")
            .arg(target.as_str())
            .arg(sample.source_path().display().to_string())
            .arg("-o")
            .arg(sample.cross_output(target).display().to_string())
    }

    /// Cross-compile `sample` for `target` and return the artifact path.
    pub fn compile(
        &self,
        sample: &SampleTarget,
        target: &CrossTargetSpec,
        env: &EnvironmentMap,
    ) -> BuildResult<PathBuf> {
        let spec = self.command(sample, target);
        let command = spec.display();
        tracing::info!("> {}", command);

        let output = spec
            .to_process(env)
            .timeout(self.timeout)
            .status()
            .map_err(|source| BuildError::Spawn {
                program: self.frontend.display().to_string(),
                source,
            })?;

        if !output.success() {
            return Err(BuildError::CrossCompilation {
                sample: sample.name.clone(),
                target: target.to_string(),
                command,
                code: output.code(),
                timed_out: output.timed_out,
            });
        }

        Ok(sample.cross_output(target))
    }
}
