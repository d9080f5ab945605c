//! Build error types.

use std::path::PathBuf;

use thiserror::Error;

/// Error raised while resolving the toolchain or compiling samples.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("toolchain not found: {0}")]
    ToolchainNotFound(String),

    #[error("environment script not found at {}", path.display())]
    MissingScript { path: PathBuf },

    #[error(
        "running `{}` failed ({})\nstdout:{stdout}\nstderr:{stderr}",
        script.display(),
        describe_exit(*code, *timed_out)
    )]
    EnvironmentCapture {
        script: PathBuf,
        code: Option<i32>,
        timed_out: bool,
        stdout: String,
        stderr: String,
    },

    #[error("compiling `{sample}` failed ({})\n  command: {command}", describe_exit(*code, *timed_out))]
    Compilation {
        sample: String,
        command: String,
        code: Option<i32>,
        timed_out: bool,
    },

    #[error(
        "cross-compiling `{sample}` for {target} failed ({})\n  command: {command}",
        describe_exit(*code, *timed_out)
    )]
    CrossCompilation {
        sample: String,
        target: String,
        command: String,
        code: Option<i32>,
        timed_out: bool,
    },

    #[error("failed to run `{program}`")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{} build(s) failed:\n{}", failures.len(), failures.join("\n"))]
    SamplesFailed { failures: Vec<String> },
}

impl BuildError {
    /// Whether this error came from a compiler child process rather than
    /// from toolchain resolution.
    pub fn is_build_failure(&self) -> bool {
        matches!(
            self,
            BuildError::Compilation { .. } | BuildError::CrossCompilation { .. }
        )
    }
}

fn describe_exit(code: Option<i32>, timed_out: bool) -> String {
    match (timed_out, code) {
        (true, _) => "timed out".to_string(),
        (false, Some(code)) => format!("rc={}", code),
        (false, None) => "terminated by signal".to_string(),
    }
}

pub type BuildResult<T> = Result<T, BuildError>;
