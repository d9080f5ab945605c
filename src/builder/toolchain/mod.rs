//! Toolchain resolution and compiler invocation.
//!
//! A run resolves its toolchain in two steps:
//! 1. An environment resolver produces the [`EnvironmentMap`] every child
//!    process runs under (on Windows this captures `vcvarsall.bat`).
//! 2. The compiler locator picks the first candidate compiler found on that
//!    environment's search path.
//!
//! Host builds go through [`CompileInvoker`], cross builds through
//! [`CrossCompileInvoker`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::util::env::EnvironmentMap;
use crate::util::process::ProcessBuilder;

mod compile;
mod cross;
mod environment;
mod locate;
mod vswhere;

pub use compile::CompileInvoker;
pub use cross::CrossCompileInvoker;
pub use environment::{
    select_resolver, NoopResolver, ScriptCaptureResolver, ScriptShell,
    ToolchainEnvironmentResolver,
};
pub use locate::{find_program, CompilerLocator};
pub use vswhere::{FixedRootLocator, ToolchainLocator, VsWhereLocator};

/// Command-line flag conventions a compiler expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompilerDialect {
    /// `cl.exe` style: `/Fe: <path>`
    Msvc,
    /// gcc/clang style: `-o <path>`
    Unix,
}

impl CompilerDialect {
    /// Guess the dialect from an executable name.
    ///
    /// `cl` and `clang-cl` take MSVC flags, anything else is treated as
    /// gcc-compatible.
    pub fn infer(name: &str) -> Self {
        let stem = Path::new(name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(name)
            .to_lowercase();

        match stem.as_str() {
            "cl" | "clang-cl" => CompilerDialect::Msvc,
            _ => CompilerDialect::Unix,
        }
    }

    /// Get the dialect name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            CompilerDialect::Msvc => "msvc",
            CompilerDialect::Unix => "unix",
        }
    }

    /// Arguments that direct the linked executable to `output`.
    pub fn output_args(&self, output: &Path, debug_info: bool) -> Vec<String> {
        match self {
            CompilerDialect::Msvc => vec!["/Fe:".to_string(), output.display().to_string()],
            CompilerDialect::Unix => {
                let mut args = vec!["-o".to_string(), output.display().to_string()];
                if debug_info {
                    args.push("-g".to_string());
                }
                args
            }
        }
    }
}

/// One entry of the compiler priority list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilerCandidate {
    /// Executable name or path to look up
    pub name: String,
    /// Flag dialect; inferred from `name` when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dialect: Option<CompilerDialect>,
}

impl CompilerCandidate {
    /// Create a candidate whose dialect is inferred from its name.
    pub fn new(name: impl Into<String>) -> Self {
        CompilerCandidate {
            name: name.into(),
            dialect: None,
        }
    }

    /// Create a candidate with an explicit dialect.
    pub fn with_dialect(name: impl Into<String>, dialect: CompilerDialect) -> Self {
        CompilerCandidate {
            name: name.into(),
            dialect: Some(dialect),
        }
    }

    /// The dialect this candidate will be driven with.
    pub fn dialect(&self) -> CompilerDialect {
        self.dialect
            .unwrap_or_else(|| CompilerDialect::infer(&self.name))
    }

    /// The default priority list: `clang`, `gcc`, `cl`.
    pub fn defaults() -> Vec<CompilerCandidate> {
        ["clang", "gcc", "cl"]
            .into_iter()
            .map(CompilerCandidate::new)
            .collect()
    }
}

/// A compiler selected for this run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompilerHandle {
    /// Candidate name that matched
    pub name: String,
    /// Resolved executable path
    pub path: PathBuf,
    /// Flag dialect used to drive it
    pub dialect: CompilerDialect,
}

/// A command to execute, with program and arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandSpec {
    /// The program to run (e.g., "gcc", "cl.exe")
    pub program: PathBuf,
    /// Command arguments
    pub args: Vec<String>,
}

impl CommandSpec {
    /// Create a new command.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        CommandSpec {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Add an argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments.
    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(|a| a.into()));
        self
    }

    /// Turn this command into a runnable process under `env`.
    pub fn to_process(&self, env: &EnvironmentMap) -> ProcessBuilder {
        ProcessBuilder::new(&self.program)
            .args(&self.args)
            .env_map(env)
    }

    /// The command line as printed before execution.
    pub fn display(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}
