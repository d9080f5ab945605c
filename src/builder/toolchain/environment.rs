//! Toolchain environment resolution.
//!
//! Vendor toolchains such as MSVC expect their environment to be set up by
//! an initialization script (`vcvarsall.bat`) that is normally *sourced* into
//! an interactive shell. A process cannot source a script into itself, so the
//! capturing resolver runs the script inside a child interpreter, has the same
//! interpreter session dump its environment, and lays the dump over the
//! parent environment.

use std::borrow::Cow;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::builder::errors::{BuildError, BuildResult};
use crate::util::config::Settings;
use crate::util::env::EnvironmentMap;
use crate::util::process::{ProcessBuilder, ProcessOutput};

use super::vswhere::{FixedRootLocator, ToolchainLocator, VsWhereLocator};

/// Produces the environment every compiler child process runs under.
pub trait ToolchainEnvironmentResolver: Send + Sync {
    /// Resolve the run environment starting from `parent`.
    fn resolve(&self, parent: &EnvironmentMap) -> BuildResult<EnvironmentMap>;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

/// Uses the parent environment unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopResolver;

impl ToolchainEnvironmentResolver for NoopResolver {
    fn resolve(&self, parent: &EnvironmentMap) -> BuildResult<EnvironmentMap> {
        Ok(parent.clone())
    }

    fn name(&self) -> &'static str {
        "ambient"
    }
}

/// Interpreter used to run an initialization script and dump the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptShell {
    /// `cmd.exe` running a batch file, dumped with `set`
    Cmd,
    /// `/bin/sh` sourcing a POSIX script, dumped with `env`
    Posix,
}

impl ScriptShell {
    /// The shell native to the host.
    pub fn host() -> Self {
        if cfg!(windows) {
            ScriptShell::Cmd
        } else {
            ScriptShell::Posix
        }
    }

    /// Run `script` with `args` and dump the environment from the same
    /// interpreter session.
    ///
    /// Anything the script itself prints goes to stderr so that stdout holds
    /// nothing but the dump.
    fn run(
        &self,
        script: &Path,
        args: &[String],
        parent: &EnvironmentMap,
        timeout: Option<Duration>,
    ) -> BuildResult<ProcessOutput> {
        match self {
            ScriptShell::Cmd => {
                // Passing the one-liner straight to `cmd /s /c` breaks on the
                // quoting std applies to Windows arguments, so go through a
                // temporary batch file instead.
                let batch_path = write_temp_batch(&capture_batch(script, args))?;
                let pb = ProcessBuilder::new("cmd")
                    .args(["/d", "/c"])
                    .arg(&*batch_path)
                    .env_map(parent)
                    .timeout(timeout);
                run_capture(&pb)
            }
            ScriptShell::Posix => {
                // `$0` is the script, `$1..` its arguments; a sourced file
                // sees the caller's positional parameters.
                let pb = ProcessBuilder::new("/bin/sh")
                    .args(["-c", ". \"$0\" 1>&2 && env"])
                    .arg(script)
                    .args(args)
                    .env_map(parent)
                    .timeout(timeout);
                run_capture(&pb)
            }
        }
    }
}

/// Batch file that calls `script` with `args`, then dumps the environment
/// with `set` unless the script reported an error.
fn capture_batch(script: &Path, args: &[String]) -> String {
    let mut call = format!("call \"{}\"", script.display());
    for arg in args {
        call.push(' ');
        call.push_str(&quote_batch_arg(arg));
    }

    format!("@echo off\r\n{call} 1>&2\r\nif errorlevel 1 exit /b %errorlevel%\r\nset\r\n")
}

/// Quote an argument for a batch `call` line so cmd keeps it as one token.
fn quote_batch_arg(arg: &str) -> Cow<'_, str> {
    let needs_quotes = arg.is_empty()
        || arg.chars().any(|c| {
            c.is_whitespace() || matches!(c, '&' | '|' | '<' | '>' | '^' | '(' | ')')
        });

    if needs_quotes {
        Cow::Owned(format!("\"{}\"", arg.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(arg)
    }
}

fn run_capture(pb: &ProcessBuilder) -> BuildResult<ProcessOutput> {
    tracing::debug!("> {}", pb.display_command());
    pb.exec().map_err(|source| BuildError::Spawn {
        program: pb.display_command(),
        source,
    })
}

fn write_temp_batch(contents: &str) -> BuildResult<tempfile::TempPath> {
    let spawn_err = |source| BuildError::Spawn {
        program: "cmd".to_string(),
        source,
    };

    let mut file = tempfile::Builder::new()
        .prefix("compile-samples-env")
        .suffix(".bat")
        .tempfile()
        .map_err(spawn_err)?;
    file.write_all(contents.as_bytes()).map_err(spawn_err)?;

    // Close the handle; the file is removed when the TempPath drops.
    Ok(file.into_temp_path())
}

/// Runs a toolchain initialization script and captures its environment.
pub struct ScriptCaptureResolver {
    locator: Box<dyn ToolchainLocator>,
    script: PathBuf,
    shell: ScriptShell,
    arch: String,
    extra_args: Vec<String>,
    timeout: Option<Duration>,
}

impl ScriptCaptureResolver {
    /// Script location under a Visual Studio installation root.
    pub const VCVARSALL: &'static str = "VC/Auxiliary/Build/vcvarsall.bat";

    /// Architecture token passed when none is configured.
    pub const DEFAULT_ARCH: &'static str = "x64";

    /// Create a resolver for `vcvarsall.bat` under the root found by
    /// `locator`, run with the host shell.
    pub fn new(locator: Box<dyn ToolchainLocator>) -> Self {
        ScriptCaptureResolver {
            locator,
            script: PathBuf::from(Self::VCVARSALL),
            shell: ScriptShell::host(),
            arch: Self::DEFAULT_ARCH.to_string(),
            extra_args: Vec::new(),
            timeout: None,
        }
    }

    /// Script path relative to the installation root.
    pub fn script(mut self, relative: impl Into<PathBuf>) -> Self {
        self.script = relative.into();
        self
    }

    pub fn shell(mut self, shell: ScriptShell) -> Self {
        self.shell = shell;
        self
    }

    /// Target architecture token (`x64`, `x86`, `x64_arm64`, ...).
    pub fn arch(mut self, arch: impl Into<String>) -> Self {
        self.arch = arch.into();
        self
    }

    /// Extra arguments appended after the architecture.
    pub fn extra_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Full path of the script under `root`, checked for existence.
    pub fn script_path(&self, root: &Path) -> BuildResult<PathBuf> {
        let candidate = root.join(&self.script);
        if candidate.is_file() {
            Ok(candidate)
        } else {
            Err(BuildError::MissingScript { path: candidate })
        }
    }
}

impl ToolchainEnvironmentResolver for ScriptCaptureResolver {
    fn resolve(&self, parent: &EnvironmentMap) -> BuildResult<EnvironmentMap> {
        let root = self.locator.locate(parent)?;
        let script = self.script_path(&root)?;

        tracing::info!("Capturing toolchain environment from {}", script.display());

        let mut args = vec![self.arch.clone()];
        args.extend(self.extra_args.iter().cloned());

        let output = self.shell.run(&script, &args, parent, self.timeout)?;
        if !output.success() {
            return Err(BuildError::EnvironmentCapture {
                script,
                code: output.code(),
                timed_out: output.timed_out,
                stdout: output.stdout_lossy(),
                stderr: output.stderr_lossy(),
            });
        }

        let captured = EnvironmentMap::parse_dump(&output.stdout_lossy());
        tracing::debug!("Captured {} variable(s) from {}", captured.len(), script.display());

        Ok(EnvironmentMap::merge_captured(parent, captured))
    }

    fn name(&self) -> &'static str {
        "script"
    }
}

/// Pick the resolver for this run.
///
/// Script capture is the default on Windows and opt-in elsewhere via
/// `toolchain.capture`. A configured `toolchain.root` bypasses vswhere.
pub fn select_resolver(settings: &Settings) -> Box<dyn ToolchainEnvironmentResolver> {
    if !settings.capture {
        return Box::new(NoopResolver);
    }

    let locator: Box<dyn ToolchainLocator> = match &settings.toolchain_root {
        Some(root) => Box::new(FixedRootLocator::new(root)),
        None => Box::new(
            VsWhereLocator::new(settings.component.clone()).timeout(settings.timeout),
        ),
    };

    Box::new(
        ScriptCaptureResolver::new(locator)
            .script(settings.script.clone())
            .arch(settings.arch.clone())
            .extra_args(settings.extra_args.clone())
            .timeout(settings.timeout),
    )
}
