//! Test utilities for compile-samples unit tests.
//!
//! Compilers are faked with small `/bin/sh` scripts placed in a scratch
//! `bin/` directory. Each script appends its arguments to a log file, creates
//! whatever follows `-o`, and exits with a configurable code. Tests build an
//! [`EnvironmentMap`] whose `PATH` holds only that directory, so real
//! compilers on the machine are never picked up.
//!
//! # Example
//!
//! ```rust,ignore
//! let sandbox = Sandbox::new();
//! sandbox.fake_tool("gcc", FakeTool::succeeding());
//! let handle = CompilerLocator::new(CompilerCandidate::defaults())
//!     .locate(&sandbox.env())?;
//! assert_eq!(handle.name, "gcc");
//! ```

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::core::SampleTarget;
use crate::util::env::EnvironmentMap;

/// Behavior of a fake tool script.
#[derive(Debug, Clone, Default)]
pub struct FakeTool {
    /// Exit code when the arguments do not match `fail_on`
    pub exit_code: i32,
    /// Exit 1 when the joined arguments contain this text
    pub fail_on: Option<String>,
    /// Extra shell lines run before exiting
    pub script: Option<String>,
}

impl FakeTool {
    /// A tool that always succeeds.
    pub fn succeeding() -> Self {
        FakeTool::default()
    }

    /// A tool that always exits with `code`.
    pub fn failing(code: i32) -> Self {
        FakeTool {
            exit_code: code,
            ..FakeTool::default()
        }
    }

    /// A tool that fails only when its arguments mention `pattern`.
    pub fn failing_on(pattern: impl Into<String>) -> Self {
        FakeTool {
            fail_on: Some(pattern.into()),
            ..FakeTool::default()
        }
    }

    /// A tool that runs `body` (shell) before exiting 0.
    pub fn with_script(body: impl Into<String>) -> Self {
        FakeTool {
            script: Some(body.into()),
            ..FakeTool::default()
        }
    }
}

/// Scratch directory with a `bin/` for fake tools and a `samples/` dir.
pub struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    /// Create a new sandbox.
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("bin")).unwrap();
        fs::create_dir_all(dir.path().join("samples")).unwrap();
        Sandbox { dir }
    }

    /// Sandbox root.
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Directory searched for fake tools.
    pub fn bin_dir(&self) -> PathBuf {
        self.root().join("bin")
    }

    /// Directory holding sample sources.
    pub fn samples_dir(&self) -> PathBuf {
        self.root().join("samples")
    }

    /// Environment whose search path is only the sandbox `bin/`.
    pub fn env(&self) -> EnvironmentMap {
        [("PATH", self.bin_dir().display().to_string())]
            .into_iter()
            .collect()
    }

    /// Write a sample source and return its target.
    pub fn sample(&self, name: &str) -> SampleTarget {
        fs::write(
            self.samples_dir().join(format!("{}.c", name)),
            "int main(void) { return 0; }\n",
        )
        .unwrap();
        SampleTarget::new(name, self.samples_dir())
    }

    /// Install a fake tool named `name` and return its path.
    pub fn fake_tool(&self, name: &str, tool: FakeTool) -> PathBuf {
        let path = self.bin_dir().join(name);
        let log = self.log_path(name);

        let mut script = String::from("#!/bin/sh\n");
        script.push_str(&format!("echo \"$*\" >> '{}'\n", log.display()));
        if let Some(pattern) = &tool.fail_on {
            script.push_str(&format!("case \"$*\" in *'{}'*) exit 1;; esac\n", pattern));
        }
        script.push_str(
            "out=\"\"\n\
             while [ $# -gt 0 ]; do\n\
             \x20 if [ \"$1\" = \"-o\" ]; then out=\"$2\"; shift; fi\n\
             \x20 shift\n\
             done\n\
             if [ -n \"$out\" ]; then : > \"$out\"; fi\n",
        );
        if let Some(body) = &tool.script {
            script.push_str(body);
            script.push('\n');
        }
        script.push_str(&format!("exit {}\n", tool.exit_code));

        write_executable(&path, &script);
        path
    }

    /// Write an executable file at `relative` under the sandbox root.
    pub fn write_script(&self, relative: &str, body: &str) -> PathBuf {
        let path = self.root().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        write_executable(&path, body);
        path
    }

    /// Path of the invocation log for tool `name`.
    pub fn log_path(&self, name: &str) -> PathBuf {
        self.root().join(format!("{}.log", name))
    }

    /// Invocations recorded for tool `name`, one argument string per call.
    pub fn invocations(&self, name: &str) -> Vec<String> {
        fs::read_to_string(self.log_path(name))
            .map(|s| s.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }
}

impl Default for Sandbox {
    fn default() -> Self {
        Self::new()
    }
}

fn write_executable(path: &Path, body: &str) {
    fs::write(path, body).unwrap();
    let mut perms = fs::metadata(path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms).unwrap();
}
