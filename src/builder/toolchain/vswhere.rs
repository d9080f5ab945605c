//! Locating installed toolchains.

use std::path::PathBuf;
use std::time::Duration;

use crate::builder::errors::{BuildError, BuildResult};
use crate::util::env::EnvironmentMap;
use crate::util::process::ProcessBuilder;

use super::locate::find_program;

/// Finds the installation root of a native toolchain.
pub trait ToolchainLocator: Send + Sync {
    /// Return the root of the newest qualifying installation.
    fn locate(&self, env: &EnvironmentMap) -> BuildResult<PathBuf>;
}

/// A locator that always answers with a configured root.
#[derive(Debug, Clone)]
pub struct FixedRootLocator {
    root: PathBuf,
}

impl FixedRootLocator {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FixedRootLocator { root: root.into() }
    }
}

impl ToolchainLocator for FixedRootLocator {
    fn locate(&self, _env: &EnvironmentMap) -> BuildResult<PathBuf> {
        if self.root.is_dir() {
            Ok(self.root.clone())
        } else {
            Err(BuildError::ToolchainNotFound(format!(
                "configured toolchain root {} does not exist",
                self.root.display()
            )))
        }
    }
}

/// Queries `vswhere.exe` for the latest Visual Studio (or Build Tools)
/// installation that provides a component.
#[derive(Debug, Clone)]
pub struct VsWhereLocator {
    component: String,
    timeout: Option<Duration>,
}

impl VsWhereLocator {
    /// Component required when none is configured.
    pub const DEFAULT_COMPONENT: &'static str =
        "Microsoft.VisualStudio.Component.VC.Tools.x86.x64";

    pub fn new(component: impl Into<String>) -> Self {
        VsWhereLocator {
            component: component.into(),
            timeout: None,
        }
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Arguments passed to vswhere.
    pub fn query_args(&self) -> Vec<String> {
        [
            "-latest",
            "-requires",
            self.component.as_str(),
            "-property",
            "installationPath",
            "-format",
            "value",
        ]
        .into_iter()
        .map(str::to_string)
        .collect()
    }

    /// Find vswhere.exe at the installer location, falling back to the
    /// search path.
    fn find_vswhere(env: &EnvironmentMap) -> Option<PathBuf> {
        let program_files_x86 = env
            .find_ignore_case("ProgramFiles(x86)")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("C:\\Program Files (x86)"));

        let standard_path = program_files_x86
            .join("Microsoft Visual Studio")
            .join("Installer")
            .join("vswhere.exe");

        if standard_path.is_file() {
            return Some(standard_path);
        }

        find_program("vswhere", env)
    }
}

impl Default for VsWhereLocator {
    fn default() -> Self {
        VsWhereLocator::new(Self::DEFAULT_COMPONENT)
    }
}

impl ToolchainLocator for VsWhereLocator {
    fn locate(&self, env: &EnvironmentMap) -> BuildResult<PathBuf> {
        let Some(vswhere) = Self::find_vswhere(env) else {
            return Err(BuildError::ToolchainNotFound(
                "vswhere.exe not found; install Visual Studio or the Build Tools".to_string(),
            ));
        };

        tracing::debug!("Found vswhere at: {}", vswhere.display());

        let pb = ProcessBuilder::new(&vswhere)
            .args(self.query_args())
            .env_map(env)
            .timeout(self.timeout);
        let output = pb.exec().map_err(|source| BuildError::Spawn {
            program: pb.display_command(),
            source,
        })?;

        let path = output.stdout_lossy();
        // Keep only the first line in case several installations tie.
        let path = path.lines().next().unwrap_or("").trim();
        if !output.success() || path.is_empty() {
            tracing::debug!("vswhere stderr: {}", output.stderr_lossy());
            return Err(BuildError::ToolchainNotFound(format!(
                "could not locate a Visual Studio installation that contains `{}`; \
                 make sure Visual Studio (or the Build Tools) are installed",
                self.component
            )));
        }

        tracing::debug!("Found Visual Studio at: {}", path);
        Ok(PathBuf::from(path))
    }
}
