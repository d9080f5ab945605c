//! Configuration file support.
//!
//! Two configuration file locations are merged:
//! - Global: `~/.compile-samples/config.toml` - User-wide defaults
//! - Project: `Samples.toml` in the project root - Project-specific overrides
//!
//! Project config takes precedence over global config, and command-line
//! flags take precedence over both. Whatever is still unset after merging
//! falls back to the defaults in [`Settings`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::builder::toolchain::{
    CompilerCandidate, CrossCompileInvoker, ScriptCaptureResolver, VsWhereLocator,
};
use crate::core::{CrossTargetSpec, SampleTarget};

/// Name of the project configuration file.
pub const PROJECT_CONFIG_FILE: &str = "Samples.toml";

/// Samples compiled when the configuration lists none.
pub const DEFAULT_SAMPLES: &[&str] = &["c_safe_a", "c_unsafe_a"];

/// Cross targets attempted when the configuration lists none.
pub const DEFAULT_CROSS_TARGETS: &[&str] = &["x86_64-windows-gnu", "x86_64-linux"];

/// Per-process timeout used when none is configured.
pub const DEFAULT_TIMEOUT_SECS: u64 = 600;

/// Configuration as written in a file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Build settings
    pub build: BuildConfig,

    /// Host toolchain settings
    pub toolchain: ToolchainConfig,

    /// Cross-compilation settings
    pub cross: CrossConfig,

    /// Samples to compile, in order
    #[serde(rename = "sample", skip_serializing_if = "Vec::is_empty")]
    pub samples: Vec<SampleEntry>,
}

/// Build-related configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Directory holding `<name>.c` sources, relative to the project root
    pub samples_dir: Option<PathBuf>,

    /// Keep building remaining samples after a failure
    pub keep_going: Option<bool>,

    /// Per-process timeout in seconds (0 disables)
    pub timeout_secs: Option<u64>,

    /// Pass `-g` to gcc-style compilers
    pub debug_info: Option<bool>,
}

/// Host toolchain configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainConfig {
    /// Compiler priority list
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub compilers: Vec<CompilerCandidate>,

    /// Capture an initialization script environment (default: Windows only)
    pub capture: Option<bool>,

    /// Installation root; skips the vswhere query when set
    pub root: Option<PathBuf>,

    /// Component the installation must provide
    pub component: Option<String>,

    /// Initialization script, relative to the installation root
    pub script: Option<PathBuf>,

    /// Architecture token passed to the script
    pub arch: Option<String>,

    /// Extra script arguments after the architecture
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extra_args: Vec<String>,
}

/// Cross-compilation configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CrossConfig {
    /// Front-end executable (default `zig`)
    pub frontend: Option<String>,

    /// Compile-mode subcommand (default `cc`)
    pub mode: Option<String>,

    /// Target triples
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub targets: Vec<CrossTargetSpec>,
}

/// A `[[sample]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleEntry {
    /// Logical name; the source is `<samples_dir>/<name>.c`
    pub name: String,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if the file doesn't
    /// exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        let Config {
            build,
            toolchain,
            cross,
            samples,
        } = other;

        if build.samples_dir.is_some() {
            self.build.samples_dir = build.samples_dir;
        }
        if build.keep_going.is_some() {
            self.build.keep_going = build.keep_going;
        }
        if build.timeout_secs.is_some() {
            self.build.timeout_secs = build.timeout_secs;
        }
        if build.debug_info.is_some() {
            self.build.debug_info = build.debug_info;
        }

        if !toolchain.compilers.is_empty() {
            self.toolchain.compilers = toolchain.compilers;
        }
        if toolchain.capture.is_some() {
            self.toolchain.capture = toolchain.capture;
        }
        if toolchain.root.is_some() {
            self.toolchain.root = toolchain.root;
        }
        if toolchain.component.is_some() {
            self.toolchain.component = toolchain.component;
        }
        if toolchain.script.is_some() {
            self.toolchain.script = toolchain.script;
        }
        if toolchain.arch.is_some() {
            self.toolchain.arch = toolchain.arch;
        }
        if !toolchain.extra_args.is_empty() {
            self.toolchain.extra_args = toolchain.extra_args;
        }

        if cross.frontend.is_some() {
            self.cross.frontend = cross.frontend;
        }
        if cross.mode.is_some() {
            self.cross.mode = cross.mode;
        }
        if !cross.targets.is_empty() {
            self.cross.targets = cross.targets;
        }

        if !samples.is_empty() {
            self.samples = samples;
        }
    }

    /// Fill in defaults and anchor relative paths at `project_root`.
    pub fn resolve(self, project_root: &Path) -> Settings {
        let samples_dir = project_root.join(
            self.build
                .samples_dir
                .unwrap_or_else(|| PathBuf::from("samples")),
        );

        let samples = if self.samples.is_empty() {
            DEFAULT_SAMPLES.iter().map(|s| s.to_string()).collect()
        } else {
            self.samples.into_iter().map(|s| s.name).collect()
        };

        let timeout = match self.build.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS) {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        let cross_targets = if self.cross.targets.is_empty() {
            DEFAULT_CROSS_TARGETS
                .iter()
                .filter_map(|t| CrossTargetSpec::new(*t).ok())
                .collect()
        } else {
            self.cross.targets
        };

        let compilers = if self.toolchain.compilers.is_empty() {
            CompilerCandidate::defaults()
        } else {
            self.toolchain.compilers
        };

        Settings {
            samples_dir,
            samples,
            keep_going: self.build.keep_going.unwrap_or(false),
            timeout,
            debug_info: self.build.debug_info.unwrap_or(true),
            compilers,
            capture: self.toolchain.capture.unwrap_or(cfg!(windows)),
            toolchain_root: self.toolchain.root.map(|r| project_root.join(r)),
            component: self
                .toolchain
                .component
                .unwrap_or_else(|| VsWhereLocator::DEFAULT_COMPONENT.to_string()),
            script: self
                .toolchain
                .script
                .unwrap_or_else(|| PathBuf::from(ScriptCaptureResolver::VCVARSALL)),
            arch: self
                .toolchain
                .arch
                .unwrap_or_else(|| ScriptCaptureResolver::DEFAULT_ARCH.to_string()),
            extra_args: self.toolchain.extra_args,
            cross_frontend: self
                .cross
                .frontend
                .unwrap_or_else(|| CrossCompileInvoker::DEFAULT_FRONTEND.to_string()),
            cross_mode: self
                .cross
                .mode
                .unwrap_or_else(|| CrossCompileInvoker::DEFAULT_MODE.to_string()),
            cross_targets,
        }
    }
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub samples_dir: PathBuf,
    pub samples: Vec<String>,
    pub keep_going: bool,
    pub timeout: Option<Duration>,
    pub debug_info: bool,
    pub compilers: Vec<CompilerCandidate>,
    pub capture: bool,
    pub toolchain_root: Option<PathBuf>,
    pub component: String,
    pub script: PathBuf,
    pub arch: String,
    pub extra_args: Vec<String>,
    pub cross_frontend: String,
    pub cross_mode: String,
    pub cross_targets: Vec<CrossTargetSpec>,
}

impl Settings {
    /// The samples to compile, in order.
    pub fn sample_targets(&self) -> Vec<SampleTarget> {
        self.samples
            .iter()
            .map(|name| SampleTarget::new(name.clone(), self.samples_dir.clone()))
            .collect()
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (`Samples.toml`)
/// 2. Global config (`~/.compile-samples/config.toml`)
/// 3. Defaults
pub fn load_config(global_path: &Path, project_path: &Path) -> Config {
    let mut config = Config::default();

    if global_path.exists() {
        config.merge(Config::load_or_default(global_path));
    }

    if project_path.exists() {
        config.merge(Config::load_or_default(project_path));
    }

    config
}

/// Get the global config directory (~/.compile-samples).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".compile-samples"))
}

/// Get the global config path (~/.compile-samples/config.toml).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the project config path (`Samples.toml`).
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(PROJECT_CONFIG_FILE)
}
