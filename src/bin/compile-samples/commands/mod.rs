//! Command implementations

use std::path::PathBuf;

use anyhow::{Context, Result};

use compile_samples::util::config::{
    global_config_path, load_config, project_config_path, Config,
};

pub mod build;
pub mod toolchain;

/// Global flags that locate the project and its configuration.
pub struct ProjectArgs {
    pub root: Option<PathBuf>,
    pub config: Option<PathBuf>,
}

impl ProjectArgs {
    /// Project root, defaulting to the current directory.
    pub fn root(&self) -> Result<PathBuf> {
        match &self.root {
            Some(root) => Ok(root.clone()),
            None => std::env::current_dir().context("failed to determine current directory"),
        }
    }

    /// Load the merged configuration.
    ///
    /// An explicit `--config` file must exist and parse; the implicit
    /// project and global files fall back to defaults.
    pub fn load_config(&self) -> Result<Config> {
        let root = self.root()?;
        let global = global_config_path().unwrap_or_default();

        match &self.config {
            Some(path) => {
                let mut config = load_config(&global, &PathBuf::new());
                config.merge(Config::load(path)?);
                Ok(config)
            }
            None => Ok(load_config(&global, &project_config_path(&root))),
        }
    }
}
