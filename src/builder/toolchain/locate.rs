//! Compiler discovery on the resolved search path.

use std::path::PathBuf;

use crate::builder::errors::{BuildError, BuildResult};
use crate::util::env::EnvironmentMap;

use super::{CompilerCandidate, CompilerHandle};

/// Find an executable on the search path of `env`.
///
/// Only the `PATH` carried by `env` is consulted, not the one of the
/// current process, so tools exposed by a captured toolchain environment
/// are visible here.
pub fn find_program(name: &str, env: &EnvironmentMap) -> Option<PathBuf> {
    let paths = env.search_path()?;
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    which::which_in(name, Some(paths), cwd).ok()
}

/// Picks the host compiler from an ordered candidate list.
#[derive(Debug, Clone)]
pub struct CompilerLocator {
    candidates: Vec<CompilerCandidate>,
}

impl CompilerLocator {
    /// Create a locator over `candidates`, highest priority first.
    pub fn new(candidates: Vec<CompilerCandidate>) -> Self {
        CompilerLocator { candidates }
    }

    /// Return the first candidate present on the search path.
    ///
    /// Later candidates are never considered once one resolves, even if the
    /// earlier one turns out to be broken: the caller relies on the dialect
    /// of whichever candidate matched.
    pub fn locate(&self, env: &EnvironmentMap) -> BuildResult<CompilerHandle> {
        for candidate in &self.candidates {
            match find_program(&candidate.name, env) {
                Some(path) => {
                    let handle = CompilerHandle {
                        name: candidate.name.clone(),
                        path,
                        dialect: candidate.dialect(),
                    };
                    tracing::debug!(
                        "Selected compiler {} ({}) at {}",
                        handle.name,
                        handle.dialect.as_str(),
                        handle.path.display()
                    );
                    return Ok(handle);
                }
                None => tracing::debug!("Compiler candidate `{}` not on search path", candidate.name),
            }
        }

        let tried: Vec<&str> = self.candidates.iter().map(|c| c.name.as_str()).collect();
        Err(BuildError::ToolchainNotFound(format!(
            "no C compiler found on the search path (tried: {})",
            tried.join(", ")
        )))
    }
}
