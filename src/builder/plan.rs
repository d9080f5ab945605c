//! Build plans.
//!
//! A plan lists every compiler invocation a run would perform, in order,
//! without executing any of them. It is emitted as JSON by `build --plan`.

use std::path::PathBuf;

use anyhow::Result;
use serde::Serialize;

use crate::builder::toolchain::{CommandSpec, CompilerHandle};

/// One planned invocation.
#[derive(Debug, Clone, Serialize)]
pub struct PlannedStep {
    /// Sample name
    pub sample: String,
    /// Cross target, `None` for the host build
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// Artifact the step produces
    pub output: PathBuf,
    /// The command that would run
    pub command: CommandSpec,
}

/// Every invocation of a run, in execution order.
#[derive(Debug, Clone, Serialize)]
pub struct BuildPlan {
    /// Host compiler
    pub compiler: CompilerHandle,
    /// Cross front-end, when cross builds are enabled and it was found
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cross_frontend: Option<PathBuf>,
    /// Steps in order
    pub steps: Vec<PlannedStep>,
    /// Non-fatal findings, such as a missing cross front-end
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl BuildPlan {
    /// Create an empty plan for `compiler`.
    pub fn new(compiler: CompilerHandle) -> Self {
        BuildPlan {
            compiler,
            cross_frontend: None,
            steps: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Number of host builds.
    pub fn host_count(&self) -> usize {
        self.steps.iter().filter(|s| s.target.is_none()).count()
    }

    /// Number of cross builds.
    pub fn cross_count(&self) -> usize {
        self.steps.len() - self.host_count()
    }

    /// Serialize the plan as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
