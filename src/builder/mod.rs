//! Native toolchain resolution and sample compilation.
//!
//! This module resolves the host C toolchain and drives host and cross
//! builds of the sample programs.

pub mod driver;
pub mod errors;
pub mod plan;
pub mod toolchain;

pub use driver::{BuildDriver, BuildOptions, BuildReport, CrossOptions, FailurePolicy};
pub use errors::{BuildError, BuildResult};
pub use plan::BuildPlan;
pub use toolchain::{
    select_resolver, CommandSpec, CompileInvoker, CompilerCandidate, CompilerDialect,
    CompilerHandle, CompilerLocator, CrossCompileInvoker, ToolchainEnvironmentResolver,
};
