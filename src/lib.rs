//! compile-samples - resolve a native C toolchain and compile sample programs
//!
//! This crate locates a host C compiler, captures vendor toolchain
//! environments (MSVC's `vcvarsall.bat`) without mutating the current
//! process, and compiles a list of single-file samples for the host and,
//! optionally, for cross targets through `zig cc`.

pub mod builder;
pub mod core;
pub mod util;

/// Test utilities for compile-samples unit tests.
///
/// Fake compilers are shell scripts, so this module only exists on Unix.
#[cfg(test)]
pub mod test_support;

pub use builder::{BuildDriver, BuildError, BuildOptions, BuildReport};
pub use core::{CrossTargetSpec, SampleTarget};
pub use util::{EnvironmentMap, Settings};
