//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use compile_samples::CrossTargetSpec;

/// compile-samples - resolve a native C toolchain and compile sample programs
#[derive(Parser)]
#[command(name = "compile-samples")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Project root holding Samples.toml and the samples directory
    #[arg(short = 'C', long, global = true, value_name = "DIR")]
    pub project: Option<PathBuf>,

    /// Use this config file instead of <project>/Samples.toml
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compile every sample for the host (and cross targets with --cross)
    Build(BuildArgs),

    /// Show the resolved toolchain
    Toolchain(ToolchainArgs),
}

#[derive(Args)]
pub struct BuildArgs {
    /// Also cross-compile for the configured target triples
    #[arg(long, env = "COMPILE_SAMPLES_CROSS")]
    pub cross: bool,

    /// Keep building after a failure and report every failure at the end
    #[arg(short, long)]
    pub keep_going: bool,

    /// Cross target triple (repeatable; replaces the configured list)
    #[arg(long = "target", value_name = "TRIPLE")]
    pub targets: Vec<CrossTargetSpec>,

    /// Sample name (repeatable; replaces the configured list)
    #[arg(long = "sample", value_name = "NAME")]
    pub samples: Vec<String>,

    /// Directory holding the sample sources
    #[arg(long, value_name = "DIR")]
    pub samples_dir: Option<PathBuf>,

    /// Architecture passed to the toolchain initialization script
    #[arg(long)]
    pub arch: Option<String>,

    /// Per-process timeout in seconds (0 disables)
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Do not pass -g to gcc-style compilers
    #[arg(long)]
    pub no_debug_info: bool,

    /// Emit build plan as JSON (no build)
    #[arg(long)]
    pub plan: bool,
}

#[derive(Args)]
pub struct ToolchainArgs {
    /// Architecture passed to the toolchain initialization script
    #[arg(long)]
    pub arch: Option<String>,
}
