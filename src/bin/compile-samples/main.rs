//! compile-samples CLI

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    // Parse CLI
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("compile_samples=debug")
    } else {
        EnvFilter::new("compile_samples=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let project = commands::ProjectArgs {
        root: cli.project,
        config: cli.config,
    };

    // Execute command
    match cli.command {
        Commands::Build(args) => commands::build::execute(args, &project),
        Commands::Toolchain(args) => commands::toolchain::execute(args, &project),
    }
}
