//! `compile-samples toolchain` command

use anyhow::Result;

use crate::cli::ToolchainArgs;
use crate::commands::ProjectArgs;
use compile_samples::builder::toolchain::{find_program, CompilerLocator};
use compile_samples::builder::{select_resolver, CompilerDialect};
use compile_samples::util::process::ProcessBuilder;
use compile_samples::EnvironmentMap;

pub fn execute(args: ToolchainArgs, project: &ProjectArgs) -> Result<()> {
    let root = project.root()?;
    let mut config = project.load_config()?;
    if let Some(arch) = args.arch {
        config.toolchain.arch = Some(arch);
    }
    let settings = config.resolve(&root);

    let resolver = select_resolver(&settings);
    let env = resolver.resolve(&EnvironmentMap::from_current())?;

    println!("Toolchain:");
    println!();
    println!("  Environment: {}", resolver.name());
    if settings.capture {
        println!("    Arch:      {}", settings.arch);
    }

    // C compiler
    match CompilerLocator::new(settings.compilers.clone()).locate(&env) {
        Ok(cc) => {
            println!("  CC:          {} ({})", cc.path.display(), cc.dialect.as_str());

            // Try to get version
            let version_flag = match cc.dialect {
                CompilerDialect::Msvc => None,
                CompilerDialect::Unix => Some("--version"),
            };
            let output = ProcessBuilder::new(&cc.path)
                .args(version_flag)
                .env_map(&env)
                .timeout(settings.timeout)
                .exec();

            if let Ok(output) = output {
                // cl prints its banner on stderr
                let text = if output.stdout.is_empty() {
                    output.stderr_lossy()
                } else {
                    output.stdout_lossy()
                };
                if let Some(first_line) = text.lines().next() {
                    println!("               {}", first_line.trim());
                }
            }
        }
        Err(e) => println!("  CC:          not found ({})", e),
    }

    // Cross front-end
    match find_program(&settings.cross_frontend, &env) {
        Some(path) => println!("  Cross:       {}", path.display()),
        None => println!("  Cross:       {} not found", settings.cross_frontend),
    }

    println!();

    // Target
    println!(
        "  Host:        {}-{}",
        std::env::consts::ARCH,
        std::env::consts::OS
    );
    let targets: Vec<&str> = settings.cross_targets.iter().map(|t| t.as_str()).collect();
    println!("  Targets:     {}", targets.join(", "));

    println!();

    // Environment variables consumed by MSVC
    println!("Environment:");
    for key in ["INCLUDE", "LIB", "LIBPATH", "VSCMD_ARG_TGT_ARCH"] {
        if let Some(value) = env.get_os(key) {
            println!("  {}={}", key, value.to_string_lossy());
        }
    }

    Ok(())
}
