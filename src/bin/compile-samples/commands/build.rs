//! `compile-samples build` command

use anyhow::Result;

use crate::cli::BuildArgs;
use crate::commands::ProjectArgs;
use compile_samples::builder::{select_resolver, BuildDriver, BuildOptions};
use compile_samples::util::config::{Config, SampleEntry};
use compile_samples::EnvironmentMap;

pub fn execute(args: BuildArgs, project: &ProjectArgs) -> Result<()> {
    let root = project.root()?;
    let mut config = project.load_config()?;
    apply_overrides(&mut config, &args);

    let settings = config.resolve(&root);
    let options = BuildOptions::from_settings(&settings, args.cross);
    let driver = BuildDriver::new(select_resolver(&settings), options);

    let parent = EnvironmentMap::from_current();

    if args.plan {
        let plan = driver.plan(&parent)?;
        eprintln!(
            "     Planned {} host and {} cross build(s)",
            plan.host_count(),
            plan.cross_count()
        );
        println!("{}", plan.to_json()?);
        return Ok(());
    }

    let report = driver.run(&parent)?;

    for artifact in &report.artifacts {
        match &artifact.target {
            Some(target) => eprintln!(
                "    Finished `{}` ({}) -> {}",
                artifact.sample,
                target,
                artifact.path.display()
            ),
            None => eprintln!(
                "    Finished `{}` -> {}",
                artifact.sample,
                artifact.path.display()
            ),
        }
    }
    if !report.skipped.is_empty() {
        eprintln!("     Skipped {} cross build(s)", report.skipped.len());
    }

    report.into_result()?;
    Ok(())
}

/// Command-line flags override both config files.
fn apply_overrides(config: &mut Config, args: &BuildArgs) {
    if args.keep_going {
        config.build.keep_going = Some(true);
    }
    if let Some(timeout) = args.timeout {
        config.build.timeout_secs = Some(timeout);
    }
    if args.no_debug_info {
        config.build.debug_info = Some(false);
    }
    if let Some(ref dir) = args.samples_dir {
        config.build.samples_dir = Some(dir.clone());
    }
    if let Some(ref arch) = args.arch {
        config.toolchain.arch = Some(arch.clone());
    }
    if !args.targets.is_empty() {
        config.cross.targets = args.targets.clone();
    }
    if !args.samples.is_empty() {
        config.samples = args
            .samples
            .iter()
            .map(|name| SampleEntry { name: name.clone() })
            .collect();
    }
}
