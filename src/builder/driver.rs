//! Build orchestration.
//!
//! A run moves through four stages:
//! 1. **Init**: resolve the toolchain environment once.
//! 2. **LocateCompiler**: pick the host compiler once.
//! 3. **BuildAll**: for each sample in order, build for the host and, when
//!    cross builds are enabled, once per cross target.
//! 4. **Done**: report what was built.
//!
//! Everything runs sequentially; each compiler is a blocking child process.

use std::path::PathBuf;
use std::time::Duration;

use crate::builder::errors::{BuildError, BuildResult};
use crate::builder::plan::{BuildPlan, PlannedStep};
use crate::builder::toolchain::{
    CompileInvoker, CompilerCandidate, CompilerHandle, CompilerLocator, CrossCompileInvoker,
    ToolchainEnvironmentResolver,
};
use crate::core::{CrossTargetSpec, SampleTarget};
use crate::util::config::Settings;
use crate::util::env::EnvironmentMap;

/// What to do when a single build fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Abort the run on the first failure.
    #[default]
    FailFast,
    /// Attempt every build and report all failures at the end.
    KeepGoing,
}

/// Cross-compilation options.
#[derive(Debug, Clone)]
pub struct CrossOptions {
    /// Front-end executable name
    pub frontend: String,
    /// Compile-mode subcommand
    pub mode: String,
    /// Targets, built in order
    pub targets: Vec<CrossTargetSpec>,
}

/// Options for a build run.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Samples, built in order
    pub samples: Vec<SampleTarget>,
    /// Compiler priority list
    pub compilers: Vec<CompilerCandidate>,
    /// Pass `-g` to gcc-style compilers
    pub debug_info: bool,
    /// Per-process timeout
    pub timeout: Option<Duration>,
    /// Cross builds, if enabled
    pub cross: Option<CrossOptions>,
    /// Failure handling
    pub policy: FailurePolicy,
}

impl BuildOptions {
    /// Options from resolved settings; `cross` enables cross builds.
    pub fn from_settings(settings: &Settings, cross: bool) -> Self {
        BuildOptions {
            samples: settings.sample_targets(),
            compilers: settings.compilers.clone(),
            debug_info: settings.debug_info,
            timeout: settings.timeout,
            cross: cross.then(|| CrossOptions {
                frontend: settings.cross_frontend.clone(),
                mode: settings.cross_mode.clone(),
                targets: settings.cross_targets.clone(),
            }),
            policy: if settings.keep_going {
                FailurePolicy::KeepGoing
            } else {
                FailurePolicy::FailFast
            },
        }
    }
}

/// A built artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Sample name
    pub sample: String,
    /// Cross target, `None` for the host build
    pub target: Option<String>,
    /// Output path
    pub path: PathBuf,
}

/// A cross build that was not attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedBuild {
    pub sample: String,
    pub target: String,
    pub reason: String,
}

/// Outcome of a build run.
#[derive(Debug)]
pub struct BuildReport {
    /// Compiler used for host builds
    pub compiler: CompilerHandle,
    /// Artifacts produced, in build order
    pub artifacts: Vec<Artifact>,
    /// Cross builds skipped because the front-end is absent
    pub skipped: Vec<SkippedBuild>,
    /// Failed builds (only populated under [`FailurePolicy::KeepGoing`])
    pub failures: Vec<BuildError>,
}

impl BuildReport {
    /// Whether every attempted build succeeded.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Turn recorded failures into a single error.
    pub fn into_result(self) -> BuildResult<Self> {
        if self.failures.is_empty() {
            return Ok(self);
        }
        Err(BuildError::SamplesFailed {
            failures: self.failures.iter().map(|e| format!("  {}", e)).collect(),
        })
    }
}

/// Resolves the toolchain and builds every sample.
pub struct BuildDriver {
    resolver: Box<dyn ToolchainEnvironmentResolver>,
    options: BuildOptions,
}

impl BuildDriver {
    pub fn new(resolver: Box<dyn ToolchainEnvironmentResolver>, options: BuildOptions) -> Self {
        BuildDriver { resolver, options }
    }

    /// Init: resolve the environment every child process will run under.
    pub fn init(&self, parent: &EnvironmentMap) -> BuildResult<EnvironmentMap> {
        tracing::debug!("Resolving toolchain environment ({})", self.resolver.name());
        self.resolver.resolve(parent)
    }

    /// LocateCompiler: pick the host compiler.
    pub fn locate_compiler(&self, env: &EnvironmentMap) -> BuildResult<CompileInvoker> {
        let compiler = CompilerLocator::new(self.options.compilers.clone()).locate(env)?;
        tracing::info!(
            "Using {} ({}) at {}",
            compiler.name,
            compiler.dialect.as_str(),
            compiler.path.display()
        );

        Ok(CompileInvoker::new(compiler)
            .debug_info(self.options.debug_info)
            .timeout(self.options.timeout))
    }

    /// The cross front-end, if cross builds are enabled and it is installed.
    fn locate_cross(&self, env: &EnvironmentMap) -> Option<CrossCompileInvoker> {
        let cross = self.options.cross.as_ref()?;
        CrossCompileInvoker::locate(&cross.frontend, &cross.mode, env)
            .map(|invoker| invoker.timeout(self.options.timeout))
    }

    /// Run all stages against the `parent` environment.
    pub fn run(&self, parent: &EnvironmentMap) -> BuildResult<BuildReport> {
        let env = self.init(parent)?;
        let host = self.locate_compiler(&env)?;
        let cross = self.locate_cross(&env);

        let mut report = BuildReport {
            compiler: host.compiler().clone(),
            artifacts: Vec::new(),
            skipped: Vec::new(),
            failures: Vec::new(),
        };

        for sample in &self.options.samples {
            let built = host.compile(sample, &env).map(|path| Artifact {
                sample: sample.name.clone(),
                target: None,
                path,
            });
            self.record(&mut report, built)?;

            let Some(opts) = &self.options.cross else {
                continue;
            };

            for target in &opts.targets {
                match &cross {
                    Some(invoker) => {
                        let built = invoker.compile(sample, target, &env).map(|path| Artifact {
                            sample: sample.name.clone(),
                            target: Some(target.to_string()),
                            path,
                        });
                        self.record(&mut report, built)?;
                    }
                    None => {
                        tracing::warn!(
                            "{} not found, skipping cross-compile for the target {}",
                            opts.frontend,
                            target
                        );
                        report.skipped.push(SkippedBuild {
                            sample: sample.name.clone(),
                            target: target.to_string(),
                            reason: format!("{} not found", opts.frontend),
                        });
                    }
                }
            }
        }

        Ok(report)
    }

    /// Record one build outcome, or propagate it under fail-fast.
    fn record(&self, report: &mut BuildReport, built: BuildResult<Artifact>) -> BuildResult<()> {
        match built {
            Ok(artifact) => {
                tracing::debug!("finished {} -> {}", artifact.sample, artifact.path.display());
                report.artifacts.push(artifact);
                Ok(())
            }
            Err(err) if self.options.policy == FailurePolicy::KeepGoing && err.is_build_failure() => {
                tracing::error!("{}", err);
                report.failures.push(err);
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// Resolve the toolchain and list every invocation without running any
    /// compiler.
    pub fn plan(&self, parent: &EnvironmentMap) -> BuildResult<BuildPlan> {
        let env = self.init(parent)?;
        let host = self.locate_compiler(&env)?;
        let cross = self.locate_cross(&env);

        let mut plan = BuildPlan::new(host.compiler().clone());
        if let Some(opts) = &self.options.cross {
            plan.cross_frontend = cross.as_ref().map(|c| c.frontend().to_path_buf());
            if cross.is_none() {
                plan.warnings.push(format!(
                    "{} not found, cross builds would be skipped",
                    opts.frontend
                ));
            }
        }

        for sample in &self.options.samples {
            plan.steps.push(PlannedStep {
                sample: sample.name.clone(),
                target: None,
                output: sample.host_output(),
                command: host.command(sample),
            });

            if let (Some(opts), Some(invoker)) = (&self.options.cross, &cross) {
                for target in &opts.targets {
                    plan.steps.push(PlannedStep {
                        sample: sample.name.clone(),
                        target: Some(target.to_string()),
                        output: sample.cross_output(target),
                        command: invoker.command(sample, target),
                    });
                }
            }
        }

        Ok(plan)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::builder::toolchain::{
        FixedRootLocator, NoopResolver, ScriptCaptureResolver, ScriptShell,
    };
    use crate::test_support::{FakeTool, Sandbox};

    fn options(samples: Vec<SampleTarget>) -> BuildOptions {
        BuildOptions {
            samples,
            compilers: CompilerCandidate::defaults(),
            debug_info: true,
            timeout: Some(Duration::from_secs(30)),
            cross: None,
            policy: FailurePolicy::FailFast,
        }
    }

    fn cross_options() -> CrossOptions {
        CrossOptions {
            frontend: "zig".to_string(),
            mode: "cc".to_string(),
            targets: vec![
                "x86_64-windows-gnu".parse().unwrap(),
                "x86_64-linux".parse().unwrap(),
            ],
        }
    }

    #[test]
    fn test_host_builds_in_order() {
        let sandbox = Sandbox::new();
        sandbox.fake_tool("gcc", FakeTool::succeeding());
        let samples = vec![sandbox.sample("c_safe_a"), sandbox.sample("c_unsafe_a")];

        let report = BuildDriver::new(Box::new(NoopResolver), options(samples))
            .run(&sandbox.env())
            .unwrap();

        assert!(report.is_success());
        assert_eq!(report.compiler.name, "gcc");
        let names: Vec<_> = report.artifacts.iter().map(|a| a.sample.as_str()).collect();
        assert_eq!(names, vec!["c_safe_a", "c_unsafe_a"]);

        let calls = sandbox.invocations("gcc");
        assert!(calls[0].contains("c_safe_a.c"));
        assert!(calls[1].contains("c_unsafe_a.c"));
    }

    #[test]
    fn test_fail_fast_stops_at_first_failure() {
        let sandbox = Sandbox::new();
        sandbox.fake_tool("gcc", FakeTool::failing_on("/a.c"));
        let samples = vec![sandbox.sample("a"), sandbox.sample("b")];

        let err = BuildDriver::new(Box::new(NoopResolver), options(samples))
            .run(&sandbox.env())
            .unwrap_err();

        assert!(matches!(err, BuildError::Compilation { ref sample, code: Some(1), .. } if sample == "a"));
        // `b` was never attempted.
        assert_eq!(sandbox.invocations("gcc").len(), 1);
    }

    #[test]
    fn test_keep_going_attempts_every_sample() {
        let sandbox = Sandbox::new();
        sandbox.fake_tool("gcc", FakeTool::failing_on("/a.c"));
        let samples = vec![sandbox.sample("a"), sandbox.sample("b")];
        let mut opts = options(samples);
        opts.policy = FailurePolicy::KeepGoing;

        let report = BuildDriver::new(Box::new(NoopResolver), opts)
            .run(&sandbox.env())
            .unwrap();

        assert!(!report.is_success());
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.artifacts.len(), 1);
        assert_eq!(report.artifacts[0].sample, "b");
        assert_eq!(sandbox.invocations("gcc").len(), 2);

        let err = report.into_result().unwrap_err();
        assert!(err.to_string().contains("1 build(s) failed"));
    }

    #[test]
    fn test_cross_builds_per_target() {
        let sandbox = Sandbox::new();
        sandbox.fake_tool("clang", FakeTool::succeeding());
        sandbox.fake_tool("zig", FakeTool::succeeding());
        let mut opts = options(vec![sandbox.sample("c_safe_a")]);
        opts.cross = Some(cross_options());

        let report = BuildDriver::new(Box::new(NoopResolver), opts)
            .run(&sandbox.env())
            .unwrap();

        assert_eq!(report.artifacts.len(), 3);
        assert_eq!(report.artifacts[1].target.as_deref(), Some("x86_64-windows-gnu"));
        assert_eq!(report.artifacts[1].path, sandbox.samples_dir().join("c_safe_a.exe"));
        assert_eq!(report.artifacts[2].path, sandbox.samples_dir().join("c_safe_a"));
        assert_eq!(sandbox.invocations("zig").len(), 2);
    }

    #[test]
    fn test_missing_cross_frontend_is_skipped() {
        let sandbox = Sandbox::new();
        sandbox.fake_tool("gcc", FakeTool::succeeding());
        let mut opts = options(vec![sandbox.sample("c_safe_a")]);
        opts.cross = Some(cross_options());

        let report = BuildDriver::new(Box::new(NoopResolver), opts)
            .run(&sandbox.env())
            .unwrap();

        assert!(report.is_success());
        assert_eq!(report.artifacts.len(), 1);
        assert_eq!(report.skipped.len(), 2);
        assert_eq!(report.skipped[0].target, "x86_64-windows-gnu");
    }

    #[test]
    fn test_cross_disabled_never_touches_frontend() {
        let sandbox = Sandbox::new();
        sandbox.fake_tool("gcc", FakeTool::succeeding());
        sandbox.fake_tool("zig", FakeTool::succeeding());

        let report = BuildDriver::new(
            Box::new(NoopResolver),
            options(vec![sandbox.sample("c_safe_a")]),
        )
        .run(&sandbox.env())
        .unwrap();

        assert!(report.skipped.is_empty());
        assert!(sandbox.invocations("zig").is_empty());
    }

    #[test]
    fn test_init_failure_prevents_compilation() {
        let sandbox = Sandbox::new();
        sandbox.fake_tool("gcc", FakeTool::succeeding());
        sandbox.write_script("setvars.sh", "echo 'bad arch' >&2\nexit 1\n");
        let resolver = ScriptCaptureResolver::new(Box::new(FixedRootLocator::new(sandbox.root())))
            .script("setvars.sh")
            .shell(ScriptShell::Posix);

        let mut parent = sandbox.env();
        parent.insert("PATH", format!("{}:/usr/bin:/bin", sandbox.bin_dir().display()));

        let err = BuildDriver::new(Box::new(resolver), options(vec![sandbox.sample("a")]))
            .run(&parent)
            .unwrap_err();

        assert!(matches!(err, BuildError::EnvironmentCapture { .. }));
        assert!(err.to_string().contains("bad arch"));
        assert!(sandbox.invocations("gcc").is_empty());
    }

    #[test]
    fn test_captured_path_exposes_compiler() {
        let sandbox = Sandbox::new();
        let hidden = sandbox.root().join("vc").join("bin");
        std::fs::create_dir_all(&hidden).unwrap();
        sandbox.write_script(
            "vc/bin/cl",
            "#!/bin/sh\nexit 0\n",
        );
        sandbox.write_script(
            "setvars.sh",
            &format!("export PATH=\"{}:$PATH\"\n", hidden.display()),
        );
        let resolver = ScriptCaptureResolver::new(Box::new(FixedRootLocator::new(sandbox.root())))
            .script("setvars.sh")
            .shell(ScriptShell::Posix);

        let parent: EnvironmentMap = [("PATH", "/usr/bin:/bin")].into_iter().collect();
        let mut opts = options(vec![]);
        opts.compilers = vec![CompilerCandidate::new("cl")];
        let driver = BuildDriver::new(Box::new(resolver), opts);
        let env = driver.init(&parent).unwrap();
        let host = driver.locate_compiler(&env).unwrap();

        assert_eq!(host.compiler().path, hidden.join("cl"));
        assert_eq!(
            host.compiler().dialect,
            crate::builder::toolchain::CompilerDialect::Msvc
        );
    }

    #[test]
    fn test_plan_runs_nothing() {
        let sandbox = Sandbox::new();
        sandbox.fake_tool("gcc", FakeTool::succeeding());
        sandbox.fake_tool("zig", FakeTool::succeeding());
        let mut opts = options(vec![sandbox.sample("a"), sandbox.sample("b")]);
        opts.cross = Some(cross_options());

        let plan = BuildDriver::new(Box::new(NoopResolver), opts)
            .plan(&sandbox.env())
            .unwrap();

        assert_eq!(plan.steps.len(), 6);
        assert!(plan.steps[0].target.is_none());
        assert_eq!(plan.steps[1].target.as_deref(), Some("x86_64-windows-gnu"));
        assert!(sandbox.invocations("gcc").is_empty());
        assert!(sandbox.invocations("zig").is_empty());
    }
}
