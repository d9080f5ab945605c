//! Host compilation.

use std::path::PathBuf;
use std::time::Duration;

use crate::builder::errors::{BuildError, BuildResult};
use crate::core::SampleTarget;
use crate::util::env::EnvironmentMap;

use super::{CommandSpec, CompilerHandle};

/// Compiles samples with the selected host compiler.
#[derive(Debug, Clone)]
pub struct CompileInvoker {
    compiler: CompilerHandle,
    debug_info: bool,
    timeout: Option<Duration>,
}

impl CompileInvoker {
    pub fn new(compiler: CompilerHandle) -> Self {
        CompileInvoker {
            compiler,
            debug_info: true,
            timeout: None,
        }
    }

    /// Emit debug info (`-g`) with gcc-style compilers.
    pub fn debug_info(mut self, debug_info: bool) -> Self {
        self.debug_info = debug_info;
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// The compiler this invoker drives.
    pub fn compiler(&self) -> &CompilerHandle {
        &self.compiler
    }

    /// Generate the compile command for `sample`.
    pub fn command(&self, sample: &SampleTarget) -> CommandSpec {
        CommandSpec::new(&self.compiler.path)
            .arg(sample.source_path().display().to_string())
            .args(
                self.compiler
                    .dialect
                    .output_args(&sample.host_output(), self.debug_info),
            )
    }

    /// Compile `sample` for the host and return the artifact path.
    pub fn compile(&self, sample: &SampleTarget, env: &EnvironmentMap) -> BuildResult<PathBuf> {
        let spec = self.command(sample);
        let command = spec.display();
        tracing::info!("> {}", command);

        let output = spec
            .to_process(env)
            .timeout(self.timeout)
            .status()
            .map_err(|source| BuildError::Spawn {
                program: self.compiler.path.display().to_string(),
                source,
            })?;

        if !output.success() {
            return Err(BuildError::Compilation {
                sample: sample.name.clone(),
                command,
                code: output.code(),
                timed_out: output.timed_out,
            });
        }

        Ok(sample.host_output())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::toolchain::CompilerDialect;

    fn handle(name: &str, dialect: CompilerDialect) -> CompilerHandle {
        CompilerHandle {
            name: name.to_string(),
            path: PathBuf::from(name),
            dialect,
        }
    }

    #[test]
    fn test_unix_command() {
        let invoker = CompileInvoker::new(handle("gcc", CompilerDialect::Unix));
        let sample = SampleTarget::new("c_safe_a", "samples");

        let cmd = invoker.command(&sample);
        assert_eq!(cmd.program, PathBuf::from("gcc"));
        assert_eq!(cmd.args[0], PathBuf::from("samples/c_safe_a.c").display().to_string());
        assert_eq!(cmd.args[1], "-o");
        assert_eq!(cmd.args[2], sample.host_output().display().to_string());
        assert_eq!(cmd.args[3], "-g");
        assert_eq!(cmd.args.len(), 4);
    }

    #[test]
    fn test_unix_command_without_debug_info() {
        let invoker = CompileInvoker::new(handle("clang", CompilerDialect::Unix)).debug_info(false);
        let cmd = invoker.command(&SampleTarget::new("a", "s"));
        assert!(!cmd.args.contains(&"-g".to_string()));
    }

    #[test]
    fn test_msvc_command() {
        let invoker = CompileInvoker::new(handle("cl", CompilerDialect::Msvc));
        let sample = SampleTarget::new("c_unsafe_a", "samples");

        let cmd = invoker.command(&sample);
        assert_eq!(cmd.program, PathBuf::from("cl"));
        assert_eq!(cmd.args.len(), 3);
        assert_eq!(cmd.args[1], "/Fe:");
        assert_eq!(cmd.args[2], sample.host_output().display().to_string());
        assert!(!cmd.args.contains(&"-g".to_string()));
    }

    #[cfg(unix)]
    mod exec {
        use super::*;
        use crate::builder::toolchain::CompilerLocator;
        use crate::builder::toolchain::CompilerCandidate;
        use crate::test_support::{FakeTool, Sandbox};

        #[test]
        fn test_compile_writes_artifact() {
            let sandbox = Sandbox::new();
            sandbox.fake_tool("gcc", FakeTool::succeeding());
            let env = sandbox.env();
            let compiler = CompilerLocator::new(CompilerCandidate::defaults())
                .locate(&env)
                .unwrap();
            let sample = sandbox.sample("c_safe_a");

            let out = CompileInvoker::new(compiler).compile(&sample, &env).unwrap();

            assert_eq!(out, sandbox.samples_dir().join("c_safe_a"));
            assert!(out.exists());
            let calls = sandbox.invocations("gcc");
            assert_eq!(calls.len(), 1);
            assert!(calls[0].ends_with("-g"));
        }

        #[test]
        fn test_compile_failure_carries_exit_code() {
            let sandbox = Sandbox::new();
            let path = sandbox.fake_tool("gcc", FakeTool::failing(2));
            let sample = sandbox.sample("broken");

            let err = CompileInvoker::new(CompilerHandle {
                name: "gcc".to_string(),
                path,
                dialect: CompilerDialect::Unix,
            })
            .compile(&sample, &sandbox.env())
            .unwrap_err();

            match err {
                BuildError::Compilation {
                    sample,
                    command,
                    code,
                    timed_out,
                } => {
                    assert_eq!(sample, "broken");
                    assert!(command.contains("broken.c"));
                    assert_eq!(code, Some(2));
                    assert!(!timed_out);
                }
                other => panic!("unexpected error: {other}"),
            }
        }

        #[test]
        fn test_compile_timeout() {
            let sandbox = Sandbox::new();
            let path = sandbox.fake_tool("gcc", FakeTool::with_script("exec /bin/sleep 5"));
            let sample = sandbox.sample("slow");

            let err = CompileInvoker::new(CompilerHandle {
                name: "gcc".to_string(),
                path,
                dialect: CompilerDialect::Unix,
            })
            .timeout(Some(Duration::from_millis(200)))
            .compile(&sample, &sandbox.env())
            .unwrap_err();

            assert!(matches!(err, BuildError::Compilation { timed_out: true, .. }));
        }
    }
}
