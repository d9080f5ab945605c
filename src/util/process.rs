//! Subprocess execution utilities.

use std::ffi::OsStr;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use crate::util::env::EnvironmentMap;

/// How often a running child is polled while a timeout is armed.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// How long an output pipe may stay silent after the child is gone before
/// the reader is abandoned. A grandchild that inherited the pipe can keep it
/// open long after the direct child exited.
const DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Result of a finished (or killed) child process.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    /// Exit status as reported by the OS
    pub status: ExitStatus,
    /// Captured stdout (empty when stdio was inherited)
    pub stdout: Vec<u8>,
    /// Captured stderr (empty when stdio was inherited)
    pub stderr: Vec<u8>,
    /// The child was killed because it outlived its timeout
    pub timed_out: bool,
}

impl ProcessOutput {
    /// Whether the child exited with status 0 before its deadline.
    pub fn success(&self) -> bool {
        !self.timed_out && self.status.success()
    }

    /// Exit code, if the child exited normally.
    pub fn code(&self) -> Option<i32> {
        self.status.code()
    }

    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// Builder for subprocess execution.
#[derive(Debug, Clone)]
pub struct ProcessBuilder {
    program: PathBuf,
    args: Vec<String>,
    env: Option<EnvironmentMap>,
    timeout: Option<Duration>,
}

impl ProcessBuilder {
    /// Create a new process builder for the given program.
    pub fn new(program: impl AsRef<Path>) -> Self {
        ProcessBuilder {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            env: None,
            timeout: None,
        }
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_string_lossy().into_owned());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(
            args.into_iter()
                .map(|s| s.as_ref().to_string_lossy().into_owned()),
        );
        self
    }

    /// Run the child with exactly this environment instead of inheriting
    /// the current one.
    pub fn env_map(mut self, env: &EnvironmentMap) -> Self {
        self.env = Some(env.clone());
        self
    }

    /// Kill the child if it runs longer than `timeout`. `None` waits forever.
    ///
    /// On Unix a child with a timeout runs in its own process group, and the
    /// whole group is killed at the deadline.
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build the Command.
    fn build_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);

        if let Some(ref env) = self.env {
            cmd.env_clear();
            cmd.envs(env.iter());
        }

        if self.timeout.is_some() {
            own_process_group(&mut cmd);
        }

        cmd
    }

    /// Execute the command with stdout and stderr captured.
    pub fn exec(&self) -> io::Result<ProcessOutput> {
        let mut cmd = self.build_command();
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let mut child = cmd.spawn()?;

        // Drain both pipes on their own threads so a chatty child cannot
        // block on a full pipe while we poll for exit.
        let stdout = child.stdout.take().map(spawn_reader);
        let stderr = child.stderr.take().map(spawn_reader);

        let (status, timed_out) = wait_with_timeout(&mut child, self.timeout)?;

        Ok(ProcessOutput {
            status,
            stdout: collect_output(stdout)?,
            stderr: collect_output(stderr)?,
            timed_out,
        })
    }

    /// Execute with inherited stdio and return once the child is gone.
    pub fn status(&self) -> io::Result<ProcessOutput> {
        let mut cmd = self.build_command();
        if self.timeout.is_some() {
            // Outside the terminal's foreground group a read would stop it.
            cmd.stdin(Stdio::null());
        }

        let mut child = cmd.spawn()?;
        let (status, timed_out) = wait_with_timeout(&mut child, self.timeout)?;

        Ok(ProcessOutput {
            status,
            stdout: Vec::new(),
            stderr: Vec::new(),
            timed_out,
        })
    }

    /// Display the command for logs and error messages.
    pub fn display_command(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

#[cfg(unix)]
fn own_process_group(cmd: &mut Command) {
    use std::os::unix::process::CommandExt;
    cmd.process_group(0);
}

#[cfg(not(unix))]
fn own_process_group(_cmd: &mut Command) {}

/// Kill `child` together with everything it spawned.
fn kill_tree(child: &mut Child) {
    #[cfg(unix)]
    {
        if let Ok(pgid) = libc::pid_t::try_from(child.id()) {
            // SAFETY: killpg takes no pointers. The child leads its own group
            // (see `own_process_group`) and has not been reaped yet, so the id
            // cannot have been reused.
            unsafe {
                libc::killpg(pgid, libc::SIGKILL);
            }
        }
    }

    // The child may exit between try_wait and kill.
    let _ = child.kill();
}

type Chunks = Receiver<io::Result<Vec<u8>>>;

/// Forward everything read from `reader` as chunks over a channel.
fn spawn_reader<R: Read + Send + 'static>(mut reader: R) -> Chunks {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = [0u8; 8192];
        loop {
            match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    if tx.send(Ok(buf[..n].to_vec())).is_err() {
                        break;
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    let _ = tx.send(Err(e));
                    break;
                }
            }
        }
    });
    rx
}

/// Gather a reader's output once the child has exited.
///
/// Stops at end of stream, or when the pipe stays silent for
/// [`DRAIN_GRACE`]; the detached reader then finishes on its own.
fn collect_output(chunks: Option<Chunks>) -> io::Result<Vec<u8>> {
    let mut out = Vec::new();
    let Some(chunks) = chunks else {
        return Ok(out);
    };

    loop {
        match chunks.recv_timeout(DRAIN_GRACE) {
            Ok(chunk) => out.extend_from_slice(&chunk?),
            Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {
                tracing::debug!("output pipe still held open after exit, not waiting for it");
                break;
            }
        }
    }

    Ok(out)
}

/// Wait for `child`, killing it once `timeout` has elapsed.
///
/// Returns the final status and whether the deadline was hit.
fn wait_with_timeout(child: &mut Child, timeout: Option<Duration>) -> io::Result<(ExitStatus, bool)> {
    let Some(timeout) = timeout else {
        return Ok((child.wait()?, false));
    };

    let deadline = Instant::now().checked_add(timeout);
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok((status, false));
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            tracing::debug!("killing child {} after {:?}", child.id(), timeout);
            kill_tree(child);
            let status = child.wait()?;
            return Ok((status, true));
        }
        thread::sleep(POLL_INTERVAL);
    }
}
