//! Process execution
//!
//! Runs external commands for the pipeline stages:
//! - Captures stdout, stderr and the exit code
//! - A non-zero exit is returned as data, never as an error
//! - Launch failures and timeouts are the only faults
//! - A timed-out child is killed before the fault is reported, together
//!   with everything it started

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::debug;

use crate::error::ExecError;

/// A command to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub timeout: Option<Duration>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            timeout: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Program and arguments joined for log lines
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Outcome of a command that ran to completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageResult {
    /// Exit code, -1 if the process was terminated by a signal
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

impl StageResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// stdout followed by stderr, separated by a newline when both are present
    pub fn combined_output(&self) -> String {
        match (self.stdout.is_empty(), self.stderr.is_empty()) {
            (false, false) => {
                let mut out = self.stdout.clone();
                if !out.ends_with('\n') {
                    out.push('\n');
                }
                out.push_str(&self.stderr);
                out
            }
            (false, true) => self.stdout.clone(),
            (true, false) => self.stderr.clone(),
            (true, true) => String::new(),
        }
    }
}

/// Runs external commands
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn run(&self, spec: CommandSpec) -> Result<StageResult, ExecError>;
}

/// Executor backed by `tokio::process`
#[derive(Debug, Clone, Default)]
pub struct TokioExecutor;

impl TokioExecutor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandExecutor for TokioExecutor {
    async fn run(&self, spec: CommandSpec) -> Result<StageResult, ExecError> {
        debug!("Executing: {} (cwd: {:?})", spec.display(), spec.cwd);

        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(cwd) = &spec.cwd {
            command.current_dir(cwd);
        }

        // Own process group, so grandchildren (the runner behind `npm test`)
        // can be killed with the child.
        #[cfg(unix)]
        {
            command.process_group(0);
        }

        let started = Instant::now();
        let child = command.spawn().map_err(|source| ExecError::Launch {
            program: spec.program.clone(),
            source,
        })?;

        // Held across the wait: a timeout or an aborted task drops it and
        // the whole group is killed.
        let _group = ProcessGroupGuard(child.id());

        let waited = match spec.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
                Ok(waited) => waited,
                Err(_) => {
                    debug!("'{}' exceeded {:?}, killed", spec.program, limit);
                    return Err(ExecError::TimedOut {
                        program: spec.program,
                        timeout: limit,
                    });
                }
            },
            None => child.wait_with_output().await,
        };

        let output = waited.map_err(|source| ExecError::Wait {
            program: spec.program.clone(),
            source,
        })?;

        let result = StageResult {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            elapsed: started.elapsed(),
        };

        debug!(
            "'{}' exited with code {} in {:?} (stdout_len={}, stderr_len={})",
            spec.program,
            result.exit_code,
            result.elapsed,
            result.stdout.len(),
            result.stderr.len()
        );

        Ok(result)
    }
}

/// Kills a child's process group when dropped
struct ProcessGroupGuard(Option<u32>);

impl Drop for ProcessGroupGuard {
    fn drop(&mut self) {
        if let Some(pgid) = self.0 {
            kill_process_group(pgid);
        }
    }
}

#[cfg(unix)]
fn kill_process_group(pgid: u32) {
    use nix::errno::Errno;
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    match killpg(Pid::from_raw(pgid as i32), Signal::SIGKILL) {
        Ok(()) => debug!("Killed process group {}", pgid),
        // Every member already exited
        Err(Errno::ESRCH) => {}
        Err(e) => debug!("Failed to kill process group {}: {}", pgid, e),
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pgid: u32) {}
