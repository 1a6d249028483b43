//! Error types for the runner

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// A command could not be run to completion.
///
/// A command that ran and exited non-zero is not an error; see `StageResult`.
#[derive(Debug, Error)]
pub enum ExecError {
    /// The process could not be started
    #[error("Failed to launch '{program}': {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The process exceeded its time budget and was killed
    #[error("'{program}' timed out after {}s", timeout.as_secs())]
    TimedOut { program: String, timeout: Duration },

    /// Collecting the process output failed
    #[error("Failed to collect output of '{program}': {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

impl ExecError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ExecError::TimedOut { .. })
    }

    pub fn is_launch(&self) -> bool {
        matches!(self, ExecError::Launch { .. })
    }
}

/// A toolchain step failed in a way the caller has to decide about
#[derive(Debug, Error)]
pub enum StageError {
    /// `git clone` exited non-zero
    #[error("Clone failed (exit code {exit_code}): {stderr}")]
    Clone { exit_code: i32, stderr: String },

    /// A git query (status, diff) exited non-zero
    #[error("'{command}' failed (exit code {exit_code}): {stderr}")]
    Git {
        command: String,
        exit_code: i32,
        stderr: String,
    },

    /// The job workspace could not be prepared
    #[error("Workspace error at {}: {source}", path.display())]
    Workspace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Exec(#[from] ExecError),
}

/// The fix agent could not be invoked
#[derive(Debug, Error)]
pub enum AgentError {
    /// The prompt file could not be written into the working directory
    #[error("Failed to write prompt file {}: {source}", path.display())]
    Prompt {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Exec(#[from] ExecError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clone_error_carries_stderr() {
        let err = StageError::Clone {
            exit_code: 128,
            stderr: "fatal: repository not found".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("128"));
        assert!(message.contains("repository not found"));
    }

    #[test]
    fn test_timeout_is_distinct_from_launch() {
        let timeout = ExecError::TimedOut {
            program: "npm".to_string(),
            timeout: Duration::from_secs(30),
        };
        let launch = ExecError::Launch {
            program: "npm".to_string(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert!(timeout.is_timeout());
        assert!(!launch.is_timeout());
        assert!(launch.is_launch());
        assert!(!timeout.is_launch());
        assert_eq!(timeout.to_string(), "'npm' timed out after 30s");
    }
}
