//! Runner configuration
//!
//! Defines the configurable parameters of a pipeline run: where job
//! workspaces live, how long tests may run, and how the fix agent is invoked.

use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

/// Prefix of every job working directory under the workspace base
pub const WORKDIR_PREFIX: &str = "bughunter-";

/// Runner configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory under which per-job working directories are created
    pub workspace_base: PathBuf,

    /// Maximum time the project's test command may run
    pub test_timeout: Duration,

    /// Maximum time the fix agent may run (None = unbounded)
    pub agent_timeout: Option<Duration>,

    /// Fix agent executable
    pub agent_bin: String,

    /// File name of the agent prompt, written inside the working directory
    pub prompt_file: String,

    /// Remove the working directory once the job is terminal
    pub cleanup_workdir: bool,
}

impl Config {
    /// Creates a new configuration with defaults rooted at `workspace_base`
    pub fn new(workspace_base: PathBuf) -> Self {
        Self {
            workspace_base,
            test_timeout: Duration::from_secs(30),
            agent_timeout: None,
            agent_bin: "cline".to_string(),
            prompt_file: ".bughunter-prompt.md".to_string(),
            cleanup_workdir: false,
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Recognized environment variables (all optional):
    /// - BUGHUNTER_WORKSPACE_BASE (default: system temp dir)
    /// - BUGHUNTER_TEST_TIMEOUT (seconds, default: 30)
    /// - BUGHUNTER_AGENT_TIMEOUT (seconds, default: unbounded)
    /// - BUGHUNTER_AGENT_BIN (default: cline)
    /// - BUGHUNTER_PROMPT_FILE (default: .bughunter-prompt.md)
    /// - BUGHUNTER_CLEANUP_WORKDIR (true/false, default: false)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let workspace_base = std::env::var("BUGHUNTER_WORKSPACE_BASE")
            .ok()
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.workspace_base);

        let test_timeout = std::env::var("BUGHUNTER_TEST_TIMEOUT")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.test_timeout);

        let agent_timeout = std::env::var("BUGHUNTER_AGENT_TIMEOUT")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs);

        let agent_bin = std::env::var("BUGHUNTER_AGENT_BIN").unwrap_or(defaults.agent_bin);

        let prompt_file = std::env::var("BUGHUNTER_PROMPT_FILE").unwrap_or(defaults.prompt_file);

        let cleanup_workdir = std::env::var("BUGHUNTER_CLEANUP_WORKDIR")
            .ok()
            .and_then(|s| s.parse::<bool>().ok())
            .unwrap_or(defaults.cleanup_workdir);

        Self {
            workspace_base,
            test_timeout,
            agent_timeout,
            agent_bin,
            prompt_file,
            cleanup_workdir,
        }
    }

    /// Working directory of a job. Exclusive to that job.
    pub fn workdir(&self, job_id: Uuid) -> PathBuf {
        self.workspace_base
            .join(format!("{}{}", WORKDIR_PREFIX, job_id))
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.workspace_base.as_os_str().is_empty() {
            anyhow::bail!("workspace_base cannot be empty");
        }

        if self.test_timeout.is_zero() {
            anyhow::bail!("test_timeout must be greater than 0");
        }

        if self.agent_timeout.is_some_and(|t| t.is_zero()) {
            anyhow::bail!("agent_timeout must be greater than 0");
        }

        if self.agent_bin.trim().is_empty() {
            anyhow::bail!("agent_bin cannot be empty");
        }

        if self.prompt_file.trim().is_empty() || self.prompt_file.contains('/') {
            anyhow::bail!("prompt_file must be a plain file name");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(std::env::temp_dir())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.test_timeout, Duration::from_secs(30));
        assert_eq!(config.agent_bin, "cline");
        assert!(config.agent_timeout.is_none());
        assert!(!config.cleanup_workdir);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_workdir_is_job_scoped() {
        let config = Config::new(PathBuf::from("/tmp"));
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        assert_eq!(
            config.workdir(a),
            PathBuf::from(format!("/tmp/bughunter-{}", a))
        );
        assert_ne!(config.workdir(a), config.workdir(b));
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.test_timeout = Duration::ZERO;
        assert!(config.validate().is_err());
        config.test_timeout = Duration::from_secs(30);

        config.agent_bin = "  ".to_string();
        assert!(config.validate().is_err());
        config.agent_bin = "cline".to_string();

        config.prompt_file = "prompts/fix.md".to_string();
        assert!(config.validate().is_err());
        config.prompt_file = "fix.md".to_string();

        config.agent_timeout = Some(Duration::ZERO);
        assert!(config.validate().is_err());
        config.agent_timeout = Some(Duration::from_secs(600));
        assert!(config.validate().is_ok());
    }
}
