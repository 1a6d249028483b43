//! Toolchain service
//!
//! The external collaborators a pipeline run talks to:
//! - git: clone, working tree status, diff
//! - npm: dependency install, test command
//! - eslint: JSON report and auto-fix
//!
//! Every method goes through a `CommandExecutor`, so the service itself never
//! spawns processes and can be exercised with a scripted executor.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::{ExecError, StageError};
use crate::process::{CommandExecutor, CommandSpec, StageResult};

/// Service trait for the project toolchain
#[async_trait]
pub trait Toolchain: Send + Sync {
    /// Clones `repo_url` into `target`. A non-zero exit is a fault.
    async fn clone_repo(&self, repo_url: &str, target: &Path) -> Result<(), StageError>;

    /// Installs declared dependencies
    async fn install_dependencies(&self, dir: &Path) -> Result<StageResult, ExecError>;

    /// Runs the linter, writing its JSON report to `output_file`
    async fn run_lint(&self, dir: &Path, output_file: &Path) -> Result<StageResult, ExecError>;

    /// Runs the linter in auto-fix mode
    async fn run_lint_autofix(&self, dir: &Path) -> Result<StageResult, ExecError>;

    /// Runs the project's test command under `timeout`
    async fn run_tests(&self, dir: &Path, timeout: Duration) -> Result<StageResult, ExecError>;

    /// Porcelain working tree status
    async fn working_tree_status(&self, dir: &Path) -> Result<String, StageError>;

    /// Diff of the working tree against HEAD, new files included
    async fn diff(&self, dir: &Path) -> Result<String, StageError>;

    /// Hides pipeline-owned files from status and diff
    async fn exclude_paths(&self, dir: &Path, paths: &[&str]) -> Result<(), StageError>;
}

/// Toolchain for npm projects in git repositories
pub struct NodeToolchain {
    executor: Arc<dyn CommandExecutor>,
}

impl NodeToolchain {
    pub fn new(executor: Arc<dyn CommandExecutor>) -> Self {
        Self { executor }
    }

    /// Runs a git query and returns stdout, treating a non-zero exit as a fault
    async fn git_query(&self, dir: &Path, args: &[&str]) -> Result<String, StageError> {
        let spec = CommandSpec::new("git").args(args.iter().copied()).current_dir(dir);
        let command = spec.display();
        let result = self.executor.run(spec).await?;

        if !result.success() {
            return Err(StageError::Git {
                command,
                exit_code: result.exit_code,
                stderr: result.stderr.trim().to_string(),
            });
        }
        Ok(result.stdout)
    }
}

#[async_trait]
impl Toolchain for NodeToolchain {
    async fn clone_repo(&self, repo_url: &str, target: &Path) -> Result<(), StageError> {
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| StageError::Workspace {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let spec = CommandSpec::new("git")
            .arg("clone")
            .arg(repo_url)
            .arg(target.to_string_lossy());
        let result = self.executor.run(spec).await?;

        if !result.success() {
            return Err(StageError::Clone {
                exit_code: result.exit_code,
                stderr: result.stderr.trim().to_string(),
            });
        }

        debug!("Cloned {} into {}", repo_url, target.display());
        Ok(())
    }

    async fn install_dependencies(&self, dir: &Path) -> Result<StageResult, ExecError> {
        self.executor
            .run(CommandSpec::new("npm").arg("ci").current_dir(dir))
            .await
    }

    async fn run_lint(&self, dir: &Path, output_file: &Path) -> Result<StageResult, ExecError> {
        let spec = CommandSpec::new("npx")
            .args(["eslint", ".", "-f", "json", "-o"])
            .arg(output_file.to_string_lossy())
            .current_dir(dir);
        self.executor.run(spec).await
    }

    async fn run_lint_autofix(&self, dir: &Path) -> Result<StageResult, ExecError> {
        let spec = CommandSpec::new("npx")
            .args(["eslint", ".", "--fix"])
            .current_dir(dir);
        self.executor.run(spec).await
    }

    async fn run_tests(&self, dir: &Path, timeout: Duration) -> Result<StageResult, ExecError> {
        let spec = CommandSpec::new("npm")
            .arg("test")
            .current_dir(dir)
            .timeout(Some(timeout));
        self.executor.run(spec).await
    }

    async fn working_tree_status(&self, dir: &Path) -> Result<String, StageError> {
        self.git_query(dir, &["status", "--porcelain"]).await
    }

    async fn diff(&self, dir: &Path) -> Result<String, StageError> {
        // Intent-to-add makes untracked files show up in `git diff`
        self.git_query(dir, &["add", "--intent-to-add", "--all"])
            .await?;
        self.git_query(dir, &["diff"]).await
    }

    async fn exclude_paths(&self, dir: &Path, paths: &[&str]) -> Result<(), StageError> {
        let info_dir = dir.join(".git").join("info");
        let workspace_err = |source| StageError::Workspace {
            path: info_dir.clone(),
            source,
        };

        tokio::fs::create_dir_all(&info_dir)
            .await
            .map_err(workspace_err)?;

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(info_dir.join("exclude"))
            .await
            .map_err(workspace_err)?;

        let mut block = String::from("\n# bughunter scratch files\n");
        for path in paths {
            block.push_str(path);
            block.push('\n');
        }
        file.write_all(block.as_bytes())
            .await
            .map_err(workspace_err)?;
        file.flush().await.map_err(workspace_err)?;

        Ok(())
    }
}
