//! Fix agent service
//!
//! Wraps the external AI coding agent. The adapter only triggers an attempt:
//! it builds the prompt, writes it into the working directory and runs the
//! agent there. Whether anything changed is decided by the pipeline from the
//! working tree, never from the agent's output.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::AgentError;
use crate::process::{CommandExecutor, CommandSpec, StageResult};

/// Fixed instruction at the top of every prompt
pub const BASE_PROMPT: &str = "\
You are working inside a checked-out JavaScript/TypeScript repository.
Fix the ESLint problems and failing tests described below by editing the source files in place.
Keep changes minimal and behaviour-preserving. Do not commit, push or create branches.
If a section is missing, there is nothing to fix for it.
";

/// Stdout reported when the agent printed nothing
pub const EMPTY_AGENT_OUTPUT: &str = "Agent finished with no output";

/// Raw result of one agent invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl From<StageResult> for AgentOutput {
    fn from(result: StageResult) -> Self {
        let stdout = if result.stdout.trim().is_empty() {
            EMPTY_AGENT_OUTPUT.to_string()
        } else {
            result.stdout
        };
        Self {
            stdout,
            stderr: result.stderr,
            exit_code: result.exit_code,
        }
    }
}

/// Service trait for a fix attempt
#[async_trait]
pub trait FixAgent: Send + Sync {
    /// Runs one fix attempt against `workdir`
    ///
    /// # Arguments
    /// * `workdir` - The job's working directory
    /// * `lint_report` - Path of the lint report, if one was produced
    /// * `test_output` - Captured output of a failing test run
    async fn attempt_fix(
        &self,
        workdir: &Path,
        lint_report: Option<&Path>,
        test_output: Option<&str>,
    ) -> Result<AgentOutput, AgentError>;
}

/// Builds the agent prompt from the base instruction and optional context
pub fn build_prompt(lint_report: Option<&str>, test_output: Option<&str>) -> String {
    let mut prompt = String::from(BASE_PROMPT);

    if let Some(report) = lint_report {
        prompt.push_str("\n## ESLint report\n\n```json\n");
        prompt.push_str(report.trim_end());
        prompt.push_str("\n```\n");
    }

    if let Some(output) = test_output {
        prompt.push_str("\n## Failing test output\n\n```\n");
        prompt.push_str(output.trim_end());
        prompt.push_str("\n```\n");
    }

    prompt
}

/// Agent driven through its command-line interface
pub struct CliFixAgent {
    executor: Arc<dyn CommandExecutor>,
    binary: String,
    prompt_file: String,
    timeout: Option<Duration>,
}

impl CliFixAgent {
    /// Creates a new CLI agent adapter
    ///
    /// # Arguments
    /// * `executor` - Executor used to run the agent
    /// * `binary` - Agent executable (e.g. `cline`)
    /// * `prompt_file` - File name the prompt is written to inside the workdir
    /// * `timeout` - Optional time budget for one attempt
    pub fn new(
        executor: Arc<dyn CommandExecutor>,
        binary: impl Into<String>,
        prompt_file: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            executor,
            binary: binary.into(),
            prompt_file: prompt_file.into(),
            timeout,
        }
    }
}

#[async_trait]
impl FixAgent for CliFixAgent {
    async fn attempt_fix(
        &self,
        workdir: &Path,
        lint_report: Option<&Path>,
        test_output: Option<&str>,
    ) -> Result<AgentOutput, AgentError> {
        let report = match lint_report {
            Some(path) => match tokio::fs::read_to_string(path).await {
                Ok(contents) => Some(contents),
                Err(e) => {
                    warn!("Lint report {} unreadable, omitting: {}", path.display(), e);
                    None
                }
            },
            None => None,
        };

        let prompt = build_prompt(report.as_deref(), test_output);
        let prompt_path = workdir.join(&self.prompt_file);
        tokio::fs::write(&prompt_path, &prompt)
            .await
            .map_err(|source| AgentError::Prompt {
                path: prompt_path.clone(),
                source,
            })?;

        debug!(
            "Wrote {} byte prompt to {}",
            prompt.len(),
            prompt_path.display()
        );

        let spec = CommandSpec::new(&self.binary)
            .arg("run")
            .arg(format!("--prompt-file={}", prompt_path.display()))
            .arg(format!("--repo={}", workdir.display()))
            .current_dir(workdir)
            .timeout(self.timeout);

        let result = self.executor.run(spec).await?;
        Ok(result.into())
    }
}
