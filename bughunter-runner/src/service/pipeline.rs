//! Pipeline service
//!
//! Drives a job through clone -> install -> lint -> test -> fix -> verify:
//! - Mutates the job record at every stage boundary through `JobContext`
//! - Clone (and workspace preparation) failures are fatal, everything else is
//!   logged and tolerated
//! - Falls back to the linter's auto-fix when the agent leaves the tree untouched
//! - Verification re-runs are observational and never change the status
//!
//! The runner is the only writer for its job. It never returns an error.

use bughunter_core::domain::job::JobStatus;
use bughunter_core::store::JobStore;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::context::JobContext;
use crate::error::StageError;
use crate::service::agent::FixAgent;
use crate::service::toolchain::Toolchain;

/// Size of an empty serialized lint report (`[]`). Reports at or below this
/// size count as "no issues".
pub const EMPTY_REPORT_LEN: u64 = 2;

/// Characters of failing test output copied into the job log
pub const TEST_OUTPUT_PREVIEW: usize = 500;

/// Characters of the patch copied into the job log
pub const PATCH_PREVIEW: usize = 1000;

/// Lint report written by the lint stage, relative to the workdir
pub const LINT_REPORT_FILE: &str = "lint.json";

/// Lint report written by verification, relative to the workdir
pub const LINT_VERIFY_FILE: &str = "lint-after.json";

/// Stands in for the output of a failing test run that printed nothing
pub const SILENT_TEST_FAILURE: &str = "The test command failed without printing any output";

/// What a lint run left on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LintReport {
    /// No report file was produced
    Missing,
    /// A report at or below `EMPTY_REPORT_LEN` bytes
    Clean { size: u64 },
    /// A report with content
    Issues { size: u64 },
}

impl LintReport {
    /// Classifies a report by its size in bytes
    pub fn classify(size: Option<u64>) -> Self {
        match size {
            None => LintReport::Missing,
            Some(size) if size <= EMPTY_REPORT_LEN => LintReport::Clean { size },
            Some(size) => LintReport::Issues { size },
        }
    }

    pub fn exists(&self) -> bool {
        !matches!(self, LintReport::Missing)
    }

    pub fn has_issues(&self) -> bool {
        matches!(self, LintReport::Issues { .. })
    }
}

/// Which step produced the patch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PatchSource {
    Agent,
    AutoFix,
}

impl PatchSource {
    fn success_message(self) -> &'static str {
        match self {
            PatchSource::Agent => "Fix agent modified files, patch captured",
            PatchSource::AutoFix => {
                "ESLint auto-fix fallback modified files, patch captured from the fallback (not from the agent)"
            }
        }
    }
}

/// First `max_chars` characters of `text`, marked when cut
pub fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}\n... (truncated)", &text[..cut]),
        None => text.to_string(),
    }
}

/// Number of non-blank entries in porcelain status output
fn changed_paths(status: &str) -> usize {
    status.lines().filter(|line| !line.trim().is_empty()).count()
}

/// Returns the later status if both snapshots were read and they differ
fn changed<'a>(before: &Option<String>, after: &'a Option<String>) -> Option<&'a str> {
    match (before, after) {
        (Some(before), Some(after)) if before != after => Some(after.as_str()),
        _ => None,
    }
}

async fn inspect_report(path: &Path) -> LintReport {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() => LintReport::classify(Some(meta.len())),
        _ => LintReport::Missing,
    }
}

/// Orchestrates one job from clone to verification
pub struct PipelineRunner {
    store: Arc<dyn JobStore>,
    toolchain: Arc<dyn Toolchain>,
    agent: Arc<dyn FixAgent>,
    config: Config,
}

impl PipelineRunner {
    /// Creates a new pipeline runner
    ///
    /// # Arguments
    /// * `store` - Job store the runner writes progress into
    /// * `toolchain` - git / npm / eslint collaborators
    /// * `agent` - Fix agent adapter
    /// * `config` - Runner configuration
    pub fn new(
        store: Arc<dyn JobStore>,
        toolchain: Arc<dyn Toolchain>,
        agent: Arc<dyn FixAgent>,
        config: Config,
    ) -> Self {
        Self {
            store,
            toolchain,
            agent,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Runs the full pipeline for `job_id`
    ///
    /// Always leaves the job in a terminal state (`done` or `failed`) unless
    /// the task is aborted from outside.
    pub async fn run(&self, job_id: Uuid, repo_url: &str) {
        let ctx = JobContext::new(job_id, Arc::clone(&self.store));
        let workdir = self.config.workdir(job_id);

        info!(
            "Starting pipeline for job {} ({}) in {}",
            job_id,
            repo_url,
            workdir.display()
        );

        match self.execute(&ctx, repo_url, &workdir).await {
            Ok(true) => {
                ctx.transition(JobStatus::Done, "Pipeline completed with a patch");
            }
            Ok(false) => {
                ctx.transition(JobStatus::Done, "Pipeline completed without changes");
            }
            Err(e) => ctx.fail(format!("Error: {}", e)),
        }

        self.release_workdir(job_id).await;

        info!("Pipeline for job {} finished", job_id);
    }

    /// Removes the job's working directory when cleanup is enabled.
    ///
    /// `run` calls this itself; callers that abort a run call it once the
    /// aborted task has been dropped.
    pub async fn release_workdir(&self, job_id: Uuid) {
        if self.config.cleanup_workdir {
            self.cleanup(&self.config.workdir(job_id)).await;
        }
    }

    /// Runs every stage. Only fatal faults are returned; the bool reports
    /// whether a patch was captured.
    async fn execute(
        &self,
        ctx: &JobContext,
        repo_url: &str,
        workdir: &Path,
    ) -> Result<bool, StageError> {
        ctx.transition(JobStatus::Cloning, "Cloning repository...");
        self.toolchain.clone_repo(repo_url, workdir).await?;
        ctx.log_info(format!("Repository cloned into {}", workdir.display()));

        let scratch = [
            LINT_REPORT_FILE,
            LINT_VERIFY_FILE,
            self.config.prompt_file.as_str(),
            "node_modules/",
        ];
        if let Err(e) = self.toolchain.exclude_paths(workdir, &scratch).await {
            ctx.log_warning(format!("Could not hide pipeline files from git: {}", e));
        }

        ctx.transition(JobStatus::Linting, "Installing dependencies...");
        self.install(ctx, workdir).await;

        ctx.log_info("Running ESLint...");
        let report_path = workdir.join(LINT_REPORT_FILE);
        let lint = self.lint(ctx, workdir, &report_path).await;
        match lint {
            LintReport::Missing => {
                ctx.log_info("ESLint produced no report (no ESLint configuration?)")
            }
            LintReport::Clean { size } => {
                ctx.log_info(format!("ESLint report: {} bytes", size));
                ctx.log_info("No ESLint issues found");
            }
            LintReport::Issues { size } => {
                ctx.log_info(format!("ESLint report: {} bytes", size));
                ctx.log_warning("ESLint found issues");
            }
        }

        ctx.transition(JobStatus::Testing, "Running tests...");
        let test_output = self.test(ctx, workdir).await;

        ctx.transition(JobStatus::Fixing, "Running fix agent...");
        let patched = self
            .fix(ctx, workdir, lint, &report_path, test_output.as_deref())
            .await;

        self.verify(ctx, workdir, lint, test_output.is_some()).await;

        Ok(patched)
    }

    async fn install(&self, ctx: &JobContext, workdir: &Path) {
        match self.toolchain.install_dependencies(workdir).await {
            Ok(result) if result.success() => ctx.log_info("Dependencies installed"),
            Ok(result) => ctx.log_warning(format!(
                "Dependency install exited with code {}, continuing",
                result.exit_code
            )),
            Err(e) => ctx.log_warning(format!("Dependency install failed: {}, continuing", e)),
        }
    }

    async fn lint(&self, ctx: &JobContext, workdir: &Path, report_path: &Path) -> LintReport {
        if let Err(e) = self.toolchain.run_lint(workdir, report_path).await {
            ctx.log_warning(format!("ESLint could not run: {}", e));
        }
        inspect_report(report_path).await
    }

    /// Returns the combined output of a failing test run
    async fn test(&self, ctx: &JobContext, workdir: &Path) -> Option<String> {
        match self
            .toolchain
            .run_tests(workdir, self.config.test_timeout)
            .await
        {
            Ok(result) if result.success() => {
                ctx.log_info("Tests passed");
                None
            }
            Ok(result) => {
                let output = result.combined_output();
                if output.trim().is_empty() {
                    ctx.log_warning(format!(
                        "Tests failed (exit code {}) with no output",
                        result.exit_code
                    ));
                    return Some(format!(
                        "{} (exit code {})",
                        SILENT_TEST_FAILURE, result.exit_code
                    ));
                }
                ctx.log_warning(format!(
                    "Tests failed (exit code {}):\n{}",
                    result.exit_code,
                    preview(&output, TEST_OUTPUT_PREVIEW)
                ));
                Some(output)
            }
            Err(e) if e.is_timeout() => {
                ctx.log_warning(format!("Test run timed out, continuing: {}", e));
                None
            }
            Err(e) if e.is_launch() => {
                ctx.log_warning(format!("Test run could not start, continuing: {}", e));
                None
            }
            Err(e) => {
                ctx.log_warning(format!("Test run did not complete, continuing: {}", e));
                None
            }
        }
    }

    async fn snapshot(&self, ctx: &JobContext, workdir: &Path) -> Option<String> {
        match self.toolchain.working_tree_status(workdir).await {
            Ok(status) => Some(status),
            Err(e) => {
                ctx.log_warning(format!("Could not read working tree status: {}", e));
                None
            }
        }
    }

    /// Agent attempt plus auto-fix fallback. Returns whether a patch was stored.
    async fn fix(
        &self,
        ctx: &JobContext,
        workdir: &Path,
        lint: LintReport,
        report_path: &Path,
        test_output: Option<&str>,
    ) -> bool {
        let before = self.snapshot(ctx, workdir).await;

        let report = lint.exists().then_some(report_path);
        match self.agent.attempt_fix(workdir, report, test_output).await {
            Ok(output) => {
                ctx.log_info(format!("Agent exited with code {}", output.exit_code));
                ctx.log_info(format!("Agent output:\n{}", output.stdout));
                if !output.stderr.trim().is_empty() {
                    ctx.log_warning(format!("Agent stderr:\n{}", output.stderr));
                }
            }
            Err(e) => ctx.log_warning(format!("Fix agent could not run: {}", e)),
        }

        let after = self.snapshot(ctx, workdir).await;
        if let Some(status) = changed(&before, &after) {
            return self
                .capture_patch(ctx, workdir, status, PatchSource::Agent)
                .await;
        }

        ctx.log_info("Agent did not modify any files");

        if !lint.has_issues() {
            ctx.log_info("No ESLint issues to auto-fix, skipping fallback");
            return false;
        }

        ctx.log_info("Attempting ESLint auto-fix fallback...");
        match self.toolchain.run_lint_autofix(workdir).await {
            Ok(result) => {
                ctx.log_info(format!("ESLint auto-fix exited with code {}", result.exit_code))
            }
            Err(e) => ctx.log_warning(format!("ESLint auto-fix could not run: {}", e)),
        }

        let after_fallback = self.snapshot(ctx, workdir).await;
        if let Some(status) = changed(&before, &after_fallback) {
            return self
                .capture_patch(ctx, workdir, status, PatchSource::AutoFix)
                .await;
        }

        ctx.log_warning("Neither the fix agent nor the ESLint auto-fix fallback produced changes");
        ctx.log_info(
            "Possible reasons: the issues were already resolved, or they require manual intervention",
        );
        false
    }

    async fn capture_patch(
        &self,
        ctx: &JobContext,
        workdir: &Path,
        status: &str,
        source: PatchSource,
    ) -> bool {
        match self.toolchain.diff(workdir).await {
            Ok(diff) if !diff.trim().is_empty() => {
                ctx.set_patch(&diff);
                ctx.log_info(source.success_message());
                ctx.log_info(format!("{} file(s) changed", changed_paths(status)));
                ctx.log_info(format!("Patch preview:\n{}", preview(&diff, PATCH_PREVIEW)));
                true
            }
            Ok(_) => {
                ctx.log_warning("Working tree changed but the diff is empty");
                false
            }
            Err(e) => {
                ctx.log_warning(format!("Could not capture diff: {}", e));
                false
            }
        }
    }

    async fn verify(&self, ctx: &JobContext, workdir: &Path, lint: LintReport, tests_failed: bool) {
        if lint.has_issues() {
            ctx.log_info("Verifying: re-running ESLint...");
            let verify_path = workdir.join(LINT_VERIFY_FILE);
            match self.lint(ctx, workdir, &verify_path).await {
                LintReport::Issues { size } => ctx.log_warning(format!(
                    "ESLint still reports issues after fix ({} bytes)",
                    size
                )),
                LintReport::Clean { .. } => ctx.log_info("ESLint reports no remaining issues"),
                LintReport::Missing => ctx.log_warning("Verification ESLint run produced no report"),
            }
        }

        if tests_failed {
            ctx.log_info("Verifying: re-running tests...");
            match self
                .toolchain
                .run_tests(workdir, self.config.test_timeout)
                .await
            {
                Ok(result) if result.success() => ctx.log_info("Tests now pass"),
                Ok(result) => ctx.log_warning(format!(
                    "Tests still failing (exit code {})",
                    result.exit_code
                )),
                Err(e) => {
                    ctx.log_warning(format!("Verification test run did not complete: {}", e))
                }
            }
        }
    }

    async fn cleanup(&self, workdir: &Path) {
        match tokio::fs::remove_dir_all(workdir).await {
            Ok(()) => info!("Removed working directory {}", workdir.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                "Failed to remove working directory {}: {}",
                workdir.display(),
                e
            ),
        }
    }
}
