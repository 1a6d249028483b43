//! Stub collaborators for service and router tests

use async_trait::async_trait;
use bughunter_core::domain::job::Job;
use bughunter_core::store::{InMemoryJobStore, JobStore};
use bughunter_runner::{
    AgentError, AgentOutput, Config, ExecError, FixAgent, PipelineRunner, StageError,
    StageResult, Toolchain,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::service::JobService;

#[derive(Clone, Copy)]
pub enum CloneBehaviour {
    /// Clone creates the target, then never returns
    Hang,
    /// Clone exits non-zero
    Fail,
    /// Clone succeeds, every later stage is a no-op
    Succeed,
    /// The pipeline task panics
    Panic,
}

pub struct StubToolchain(pub CloneBehaviour);

fn ok() -> StageResult {
    StageResult {
        exit_code: 0,
        stdout: String::new(),
        stderr: String::new(),
        elapsed: Duration::ZERO,
    }
}

#[async_trait]
impl Toolchain for StubToolchain {
    async fn clone_repo(&self, _repo_url: &str, target: &Path) -> Result<(), StageError> {
        match self.0 {
            CloneBehaviour::Hang => {
                std::fs::create_dir_all(target).unwrap();
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(())
            }
            CloneBehaviour::Fail => Err(StageError::Clone {
                exit_code: 128,
                stderr: "fatal: repository not found".to_string(),
            }),
            CloneBehaviour::Succeed => {
                std::fs::create_dir_all(target).unwrap();
                Ok(())
            }
            CloneBehaviour::Panic => panic!("clone exploded"),
        }
    }

    async fn install_dependencies(&self, _dir: &Path) -> Result<StageResult, ExecError> {
        Ok(ok())
    }

    async fn run_lint(&self, _dir: &Path, _output_file: &Path) -> Result<StageResult, ExecError> {
        Ok(ok())
    }

    async fn run_lint_autofix(&self, _dir: &Path) -> Result<StageResult, ExecError> {
        Ok(ok())
    }

    async fn run_tests(&self, _dir: &Path, _timeout: Duration) -> Result<StageResult, ExecError> {
        Ok(ok())
    }

    async fn working_tree_status(&self, _dir: &Path) -> Result<String, StageError> {
        Ok(String::new())
    }

    async fn diff(&self, _dir: &Path) -> Result<String, StageError> {
        Ok(String::new())
    }

    async fn exclude_paths(&self, _dir: &Path, _paths: &[&str]) -> Result<(), StageError> {
        Ok(())
    }
}

pub struct IdleAgent;

#[async_trait]
impl FixAgent for IdleAgent {
    async fn attempt_fix(
        &self,
        _workdir: &Path,
        _lint_report: Option<&Path>,
        _test_output: Option<&str>,
    ) -> Result<AgentOutput, AgentError> {
        Ok(ok().into())
    }
}

pub fn job_service(behaviour: CloneBehaviour) -> (Arc<JobService>, tempfile::TempDir) {
    job_service_with(behaviour, |_| {})
}

pub fn job_service_with(
    behaviour: CloneBehaviour,
    configure: impl FnOnce(&mut Config),
) -> (Arc<JobService>, tempfile::TempDir) {
    let base = tempfile::tempdir().unwrap();
    let mut config = Config::new(base.path().to_path_buf());
    configure(&mut config);

    let store: Arc<dyn JobStore> = Arc::new(InMemoryJobStore::new());
    let runner = PipelineRunner::new(
        Arc::clone(&store),
        Arc::new(StubToolchain(behaviour)),
        Arc::new(IdleAgent),
        config,
    );
    (Arc::new(JobService::new(store, Arc::new(runner))), base)
}

pub async fn wait_for_terminal(service: &JobService, id: Uuid) -> Job {
    for _ in 0..500 {
        let job = service.get_job(id).unwrap();
        if job.is_terminal() {
            return job;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {} did not finish", id);
}
