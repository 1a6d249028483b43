//! Job Service
//!
//! Business logic for job submission, lookup and operator termination.
//! Each accepted job gets its own pipeline task; a supervising task watches
//! it so a panicking run still ends `failed`.

use bughunter_core::domain::job::{Job, JobStatus};
use bughunter_core::dto::job::CreateJob;
use bughunter_core::store::JobStore;
use bughunter_runner::{JobContext, PipelineRunner};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::AbortHandle;
use uuid::Uuid;

/// Log line written when an operator stops a job
pub const TERMINATED_MESSAGE: &str = "Job terminated by operator";

/// Log line written when the pipeline task panics
pub const PANICKED_MESSAGE: &str = "Error: pipeline task panicked";

/// Service error type
#[derive(Debug)]
pub enum JobError {
    NotFound(Uuid),
    InvalidState(String),
    ValidationError(String),
}

type TaskMap = Arc<Mutex<HashMap<Uuid, AbortHandle>>>;

pub struct JobService {
    store: Arc<dyn JobStore>,
    runner: Arc<PipelineRunner>,
    tasks: TaskMap,
}

impl JobService {
    pub fn new(store: Arc<dyn JobStore>, runner: Arc<PipelineRunner>) -> Self {
        Self {
            store,
            runner,
            tasks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Creates a job and starts its pipeline without waiting for it
    pub fn start_job(&self, req: CreateJob) -> Result<Job, JobError> {
        let repo_url = req.repo_url.trim();
        if repo_url.is_empty() {
            return Err(JobError::ValidationError(
                "repoUrl is required".to_string(),
            ));
        }

        let job = self.store.create(repo_url);
        tracing::info!("Job created: {} for repository: {}", job.id, job.repo_url);

        self.spawn_pipeline(job.id, job.repo_url.clone());
        Ok(job)
    }

    fn spawn_pipeline(&self, job_id: Uuid, repo_url: String) {
        let runner = Arc::clone(&self.runner);
        let worker = tokio::spawn(async move { runner.run(job_id, &repo_url).await });

        lock(&self.tasks).insert(job_id, worker.abort_handle());

        let store = Arc::clone(&self.store);
        let tasks = Arc::clone(&self.tasks);
        let runner = Arc::clone(&self.runner);
        tokio::spawn(async move {
            match worker.await {
                Ok(()) => tracing::debug!("Pipeline task for job {} finished", job_id),
                Err(e) if e.is_cancelled() => {
                    tracing::debug!("Pipeline task for job {} aborted", job_id);
                    // The aborted run never reached its own cleanup
                    runner.release_workdir(job_id).await;
                }
                Err(e) => {
                    tracing::error!("Pipeline task for job {} panicked: {}", job_id, e);
                    JobContext::new(job_id, store).fail(PANICKED_MESSAGE);
                }
            }
            lock(&tasks).remove(&job_id);
        });
    }

    /// Get a job by ID
    pub fn get_job(&self, id: Uuid) -> Result<Job, JobError> {
        self.store.get(id).ok_or(JobError::NotFound(id))
    }

    /// List all jobs, oldest first
    pub fn list_jobs(&self) -> Vec<Job> {
        self.store.list()
    }

    /// Stops a running job and marks it terminated
    pub fn terminate_job(&self, id: Uuid) -> Result<Job, JobError> {
        let job = self.get_job(id)?;
        if job.is_terminal() {
            return Err(JobError::InvalidState(format!(
                "Job {} is already {}",
                id, job.status
            )));
        }

        if let Some(handle) = lock(&self.tasks).remove(&id) {
            handle.abort();
        }

        let mut terminated = false;
        self.store.update(id, &mut |job| {
            if job.advance(JobStatus::Terminated) {
                job.log(TERMINATED_MESSAGE);
                terminated = true;
            }
        });

        let job = self.get_job(id)?;
        if !terminated {
            // The run reached a terminal state before the abort landed
            return Err(JobError::InvalidState(format!(
                "Job {} is already {}",
                id, job.status
            )));
        }

        tracing::info!("Job {} terminated by operator", id);
        Ok(job)
    }

    /// Number of pipeline tasks still tracked
    pub fn active_tasks(&self) -> usize {
        lock(&self.tasks).len()
    }
}

fn lock(tasks: &TaskMap) -> std::sync::MutexGuard<'_, HashMap<Uuid, AbortHandle>> {
    tasks.lock().unwrap_or_else(PoisonError::into_inner)
}
