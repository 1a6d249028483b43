//! Execution context for a pipeline job
//!
//! Every observable pipeline event goes through here: the line is appended
//! to the job record in the store and mirrored to tracing at the matching
//! level. Status changes and their log line are written in one update so a
//! poller never sees one without the other.

use bughunter_core::domain::job::JobStatus;
use bughunter_core::store::JobStore;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Per-job handle onto the job store
#[derive(Clone)]
pub struct JobContext {
    job_id: Uuid,
    store: Arc<dyn JobStore>,
}

impl JobContext {
    pub fn new(job_id: Uuid, store: Arc<dyn JobStore>) -> Self {
        Self { job_id, store }
    }

    pub fn job_id(&self) -> Uuid {
        self.job_id
    }

    fn append(&self, message: String) {
        self.store.update(self.job_id, &mut |job| job.log(message.clone()));
    }

    /// Logs an info message
    pub fn log_info(&self, message: impl Into<String>) {
        let message = message.into();
        info!(job_id = %self.job_id, "{}", message);
        self.append(message);
    }

    /// Logs a warning message
    pub fn log_warning(&self, message: impl Into<String>) {
        let message = message.into();
        warn!(job_id = %self.job_id, "{}", message);
        self.append(message);
    }

    /// Logs an error message
    pub fn log_error(&self, message: impl Into<String>) {
        let message = message.into();
        error!(job_id = %self.job_id, "{}", message);
        self.append(message);
    }

    /// Moves the job to `status` and records `message` with it.
    ///
    /// Returns `false` if the state machine refused the move; the message
    /// is still not written in that case.
    pub fn transition(&self, status: JobStatus, message: impl Into<String>) -> bool {
        let message = message.into();
        let mut moved = false;

        self.store.update(self.job_id, &mut |job| {
            if job.advance(status) {
                job.log(message.clone());
                moved = true;
            }
        });

        if moved {
            info!(job_id = %self.job_id, status = %status, "{}", message);
        } else {
            warn!(
                job_id = %self.job_id,
                "Refused transition to {} ({})", status, message
            );
        }
        moved
    }

    /// Appends the error line, then fixes the job as failed
    pub fn fail(&self, message: impl Into<String>) {
        let message = message.into();
        error!(job_id = %self.job_id, "{}", message);

        self.store.update(self.job_id, &mut |job| {
            job.log(message.clone());
            job.advance(JobStatus::Failed);
        });
    }

    /// Stores the patch on the job
    pub fn set_patch(&self, patch: &str) {
        self.store.update(self.job_id, &mut |job| {
            if !job.set_patch(patch) {
                warn!(job_id = %job.id, "Patch already set, keeping the first one");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bughunter_core::store::InMemoryJobStore;

    fn setup() -> (Arc<InMemoryJobStore>, JobContext) {
        let store = Arc::new(InMemoryJobStore::new());
        let job = store.create("https://example.com/repo.git");
        let ctx = JobContext::new(job.id, store.clone());
        (store, ctx)
    }

    #[test]
    fn test_log_appends_in_order() {
        let (store, ctx) = setup();
        ctx.log_info("one");
        ctx.log_warning("two");
        ctx.log_error("three");

        let job = store.get(ctx.job_id()).unwrap();
        assert_eq!(job.logs, vec!["Job created", "one", "two", "three"]);
    }

    #[test]
    fn test_transition_writes_status_and_message_together() {
        let (store, ctx) = setup();
        assert!(ctx.transition(JobStatus::Cloning, "Cloning repository..."));

        let job = store.get(ctx.job_id()).unwrap();
        assert_eq!(job.status, JobStatus::Cloning);
        assert_eq!(job.logs.last().unwrap(), "Cloning repository...");
    }

    #[test]
    fn test_refused_transition_leaves_job_untouched() {
        let (store, ctx) = setup();
        ctx.transition(JobStatus::Testing, "Running tests...");
        assert!(!ctx.transition(JobStatus::Linting, "back"));

        let job = store.get(ctx.job_id()).unwrap();
        assert_eq!(job.status, JobStatus::Testing);
        assert!(!job.logs.contains(&"back".to_string()));
    }

    #[test]
    fn test_fail_logs_then_freezes_job() {
        let (store, ctx) = setup();
        ctx.fail("Error: clone failed");
        ctx.log_info("after");
        ctx.set_patch("diff");

        let job = store.get(ctx.job_id()).unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.logs.last().unwrap(), "Error: clone failed");
        assert!(job.patch.is_none());
    }
}
