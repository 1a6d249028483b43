//! Job store
//!
//! Process-wide registry mapping a job identifier to its mutable record.
//! The orchestrator creates jobs and serves snapshots; each job's runner is
//! the only writer for that job. Readers always receive cloned snapshots.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;
use uuid::Uuid;

use crate::domain::job::Job;

/// Store for job records
///
/// Implementations must be safe to share across tasks. Writes to a single
/// job are serialized through `update`; writes to different jobs are
/// independent.
pub trait JobStore: Send + Sync {
    /// Allocates and registers a new queued job
    fn create(&self, repo_url: &str) -> Job;

    /// Returns a point-in-time snapshot of the job, if it exists
    fn get(&self, id: Uuid) -> Option<Job>;

    /// Applies `updater` to the job in place.
    ///
    /// Unknown ids are a no-op. Jobs already in a terminal state are left
    /// untouched and the updater is not called.
    fn update(&self, id: Uuid, updater: &mut dyn FnMut(&mut Job));

    /// Snapshots of every job, oldest first
    fn list(&self) -> Vec<Job>;
}

/// In-memory implementation of JobStore
///
/// The outer lock guards the id -> record map and is only held for writes
/// when a job is inserted. Each record has its own lock so that pollers of
/// one job never wait on another job's runner.
#[derive(Clone, Default)]
pub struct InMemoryJobStore {
    jobs: Arc<RwLock<HashMap<Uuid, Arc<RwLock<Job>>>>>,
}

impl InMemoryJobStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, id: Uuid) -> Option<Arc<RwLock<Job>>> {
        let jobs = self.jobs.read().unwrap_or_else(PoisonError::into_inner);
        jobs.get(&id).cloned()
    }
}

impl JobStore for InMemoryJobStore {
    fn create(&self, repo_url: &str) -> Job {
        let job = Job::new(repo_url);
        let mut jobs = self.jobs.write().unwrap_or_else(PoisonError::into_inner);
        jobs.insert(job.id, Arc::new(RwLock::new(job.clone())));
        debug!("Registered job {} for {}", job.id, repo_url);
        job
    }

    fn get(&self, id: Uuid) -> Option<Job> {
        let record = self.record(id)?;
        let job = record.read().unwrap_or_else(PoisonError::into_inner);
        Some(job.clone())
    }

    fn update(&self, id: Uuid, updater: &mut dyn FnMut(&mut Job)) {
        let Some(record) = self.record(id) else {
            debug!("Ignoring update for unknown job {}", id);
            return;
        };

        let mut job = record.write().unwrap_or_else(PoisonError::into_inner);
        if job.is_terminal() {
            debug!(
                "Ignoring update for job {} in terminal state {}",
                id, job.status
            );
            return;
        }

        updater(&mut job);
    }

    fn list(&self) -> Vec<Job> {
        let records: Vec<Arc<RwLock<Job>>> = {
            let jobs = self.jobs.read().unwrap_or_else(PoisonError::into_inner);
            jobs.values().cloned().collect()
        };

        let mut snapshots: Vec<Job> = records
            .iter()
            .map(|record| {
                record
                    .read()
                    .unwrap_or_else(PoisonError::into_inner)
                    .clone()
            })
            .collect();
        snapshots.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        snapshots
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::job::JobStatus;

    #[test]
    fn test_create_and_get() {
        let store = InMemoryJobStore::new();
        let job = store.create("https://example.com/repo.git");

        let fetched = store.get(job.id).unwrap();
        assert_eq!(fetched, job);
        assert_eq!(fetched.status, JobStatus::Queued);
        assert_eq!(fetched.logs, vec!["Job created".to_string()]);
    }

    #[test]
    fn test_get_unknown_returns_none() {
        let store = InMemoryJobStore::new();
        assert!(store.get(Uuid::new_v4()).is_none());
    }

    #[test]
    fn test_update_unknown_is_noop() {
        let store = InMemoryJobStore::new();
        let mut called = false;
        store.update(Uuid::new_v4(), &mut |_| called = true);
        assert!(!called);
    }

    #[test]
    fn test_update_mutates_in_place() {
        let store = InMemoryJobStore::new();
        let job = store.create("repo");

        store.update(job.id, &mut |j| {
            j.advance(JobStatus::Cloning);
            j.log("Cloning repository...");
        });

        let fetched = store.get(job.id).unwrap();
        assert_eq!(fetched.status, JobStatus::Cloning);
        assert_eq!(fetched.logs.len(), 2);
    }

    #[test]
    fn test_snapshot_is_detached_from_store() {
        let store = InMemoryJobStore::new();
        let job = store.create("repo");
        let before = store.get(job.id).unwrap();

        store.update(job.id, &mut |j| j.log("later"));

        assert_eq!(before.logs.len(), 1);
        assert_eq!(store.get(job.id).unwrap().logs.len(), 2);
    }

    #[test]
    fn test_terminal_job_never_mutates() {
        let store = InMemoryJobStore::new();
        let job = store.create("repo");
        store.update(job.id, &mut |j| {
            j.advance(JobStatus::Failed);
            j.log("Error: boom");
        });

        store.update(job.id, &mut |j| {
            j.log("should not appear");
            j.set_patch("diff");
        });

        let fetched = store.get(job.id).unwrap();
        assert_eq!(fetched.status, JobStatus::Failed);
        assert_eq!(fetched.logs.last().map(String::as_str), Some("Error: boom"));
        assert!(fetched.patch.is_none());
    }

    #[test]
    fn test_list_returns_all_jobs_oldest_first() {
        let store = InMemoryJobStore::new();
        let first = store.create("a");
        let second = store.create("b");

        let jobs = store.list();
        assert_eq!(jobs.len(), 2);
        assert!(jobs[0].created_at <= jobs[1].created_at);
        let ids: Vec<Uuid> = jobs.iter().map(|j| j.id).collect();
        assert!(ids.contains(&first.id));
        assert!(ids.contains(&second.id));
    }

    #[test]
    fn test_concurrent_readers_never_see_logs_shrink() {
        let store = InMemoryJobStore::new();
        let job = store.create("repo");
        let id = job.id;

        let writer = {
            let store = store.clone();
            std::thread::spawn(move || {
                for i in 0..200 {
                    store.update(id, &mut |j| j.log(format!("line {i}")));
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || {
                    let mut last = 0;
                    for _ in 0..200 {
                        let len = store.get(id).unwrap().logs.len();
                        assert!(len >= last);
                        last = len;
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!(store.get(id).unwrap().logs.len(), 201);
    }
}
