//! Job domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// First log line of every job.
pub const JOB_CREATED_MESSAGE: &str = "Job created";

/// One end-to-end remediation run against one repository.
///
/// Structure shared between orchestrator (owns), runner (mutates) and
/// client (polls snapshots).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: Uuid,
    pub repo_url: String,
    pub status: JobStatus,
    pub logs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Job {
    /// Creates a queued job with a fresh identifier
    pub fn new(repo_url: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            repo_url: repo_url.into(),
            status: JobStatus::Queued,
            logs: vec![JOB_CREATED_MESSAGE.to_string()],
            patch: None,
            created_at: Utc::now(),
        }
    }

    /// Moves the job to `next` if the state machine allows it.
    ///
    /// Returns `false` and leaves the status untouched for backward moves,
    /// self-transitions and anything leaving a terminal state.
    pub fn advance(&mut self, next: JobStatus) -> bool {
        if !self.status.can_transition_to(next) {
            return false;
        }
        self.status = next;
        true
    }

    /// Appends a line to the job log
    pub fn log(&mut self, line: impl Into<String>) {
        self.logs.push(line.into());
    }

    /// Stores the patch. A patch is set at most once.
    pub fn set_patch(&mut self, patch: impl Into<String>) -> bool {
        if self.patch.is_some() {
            return false;
        }
        self.patch = Some(patch.into());
        true
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Job lifecycle status
///
/// Forward order is `Queued < Cloning < Linting < Testing < Fixing < Done`.
/// `Failed` and `Terminated` can be entered from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Cloning,
    Linting,
    Testing,
    Fixing,
    #[serde(alias = "success")]
    Done,
    Failed,
    Terminated,
}

impl JobStatus {
    /// Position in the forward order. Terminal states share the highest rank.
    pub fn rank(self) -> u8 {
        match self {
            JobStatus::Queued => 0,
            JobStatus::Cloning => 1,
            JobStatus::Linting => 2,
            JobStatus::Testing => 3,
            JobStatus::Fixing => 4,
            JobStatus::Done | JobStatus::Failed | JobStatus::Terminated => 5,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Done | JobStatus::Failed | JobStatus::Terminated
        )
    }

    /// Whether the state machine permits moving from `self` to `next`
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            JobStatus::Failed | JobStatus::Terminated => true,
            _ => next.rank() > self.rank(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Cloning => "cloning",
            JobStatus::Linting => "linting",
            JobStatus::Testing => "testing",
            JobStatus::Fixing => "fixing",
            JobStatus::Done => "done",
            JobStatus::Failed => "failed",
            JobStatus::Terminated => "terminated",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
