//! Job-related API endpoints

use crate::BughunterClient;
use crate::error::Result;
use bughunter_core::domain::job::Job;
use bughunter_core::dto::job::CreateJob;
use std::time::Duration;
use uuid::Uuid;

impl BughunterClient {
    /// Submit a repository for remediation
    ///
    /// # Returns
    /// The freshly created job, still `queued`
    pub async fn start_job(&self, repo_url: &str) -> Result<Job> {
        let url = format!("{}/jobs", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&CreateJob {
                repo_url: repo_url.to_string(),
            })
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Get a job snapshot by ID
    pub async fn get_job(&self, job_id: Uuid) -> Result<Job> {
        let url = format!("{}/jobs/{}", self.base_url, job_id);
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }

    /// List all jobs
    pub async fn list_jobs(&self) -> Result<Vec<Job>> {
        let url = format!("{}/jobs", self.base_url);
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }

    /// Ask the orchestrator to stop a running job
    pub async fn terminate_job(&self, job_id: Uuid) -> Result<Job> {
        let url = format!("{}/jobs/{}/terminate", self.base_url, job_id);
        let response = self.client.post(&url).send().await?;

        self.handle_response(response).await
    }

    /// Polls a job at a fixed interval until it is terminal
    ///
    /// `on_update` sees every snapshot, including the terminal one that is
    /// returned.
    pub async fn wait_for_job(
        &self,
        job_id: Uuid,
        interval: Duration,
        mut on_update: impl FnMut(&Job),
    ) -> Result<Job> {
        loop {
            let job = self.get_job(job_id).await?;
            on_update(&job);

            if job.is_terminal() {
                tracing::debug!("Job {} reached {}", job_id, job.status);
                return Ok(job);
            }

            tokio::time::sleep(interval).await;
        }
    }
}
