//! Job DTOs

use serde::{Deserialize, Serialize};

/// Request to start a new remediation job
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateJob {
    #[serde(default)]
    pub repo_url: String,
}
