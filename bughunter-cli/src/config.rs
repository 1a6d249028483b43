//! Configuration module
//!
//! Handles CLI configuration including the orchestrator URL and poll cadence.

use std::time::Duration;

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// URL of the orchestrator service
    pub server_url: String,

    /// Fixed delay between job status polls
    pub poll_interval: Duration,
}
