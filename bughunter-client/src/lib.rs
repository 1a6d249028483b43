//! Bughunter HTTP Client
//!
//! A small, type-safe client for the Bughunter orchestrator API, used by the
//! CLI to submit jobs and poll them to completion.
//!
//! # Example
//!
//! ```no_run
//! use bughunter_client::BughunterClient;
//! use std::time::Duration;
//!
//! # async fn example() -> bughunter_client::Result<()> {
//! let client = BughunterClient::new("http://localhost:8080");
//!
//! let job = client.start_job("https://github.com/acme/widgets.git").await?;
//! let finished = client
//!     .wait_for_job(job.id, Duration::from_secs(1), |job| println!("{}", job.status))
//!     .await?;
//!
//! println!("Job {} ended {}", finished.id, finished.status);
//! # Ok(())
//! # }
//! ```

pub mod error;
mod jobs;

// Re-export commonly used types
pub use error::{ClientError, Result};

use reqwest::Client;
use serde::de::DeserializeOwned;

/// HTTP client for the Bughunter orchestrator API
#[derive(Debug, Clone)]
pub struct BughunterClient {
    /// Base URL of the orchestrator (e.g., "http://localhost:8080")
    base_url: String,
    /// HTTP client instance
    client: Client,
}

impl BughunterClient {
    /// Create a new client
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the orchestrator API (e.g., "http://localhost:8080")
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a new client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Get the base URL of the orchestrator
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Handle an API response and deserialize JSON
    ///
    /// Non-success responses become `ClientError::ApiError`, carrying the
    /// server's `error` message when the body has one.
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(
                status.as_u16(),
                error_message(&error_text),
            ));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }
}

/// Pulls `error` out of a `{"error": "..."}` body, falling back to the raw text
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = BughunterClient::new("http://localhost:8080/");
        assert_eq!(client.base_url(), "http://localhost:8080");
    }

    #[test]
    fn test_client_with_custom_client() {
        let client = BughunterClient::with_client("http://localhost:8080", Client::new());
        assert_eq!(client.base_url(), "http://localhost:8080");
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(error_message(r#"{"error":"Job x not found"}"#), "Job x not found");
        assert_eq!(error_message("Bad Gateway"), "Bad Gateway");
    }
}
