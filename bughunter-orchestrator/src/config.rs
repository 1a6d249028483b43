//! Orchestrator configuration

use bughunter_runner::Config as RunnerConfig;

/// Default listen address
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP API listens on
    pub bind_addr: String,

    /// Settings handed to every pipeline run
    pub runner: RunnerConfig,
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// - BUGHUNTER_BIND_ADDR (default: 0.0.0.0:8080)
    /// - everything `bughunter_runner::Config::from_env` reads
    pub fn from_env() -> Self {
        let bind_addr = std::env::var("BUGHUNTER_BIND_ADDR")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());

        Self {
            bind_addr,
            runner: RunnerConfig::from_env(),
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.bind_addr.trim().is_empty() {
            anyhow::bail!("bind_addr cannot be empty");
        }
        self.runner.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_blank_bind_addr() {
        let config = Config {
            bind_addr: " ".to_string(),
            runner: RunnerConfig::default(),
        };
        assert!(config.validate().is_err());

        let config = Config {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            runner: RunnerConfig::default(),
        };
        assert!(config.validate().is_ok());
    }
}
