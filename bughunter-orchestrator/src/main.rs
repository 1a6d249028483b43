//! Bughunter Orchestrator
//!
//! HTTP front door for remediation jobs. Accepts a repository URL, records a
//! job in the in-memory store and runs its pipeline in the background. Callers
//! poll the job until it reaches a terminal state.

use anyhow::{Context, Result};
use bughunter_core::store::{InMemoryJobStore, JobStore};
use bughunter_runner::{CliFixAgent, NodeToolchain, PipelineRunner, TokioExecutor};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod api;
pub mod config;
pub mod service;

#[cfg(test)]
mod testing;

use crate::config::Config;
use crate::service::JobService;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "bughunter_orchestrator=debug,bughunter_runner=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Bughunter Orchestrator...");

    let config = Config::from_env();
    config.validate()?;
    tracing::info!(
        "Workspace base: {}, test timeout: {:?}, agent: {}",
        config.runner.workspace_base.display(),
        config.runner.test_timeout,
        config.runner.agent_bin
    );

    let store: Arc<dyn JobStore> = Arc::new(InMemoryJobStore::new());
    let executor = Arc::new(TokioExecutor::new());
    let agent = CliFixAgent::new(
        executor.clone(),
        config.runner.agent_bin.clone(),
        config.runner.prompt_file.clone(),
        config.runner.agent_timeout,
    );
    let runner = PipelineRunner::new(
        Arc::clone(&store),
        Arc::new(NodeToolchain::new(executor)),
        Arc::new(agent),
        config.runner.clone(),
    );
    let service = Arc::new(JobService::new(store, Arc::new(runner)));

    // Build router with all API endpoints
    let app = api::create_router(service);

    tracing::info!("Listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down...");
}
