//! Service Module
//!
//! Business logic layer for the orchestrator.

pub mod job;

// Re-export for convenience
pub use job as job_service;
pub use job::JobService;
