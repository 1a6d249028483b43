//! Core domain types
//!
//! This module contains the core domain structures used across Bughunter services.
//! They are shared between the orchestrator (which owns the registry), the runner
//! (which mutates jobs) and the client (which reads snapshots).

pub mod job;
