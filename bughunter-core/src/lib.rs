//! Bughunter Core
//!
//! Core types and abstractions for the Bughunter remediation pipeline.
//!
//! This crate contains:
//! - Domain types: the Job record and its lifecycle states
//! - DTOs: request shapes exchanged between the API and its callers
//! - Store: the process-wide job registry shared by API handlers and runners

pub mod domain;
pub mod dto;
pub mod store;
