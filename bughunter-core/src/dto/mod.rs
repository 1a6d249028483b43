//! Data Transfer Objects
//!
//! Request shapes exchanged between the Job API and its callers
//! (the CLI, the web front end).

pub mod job;
