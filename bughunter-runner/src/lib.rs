//! Bughunter Runner
//!
//! Drives one remediation job from clone to verified patch.
//!
//! Architecture:
//! - Configuration: workspace location, timeouts and agent settings from environment
//! - Process: runs external commands, exit codes are data, launch failures and timeouts are faults
//! - Services: toolchain collaborators (git, npm, eslint, tests), the fix agent adapter,
//!   and the pipeline that sequences them
//! - Context: per-job handle that writes log lines and status changes into the job store
//!
//! The runner never returns an error to its caller. Every stage fault is folded into the
//! job's log and status.

pub mod config;
pub mod context;
pub mod error;
pub mod process;
pub mod service;

pub use config::Config;
pub use context::JobContext;
pub use error::{AgentError, ExecError, StageError};
pub use process::{CommandExecutor, CommandSpec, StageResult, TokioExecutor};
pub use service::{
    AgentOutput, CliFixAgent, FixAgent, NodeToolchain, PipelineRunner, Toolchain,
};
