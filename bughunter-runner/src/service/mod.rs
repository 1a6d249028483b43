//! Service layer
//!
//! Services contain the runner's business logic. The toolchain and the fix
//! agent wrap external programs; the pipeline sequences them for one job.
//!
//! Collaborators are trait-based so the pipeline can be driven by fakes.

mod agent;
mod pipeline;
mod toolchain;

// Re-export traits
pub use agent::FixAgent;
pub use toolchain::Toolchain;

// Re-export implementations
pub use agent::{AgentOutput, BASE_PROMPT, CliFixAgent, EMPTY_AGENT_OUTPUT, build_prompt};
pub use pipeline::{
    EMPTY_REPORT_LEN, LINT_REPORT_FILE, LINT_VERIFY_FILE, LintReport, PATCH_PREVIEW,
    PipelineRunner, SILENT_TEST_FAILURE, TEST_OUTPUT_PREVIEW, preview,
};
pub use toolchain::NodeToolchain;
