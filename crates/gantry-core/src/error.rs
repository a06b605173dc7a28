//! Error types for pipeline execution
//!
//! Every failure is fatal to the job it occurs in and surfaces in that
//! job's report. There are no automatic retries anywhere in the system.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Fetch failed for ref '{git_ref}': {detail}")]
    Fetch { git_ref: String, detail: String },

    #[error("Toolchain setup failed for '{toolchain}': {detail}")]
    ToolchainSetup { toolchain: String, detail: String },

    #[error("Build failed (exit code {exit_code}): {diagnostic}")]
    Build { exit_code: i32, diagnostic: String },

    #[error("Tests failed (exit code {exit_code}): {diagnostic}")]
    Test { exit_code: i32, diagnostic: String },

    #[error("Deploy failed (exit code {exit_code}): {diagnostic}")]
    Deploy { exit_code: i32, diagnostic: String },

    #[error("Failed to spawn step process: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("Step '{step}' timed out after {secs} seconds")]
    Timeout { step: String, secs: u64 },

    #[error("Invalid job state transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Job task panicked: {0}")]
    JobPanicked(String),
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;
