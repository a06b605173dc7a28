//! Pipeline specification and identity.
//!
//! A `PipelineSpec` captures everything that determines a run's shape:
//! the main branch, the toolchain axis, and the ordered step names. Its
//! digest is deterministic, so identical configuration yields identical
//! run identity across invocations.

use crate::toolchain::Toolchain;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Identity of a pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PipelineSpec {
    /// Branch that gates the deploy job.
    pub main_branch: String,

    /// Toolchain channels the matrix expands over.
    pub toolchains: Vec<Toolchain>,

    /// Ordered step names of one matrix job.
    pub step_names: Vec<String>,
}

impl PipelineSpec {
    pub fn new(main_branch: String, toolchains: Vec<Toolchain>, step_names: Vec<String>) -> Self {
        Self {
            main_branch,
            toolchains,
            step_names,
        }
    }

    /// SHA-256 digest over the ordered fields (order-sensitive).
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.main_branch.as_bytes());
        hasher.update(b"\0");
        for tc in &self.toolchains {
            hasher.update(tc.name().as_bytes());
            hasher.update(b"\0");
        }
        for step in &self.step_names {
            hasher.update(step.as_bytes());
            hasher.update(b"\0");
        }
        hex::encode(hasher.finalize())
    }

    /// Short digest (first 12 chars).
    pub fn short_digest(&self) -> String {
        let digest = self.digest();
        digest[..12.min(digest.len())].to_string()
    }
}
