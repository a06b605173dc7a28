//! Pipeline configuration.

use gantry_core::{PipelineSpec, Toolchain};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Whether a failed matrix job blocks the deploy.
///
/// `BlockOnAnyFailure` is the default: the deploy waits for the matrix
/// to complete and only runs when every job succeeded.
/// `DeployOnCompletion` runs the deploy once all matrix jobs are
/// terminal, regardless of their outcome.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeployPolicy {
    #[default]
    BlockOnAnyFailure,
    DeployOnCompletion,
}

/// Configuration for one pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Branch whose pushes are eligible for deploy.
    pub main_branch: String,

    /// Toolchain channels the matrix expands over.
    pub toolchains: Vec<Toolchain>,

    /// Repository URL passed to the fetch step.
    pub repo_url: String,

    /// Directory jobs check out into. Each job gets its own
    /// subdirectory; jobs share no filesystem state.
    pub workdir: PathBuf,

    /// Deploy gating policy for failed matrix jobs.
    pub deploy_policy: DeployPolicy,

    /// Per-step timeout in seconds. 0 means no timeout.
    pub step_timeout_secs: u64,

    /// Environment variable the deploy credential is read from and
    /// injected as.
    pub deploy_token_env: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            main_branch: "master".to_string(),
            toolchains: Toolchain::default_axis(),
            repo_url: ".".to_string(),
            workdir: PathBuf::from(".gantry/work"),
            deploy_policy: DeployPolicy::default(),
            step_timeout_secs: 0,
            deploy_token_env: "FLY_API_TOKEN".to_string(),
        }
    }
}

impl PipelineConfig {
    /// The identity spec for this configuration.
    pub fn spec(&self) -> PipelineSpec {
        PipelineSpec::new(
            self.main_branch.clone(),
            self.toolchains.clone(),
            crate::build::STEP_NAMES.iter().map(|s| s.to_string()).collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_original_workflow() {
        let config = PipelineConfig::default();
        assert_eq!(config.main_branch, "master");
        assert_eq!(config.toolchains, vec![Toolchain::Stable, Toolchain::Beta]);
        assert_eq!(config.deploy_policy, DeployPolicy::BlockOnAnyFailure);
        assert_eq!(config.deploy_token_env, "FLY_API_TOKEN");
    }

    #[test]
    fn test_config_serialization_round_trip() {
        let config = PipelineConfig::default();
        let json = serde_json::to_string(&config).expect("should serialize");
        let back: PipelineConfig = serde_json::from_str(&json).expect("should deserialize");
        assert_eq!(back.main_branch, config.main_branch);
        assert_eq!(back.deploy_policy, config.deploy_policy);
    }

    #[test]
    fn test_identical_configs_share_a_spec_digest() {
        let a = PipelineConfig::default().spec().digest();
        let b = PipelineConfig::default().spec().digest();
        assert_eq!(a, b);
    }
}
