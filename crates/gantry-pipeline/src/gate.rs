//! Deploy gate evaluation.
//!
//! Two predicates, checked in order after the matrix barrier:
//! 1. Branch: only pushes to the main branch are eligible. An ineligible
//!    deploy job is never created, not merely skipped.
//! 2. Matrix policy: under `BlockOnAnyFailure` (the default) any failed
//!    matrix job blocks the deploy; `DeployOnCompletion` only requires
//!    that every matrix job reached a terminal state.

use crate::build::BuildReport;
use crate::config::{DeployPolicy, PipelineConfig};
use gantry_core::Trigger;
use serde::{Deserialize, Serialize};

/// Outcome of evaluating the gate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum GateDecision {
    /// The deploy job may start.
    Cleared,

    /// The trigger's ref is not the main branch; the deploy job is
    /// never created.
    NotEligible { reason: String },

    /// Eligible, but blocked by failed matrix jobs under the current
    /// policy. One violation per failing job.
    Blocked { violations: Vec<String> },
}

impl GateDecision {
    pub fn is_cleared(&self) -> bool {
        matches!(self, GateDecision::Cleared)
    }
}

/// Gate rules for the deploy job.
pub struct DeployGate;

impl DeployGate {
    /// Evaluate the gate for a trigger against completed matrix reports.
    ///
    /// Callers must only invoke this after the matrix barrier: every
    /// report passed in is terminal.
    pub fn evaluate(
        trigger: &Trigger,
        config: &PipelineConfig,
        matrix: &[BuildReport],
    ) -> GateDecision {
        if trigger.branch() != config.main_branch {
            return GateDecision::NotEligible {
                reason: format!(
                    "ref '{}' is not the main branch '{}'",
                    trigger.git_ref, config.main_branch
                ),
            };
        }

        if config.deploy_policy == DeployPolicy::BlockOnAnyFailure {
            let violations: Vec<String> = matrix
                .iter()
                .filter(|report| !report.succeeded())
                .map(|report| format!("job '{}' failed", report.job_name))
                .collect();
            if !violations.is_empty() {
                return GateDecision::Blocked { violations };
            }
        }

        GateDecision::Cleared
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gantry_core::{BuildJobState, Toolchain};

    fn report(toolchain: Toolchain, state: BuildJobState) -> BuildReport {
        BuildReport {
            job_name: format!("build-{toolchain}"),
            toolchain,
            state,
            steps: Vec::new(),
            error: None,
        }
    }

    fn all_green() -> Vec<BuildReport> {
        vec![
            report(Toolchain::Stable, BuildJobState::Succeeded),
            report(Toolchain::Beta, BuildJobState::Succeeded),
        ]
    }

    #[test]
    fn test_non_main_ref_is_not_eligible() {
        let config = PipelineConfig::default();
        let trigger = Trigger::push("refs/heads/feature-x");

        let decision = DeployGate::evaluate(&trigger, &config, &all_green());
        assert!(matches!(decision, GateDecision::NotEligible { .. }));
    }

    #[test]
    fn test_pull_request_to_main_branch_ref_is_eligible_by_ref_only() {
        // The gate predicate is on the ref, not the event kind.
        let config = PipelineConfig::default();
        let trigger = Trigger::pull_request("refs/heads/master");

        let decision = DeployGate::evaluate(&trigger, &config, &all_green());
        assert!(decision.is_cleared());
    }

    #[test]
    fn test_main_ref_all_green_is_cleared() {
        let config = PipelineConfig::default();
        let trigger = Trigger::push("refs/heads/master");

        let decision = DeployGate::evaluate(&trigger, &config, &all_green());
        assert_eq!(decision, GateDecision::Cleared);
    }

    #[test]
    fn test_failed_job_blocks_under_default_policy() {
        let config = PipelineConfig::default();
        let trigger = Trigger::push("refs/heads/master");
        let matrix = vec![
            report(Toolchain::Stable, BuildJobState::Failed),
            report(Toolchain::Beta, BuildJobState::Succeeded),
        ];

        let decision = DeployGate::evaluate(&trigger, &config, &matrix);
        match decision {
            GateDecision::Blocked { violations } => {
                assert_eq!(violations.len(), 1);
                assert!(violations[0].contains("build-stable"));
            }
            other => panic!("expected Blocked, got {other:?}"),
        }
    }

    #[test]
    fn test_deploy_on_completion_clears_despite_failures() {
        let config = PipelineConfig {
            deploy_policy: DeployPolicy::DeployOnCompletion,
            ..PipelineConfig::default()
        };
        let trigger = Trigger::push("refs/heads/master");
        let matrix = vec![
            report(Toolchain::Stable, BuildJobState::Failed),
            report(Toolchain::Beta, BuildJobState::Succeeded),
        ];

        let decision = DeployGate::evaluate(&trigger, &config, &matrix);
        assert!(decision.is_cleared());
    }

    #[test]
    fn test_branch_predicate_wins_over_policy() {
        // Ineligibility is decided before matrix outcomes are consulted.
        let config = PipelineConfig::default();
        let trigger = Trigger::push("refs/heads/feature-x");
        let matrix = vec![report(Toolchain::Stable, BuildJobState::Failed)];

        let decision = DeployGate::evaluate(&trigger, &config, &matrix);
        assert!(matches!(decision, GateDecision::NotEligible { .. }));
    }

    #[test]
    fn test_custom_main_branch_name() {
        let config = PipelineConfig {
            main_branch: "main".to_string(),
            ..PipelineConfig::default()
        };
        let trigger = Trigger::push("refs/heads/main");

        let decision = DeployGate::evaluate(&trigger, &config, &all_green());
        assert!(decision.is_cleared());
    }
}
