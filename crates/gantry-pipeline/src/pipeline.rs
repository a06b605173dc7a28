//! Pipeline orchestration.
//!
//! One run per trigger: expand the matrix, wait at the barrier, evaluate
//! the gate, then run the deploy job if and only if the gate cleared.
//! Exactly one deploy job can exist per trigger, and it never starts
//! before every matrix job is terminal.

use crate::build::{BuildMatrix, BuildReport};
use crate::config::PipelineConfig;
use crate::deploy::{DeployJob, DeployReport};
use crate::gate::{DeployGate, GateDecision};
use crate::sink::{EventSink, MemoryEventSink};
use crate::step::StepExecutor;
use chrono::Utc;
use gantry_core::{DeployToken, EventId, PipelineEvent, Trigger};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;
use uuid::Uuid;

/// How the deploy stage ended for this run.
#[derive(Debug, Clone)]
pub enum DeployOutcome {
    /// Ref was not the main branch; the deploy job was never created.
    NotEligible { reason: String },

    /// Eligible but blocked by failed matrix jobs under the policy.
    Blocked { violations: Vec<String> },

    /// The deploy job ran to a terminal state.
    Ran(DeployReport),
}

impl DeployOutcome {
    /// Whether the deploy stage counts against overall success.
    ///
    /// `NotEligible` leaves the overall result to the matrix alone.
    fn overall_ok(&self) -> bool {
        match self {
            DeployOutcome::NotEligible { .. } => true,
            DeployOutcome::Blocked { .. } => false,
            DeployOutcome::Ran(report) => report.succeeded(),
        }
    }
}

/// Result of a complete pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    /// Run ID for this invocation.
    pub run_id: String,

    /// Digest of the pipeline configuration that ran.
    pub spec_digest: String,

    /// The trigger that started the run.
    pub trigger: Trigger,

    /// Terminal reports of every matrix job, in axis order.
    pub builds: Vec<BuildReport>,

    /// Terminal outcome of the deploy stage.
    pub deploy: DeployOutcome,

    /// Overall result: all required jobs succeeded.
    pub success: bool,

    /// Total duration in milliseconds.
    pub duration_ms: u64,
}

impl PipelineReport {
    /// Number of matrix jobs that succeeded.
    pub fn builds_passed(&self) -> usize {
        self.builds.iter().filter(|b| b.succeeded()).count()
    }

    /// Number of matrix jobs that failed.
    pub fn builds_failed(&self) -> usize {
        self.builds.len() - self.builds_passed()
    }
}

/// Pipeline orchestrator.
pub struct Pipeline {
    config: PipelineConfig,
    executor: Arc<dyn StepExecutor>,
    sink: Arc<dyn EventSink>,
}

impl Pipeline {
    /// Create a pipeline with an in-memory event sink.
    pub fn new(config: PipelineConfig, executor: Arc<dyn StepExecutor>) -> Self {
        Self {
            config,
            executor,
            sink: Arc::new(MemoryEventSink::new()),
        }
    }

    /// Replace the event sink.
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Execute one run for a trigger.
    ///
    /// Failures surface in the returned report; nothing is retried and
    /// nothing is swallowed.
    pub async fn run(&self, trigger: &Trigger, token: Option<&DeployToken>) -> PipelineReport {
        let start = Instant::now();
        let run_id = Uuid::new_v4().to_string();
        let spec_digest = self.config.spec().digest();

        self.sink.record(PipelineEvent::PipelineStarted {
            event_id: EventId::new(),
            run_id: run_id.clone(),
            git_ref: trigger.git_ref.clone(),
            spec_digest: spec_digest.clone(),
            timestamp: Utc::now(),
        });

        info!(run_id = %run_id, git_ref = %trigger.git_ref, "Starting pipeline");

        // Matrix stage: concurrent jobs, barrier on all-terminal.
        let builds = BuildMatrix::run(
            &self.config,
            trigger,
            Arc::clone(&self.executor),
            Arc::clone(&self.sink),
            &run_id,
        )
        .await;

        // Gate, then at most one deploy job.
        let deploy = match DeployGate::evaluate(trigger, &self.config, &builds) {
            GateDecision::Cleared => {
                let job = DeployJob::plan(&self.config, trigger, token);
                let report = job
                    .run(Arc::clone(&self.executor), Arc::clone(&self.sink), &run_id)
                    .await;
                DeployOutcome::Ran(report)
            }
            GateDecision::NotEligible { reason } => {
                self.sink.record(PipelineEvent::DeploySkipped {
                    event_id: EventId::new(),
                    run_id: run_id.clone(),
                    reason: reason.clone(),
                    timestamp: Utc::now(),
                });
                DeployOutcome::NotEligible { reason }
            }
            GateDecision::Blocked { violations } => {
                self.sink.record(PipelineEvent::DeploySkipped {
                    event_id: EventId::new(),
                    run_id: run_id.clone(),
                    reason: format!("blocked by {} failed matrix job(s)", violations.len()),
                    timestamp: Utc::now(),
                });
                DeployOutcome::Blocked { violations }
            }
        };

        let success = builds.iter().all(|b| b.succeeded()) && deploy.overall_ok();
        let duration_ms = start.elapsed().as_millis() as u64;

        self.sink.record(PipelineEvent::PipelineFinished {
            event_id: EventId::new(),
            run_id: run_id.clone(),
            success,
            duration_ms,
            timestamp: Utc::now(),
        });

        info!(run_id = %run_id, success = success, "Pipeline finished");

        PipelineReport {
            run_id,
            spec_digest,
            trigger: trigger.clone(),
            builds,
            deploy,
            success,
            duration_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::ScriptedExecutor;
    use gantry_core::BuildJobState;

    fn pipeline_with(exec: Arc<ScriptedExecutor>) -> Pipeline {
        Pipeline::new(PipelineConfig::default(), exec)
    }

    #[tokio::test]
    async fn test_overall_success_requires_all_jobs() {
        let exec = Arc::new(ScriptedExecutor::new());
        let pipeline = pipeline_with(exec.clone());

        let report = pipeline
            .run(&Trigger::push("refs/heads/master"), None)
            .await;
        assert!(report.success);
        assert_eq!(report.builds_passed(), 2);
        assert!(matches!(report.deploy, DeployOutcome::Ran(_)));
    }

    #[tokio::test]
    async fn test_deploy_failure_fails_overall() {
        let exec = Arc::new(ScriptedExecutor::new());
        exec.fail_step("flyctl_deploy", 1, "release failed");
        let pipeline = pipeline_with(exec);

        let report = pipeline
            .run(&Trigger::push("refs/heads/master"), None)
            .await;
        assert!(!report.success);
        assert_eq!(report.builds_passed(), 2);
    }

    #[tokio::test]
    async fn test_feature_branch_outcome_is_matrix_only() {
        let exec = Arc::new(ScriptedExecutor::new());
        let pipeline = pipeline_with(exec);

        let report = pipeline
            .run(&Trigger::push("refs/heads/feature-x"), None)
            .await;
        assert!(report.success);
        assert!(matches!(report.deploy, DeployOutcome::NotEligible { .. }));
    }

    #[tokio::test]
    async fn test_blocked_deploy_counts_as_failure() {
        let exec = Arc::new(ScriptedExecutor::new());
        exec.fail_step_in_dir("cargo_test", "build-stable", 101);
        let pipeline = pipeline_with(exec);

        let report = pipeline
            .run(&Trigger::push("refs/heads/master"), None)
            .await;
        assert!(!report.success);
        assert_eq!(report.builds[0].state, BuildJobState::Failed);
        assert_eq!(report.builds[1].state, BuildJobState::Succeeded);
        assert!(matches!(report.deploy, DeployOutcome::Blocked { .. }));
    }
}
