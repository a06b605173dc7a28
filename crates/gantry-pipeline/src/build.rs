//! Build-matrix jobs.
//!
//! One job per toolchain channel, each in its own checkout directory.
//! Steps run strictly in order (fetch, toolchain setup, build, test) and
//! the first failure skips the rest of that job. Jobs are independent:
//! the matrix never cancels a sibling because another job failed.

use crate::config::PipelineConfig;
use crate::sink::EventSink;
use crate::step::{StepConfig, StepExecutor, StepResult};
use chrono::Utc;
use futures::future::join_all;
use gantry_core::{BuildJobState, EventId, PipelineError, PipelineEvent, Toolchain, Trigger};
use std::sync::Arc;
use tracing::{info, warn};

/// Ordered step names of one matrix job.
pub const STEP_NAMES: [&str; 4] = ["checkout", "rustup_toolchain", "cargo_build", "cargo_test"];

/// Terminal report of one matrix job.
#[derive(Debug, Clone)]
pub struct BuildReport {
    /// Job name, e.g. `"build-stable"`.
    pub job_name: String,

    /// Toolchain this job built against.
    pub toolchain: Toolchain,

    /// Terminal state (`Succeeded` or `Failed`).
    pub state: BuildJobState,

    /// Results of the steps that actually ran.
    pub steps: Vec<StepResult>,

    /// Failure diagnostic, if the job failed.
    pub error: Option<String>,
}

impl BuildReport {
    pub fn succeeded(&self) -> bool {
        self.state == BuildJobState::Succeeded
    }
}

/// One isolated build+test job, parameterized by toolchain.
pub struct BuildJob {
    job_name: String,
    toolchain: Toolchain,
    git_ref: String,
    steps: Vec<StepConfig>,
}

impl BuildJob {
    /// Plan the job's steps for a trigger and toolchain.
    pub fn plan(config: &PipelineConfig, trigger: &Trigger, toolchain: Toolchain) -> Self {
        let job_name = format!("build-{toolchain}");
        let dir = config.workdir.join(&job_name);
        let dir_str = dir.to_string_lossy().to_string();
        let plus_channel = format!("+{}", toolchain.name());

        let steps = vec![
            StepConfig::new(
                "checkout",
                vec![
                    "git".to_string(),
                    "clone".to_string(),
                    "--branch".to_string(),
                    trigger.branch().to_string(),
                    config.repo_url.clone(),
                    dir_str,
                ],
            )
            .with_timeout(config.step_timeout_secs),
            StepConfig::new(
                "rustup_toolchain",
                vec![
                    "rustup".to_string(),
                    "toolchain".to_string(),
                    "install".to_string(),
                    toolchain.name().to_string(),
                ],
            )
            .with_cwd(dir.clone())
            .with_timeout(config.step_timeout_secs),
            StepConfig::new(
                "cargo_build",
                vec![
                    "cargo".to_string(),
                    plus_channel.clone(),
                    "build".to_string(),
                    "--verbose".to_string(),
                ],
            )
            .with_cwd(dir.clone())
            .with_timeout(config.step_timeout_secs),
            StepConfig::new(
                "cargo_test",
                vec![
                    "cargo".to_string(),
                    plus_channel,
                    "test".to_string(),
                    "--verbose".to_string(),
                ],
            )
            .with_cwd(dir)
            .with_timeout(config.step_timeout_secs),
        ];

        Self {
            job_name,
            toolchain,
            git_ref: trigger.git_ref.clone(),
            steps,
        }
    }

    /// Job name, e.g. `"build-stable"`.
    pub fn job_name(&self) -> &str {
        &self.job_name
    }

    /// The planned steps, in execution order.
    pub fn steps(&self) -> &[StepConfig] {
        &self.steps
    }

    /// Run the job to a terminal state, recording events along the way.
    pub async fn run(
        self,
        executor: Arc<dyn StepExecutor>,
        sink: Arc<dyn EventSink>,
        run_id: &str,
    ) -> BuildReport {
        sink.record(PipelineEvent::JobQueued {
            event_id: EventId::new(),
            run_id: run_id.to_string(),
            job_name: self.job_name.clone(),
            timestamp: Utc::now(),
        });

        let mut state = BuildJobState::Pending;
        let mut results: Vec<StepResult> = Vec::new();
        let mut error: Option<String> = None;

        for step in &self.steps {
            // On-path transition into the state this step represents.
            state = match state.advance() {
                Ok(next) => next,
                Err(e) => {
                    error = Some(e.to_string());
                    break;
                }
            };

            sink.record(PipelineEvent::StepStarted {
                event_id: EventId::new(),
                run_id: run_id.to_string(),
                job_name: self.job_name.clone(),
                step_name: step.name.clone(),
                timestamp: Utc::now(),
            });

            match executor.execute(step).await {
                Ok(result) => {
                    sink.record(PipelineEvent::StepFinished {
                        event_id: EventId::new(),
                        run_id: run_id.to_string(),
                        job_name: self.job_name.clone(),
                        step_name: step.name.clone(),
                        passed: result.passed(),
                        exit_code: result.exit_code,
                        duration_ms: result.duration_ms,
                        timestamp: Utc::now(),
                    });

                    let passed = result.passed();
                    if !passed {
                        error = Some(self.classify_failure(&result).to_string());
                    }
                    results.push(result);
                    if !passed {
                        break;
                    }
                }
                Err(e) => {
                    // Spawn failure or timeout: the step never produced
                    // an exit status.
                    sink.record(PipelineEvent::StepFinished {
                        event_id: EventId::new(),
                        run_id: run_id.to_string(),
                        job_name: self.job_name.clone(),
                        step_name: step.name.clone(),
                        passed: false,
                        exit_code: -1,
                        duration_ms: 0,
                        timestamp: Utc::now(),
                    });
                    error = Some(e.to_string());
                    break;
                }
            }
        }

        state = if error.is_none() {
            // Testing -> Succeeded
            match state.advance() {
                Ok(next) => next,
                Err(e) => {
                    error = Some(e.to_string());
                    BuildJobState::Failed
                }
            }
        } else {
            state.fail().unwrap_or(BuildJobState::Failed)
        };

        if state == BuildJobState::Succeeded {
            info!(job = %self.job_name, toolchain = %self.toolchain, "Build job succeeded");
        } else {
            warn!(job = %self.job_name, toolchain = %self.toolchain, "Build job failed");
        }

        sink.record(PipelineEvent::BuildJobFinished {
            event_id: EventId::new(),
            run_id: run_id.to_string(),
            job_name: self.job_name.clone(),
            state,
            timestamp: Utc::now(),
        });

        BuildReport {
            job_name: self.job_name,
            toolchain: self.toolchain,
            state,
            steps: results,
            error,
        }
    }

    /// Map a failed step to the pipeline error taxonomy.
    fn classify_failure(&self, result: &StepResult) -> PipelineError {
        let diagnostic = if result.stderr.is_empty() {
            result.stdout.clone()
        } else {
            result.stderr.clone()
        };
        match result.step_name.as_str() {
            "checkout" => PipelineError::Fetch {
                git_ref: self.git_ref.clone(),
                detail: diagnostic,
            },
            "rustup_toolchain" => PipelineError::ToolchainSetup {
                toolchain: self.toolchain.name().to_string(),
                detail: diagnostic,
            },
            "cargo_build" => PipelineError::Build {
                exit_code: result.exit_code,
                diagnostic,
            },
            _ => PipelineError::Test {
                exit_code: result.exit_code,
                diagnostic,
            },
        }
    }
}

/// Expands the toolchain axis into concurrent jobs and waits for all of
/// them to reach a terminal state.
pub struct BuildMatrix;

impl BuildMatrix {
    /// Run every matrix job to completion.
    ///
    /// Jobs run on their own tasks with no mutual ordering guarantee;
    /// failure of one never cancels another. The returned reports are in
    /// axis order, and every report is terminal: this is the
    /// synchronization barrier the deploy gate relies on.
    pub async fn run(
        config: &PipelineConfig,
        trigger: &Trigger,
        executor: Arc<dyn StepExecutor>,
        sink: Arc<dyn EventSink>,
        run_id: &str,
    ) -> Vec<BuildReport> {
        let tasks: Vec<_> = config
            .toolchains
            .iter()
            .map(|&toolchain| {
                let job = BuildJob::plan(config, trigger, toolchain);
                let executor = Arc::clone(&executor);
                let sink = Arc::clone(&sink);
                let run_id = run_id.to_string();
                tokio::spawn(async move { job.run(executor, sink, &run_id).await })
            })
            .collect();

        let joined = join_all(tasks).await;

        joined
            .into_iter()
            .zip(config.toolchains.iter())
            .map(|(outcome, &toolchain)| match outcome {
                Ok(report) => report,
                Err(e) => {
                    warn!(toolchain = %toolchain, "Build job task panicked");
                    BuildReport {
                        job_name: format!("build-{toolchain}"),
                        toolchain,
                        state: BuildJobState::Failed,
                        steps: Vec::new(),
                        error: Some(PipelineError::JobPanicked(e.to_string()).to_string()),
                    }
                }
            })
            .collect()
    }
}
