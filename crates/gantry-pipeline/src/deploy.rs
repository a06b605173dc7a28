//! The deploy job.
//!
//! Runs at most once per trigger, only after the gate clears: fetch the
//! source at the ref, install the deploy CLI, invoke one remote-only
//! deploy. The credential reaches the deploy command exclusively through
//! its child environment. The deploy mutates external hosting state and
//! is not rolled back on failure.

use crate::config::PipelineConfig;
use crate::sink::EventSink;
use crate::step::{StepConfig, StepExecutor, StepResult};
use chrono::Utc;
use gantry_core::{DeployJobState, DeployToken, EventId, PipelineError, PipelineEvent, Trigger};
use std::sync::Arc;
use tracing::{info, warn};

/// Ordered step names of the deploy job.
pub const DEPLOY_STEP_NAMES: [&str; 3] = ["checkout", "install_flyctl", "flyctl_deploy"];

/// Terminal report of the deploy job.
#[derive(Debug, Clone)]
pub struct DeployReport {
    /// Terminal state (`Succeeded` or `Failed`).
    pub state: DeployJobState,

    /// Results of the steps that actually ran.
    pub steps: Vec<StepResult>,

    /// Failure diagnostic, if the job failed.
    pub error: Option<String>,
}

impl DeployReport {
    pub fn succeeded(&self) -> bool {
        self.state == DeployJobState::Succeeded
    }
}

/// The single gated deploy job.
pub struct DeployJob {
    git_ref: String,
    steps: Vec<StepConfig>,
}

impl DeployJob {
    /// Plan the deploy steps for a trigger.
    ///
    /// When a token is provided it is injected into the deploy command's
    /// environment under `config.deploy_token_env`; it never appears in
    /// the command line.
    pub fn plan(config: &PipelineConfig, trigger: &Trigger, token: Option<&DeployToken>) -> Self {
        let dir = config.workdir.join("deploy");
        let dir_str = dir.to_string_lossy().to_string();

        let mut deploy_step = StepConfig::new(
            "flyctl_deploy",
            vec![
                "flyctl".to_string(),
                "deploy".to_string(),
                "--remote-only".to_string(),
            ],
        )
        .with_cwd(dir.clone())
        .with_timeout(config.step_timeout_secs);
        if let Some(token) = token {
            deploy_step = deploy_step.with_secret_env(config.deploy_token_env.clone(), token.clone());
        }

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
                "install_flyctl",
                vec![
                    "sh".to_string(),
                    "-c".to_string(),
                    "curl -L https://fly.io/install.sh | sh".to_string(),
                ],
            )
            .with_cwd(dir)
            .with_timeout(config.step_timeout_secs),
            deploy_step,
        ];

        Self {
            git_ref: trigger.git_ref.clone(),
            steps,
        }
    }

    /// The planned steps, in execution order.
    pub fn steps(&self) -> &[StepConfig] {
        &self.steps
    }

    /// Run the deploy job to a terminal state.
    pub async fn run(
        self,
        executor: Arc<dyn StepExecutor>,
        sink: Arc<dyn EventSink>,
        run_id: &str,
    ) -> DeployReport {
        sink.record(PipelineEvent::JobQueued {
            event_id: EventId::new(),
            run_id: run_id.to_string(),
            job_name: "deploy".to_string(),
            timestamp: Utc::now(),
        });

        let mut state = DeployJobState::Pending;
        let mut results: Vec<StepResult> = Vec::new();
        let mut error: Option<String> = None;

        for step in &self.steps {
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
                job_name: "deploy".to_string(),
                step_name: step.name.clone(),
                timestamp: Utc::now(),
            });

            match executor.execute(step).await {
                Ok(result) => {
                    sink.record(PipelineEvent::StepFinished {
                        event_id: EventId::new(),
                        run_id: run_id.to_string(),
                        job_name: "deploy".to_string(),
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
                    sink.record(PipelineEvent::StepFinished {
                        event_id: EventId::new(),
                        run_id: run_id.to_string(),
                        job_name: "deploy".to_string(),
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
            // Deploying -> Succeeded
            match state.advance() {
                Ok(next) => next,
                Err(e) => {
                    error = Some(e.to_string());
                    DeployJobState::Failed
                }
            }
        } else {
            state.fail().unwrap_or(DeployJobState::Failed)
        };

        if state == DeployJobState::Succeeded {
            info!("Deploy succeeded");
        } else {
            warn!("Deploy failed; external state may be partially updated");
        }

        sink.record(PipelineEvent::DeployJobFinished {
            event_id: EventId::new(),
            run_id: run_id.to_string(),
            state,
            timestamp: Utc::now(),
        });

        DeployReport {
            state,
            steps: results,
            error,
        }
    }

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
            "install_flyctl" => PipelineError::ToolchainSetup {
                toolchain: "flyctl".to_string(),
                detail: diagnostic,
            },
            _ => PipelineError::Deploy {
                exit_code: result.exit_code,
                diagnostic,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::ScriptedExecutor;
    use crate::sink::MemoryEventSink;

    fn setup() -> (PipelineConfig, Trigger, Arc<ScriptedExecutor>, Arc<MemoryEventSink>) {
        (
            PipelineConfig::default(),
            Trigger::push("refs/heads/master"),
            Arc::new(ScriptedExecutor::new()),
            Arc::new(MemoryEventSink::new()),
        )
    }

    #[test]
    fn test_plan_orders_steps() {
        let (config, trigger, _, _) = setup();
        let job = DeployJob::plan(&config, &trigger, None);
        let names: Vec<_> = job.steps.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, DEPLOY_STEP_NAMES);
    }

    #[test]
    fn test_plan_keeps_token_out_of_argv() {
        let (config, trigger, _, _) = setup();
        let token = DeployToken::new("fly-tok-secret");
        let job = DeployJob::plan(&config, &trigger, Some(&token));

        for step in &job.steps {
            assert!(!step.command.iter().any(|arg| arg.contains("fly-tok-secret")));
        }
        let deploy = &job.steps[2];
        let (var, _) = deploy.secret_env.as_ref().expect("secret env");
        assert_eq!(var, "FLY_API_TOKEN");
    }

    #[tokio::test]
    async fn test_deploy_success_path() {
        let (config, trigger, exec, sink) = setup();
        let job = DeployJob::plan(&config, &trigger, None);

        let report = job.run(exec, sink, "run-1").await;
        assert_eq!(report.state, DeployJobState::Succeeded);
        assert_eq!(report.steps.len(), 3);
    }

    #[tokio::test]
    async fn test_deploy_command_failure_fails_job() {
        let (config, trigger, exec, sink) = setup();
        exec.fail_step("flyctl_deploy", 1, "release failed");
        let job = DeployJob::plan(&config, &trigger, None);

        let report = job.run(exec, sink, "run-1").await;
        assert_eq!(report.state, DeployJobState::Failed);
        assert!(report.error.as_deref().unwrap_or("").contains("Deploy failed"));
    }

    #[tokio::test]
    async fn test_install_failure_skips_deploy_command() {
        let (config, trigger, exec, sink) = setup();
        exec.fail_step("install_flyctl", 127, "curl: not found");
        let job = DeployJob::plan(&config, &trigger, None);

        let report = job.run(exec.clone(), sink, "run-1").await;
        assert_eq!(report.state, DeployJobState::Failed);
        assert!(!exec
            .invocations()
            .iter()
            .any(|i| i.step_name == "flyctl_deploy"));
    }
}
