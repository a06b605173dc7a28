//! In-memory fakes for step execution (testing only)
//!
//! `ScriptedExecutor` satisfies the [`StepExecutor`](crate::StepExecutor)
//! contract without touching any external tool. Outcomes are scripted per
//! step name (optionally narrowed to one job's working directory), and
//! every invocation is recorded in order so tests can assert barrier
//! ordering and cross-job independence.

use crate::step::{StepConfig, StepExecutor, StepResult};
use async_trait::async_trait;
use gantry_core::{PipelineError, Result};
use std::sync::Mutex;

/// Scripted outcome for a matching step.
#[derive(Debug, Clone)]
enum Outcome {
    Fail { exit_code: i32, stderr: String },
    Error { message: String },
}

#[derive(Debug, Clone)]
struct Rule {
    step_name: String,
    /// When set, the rule applies only if the step's cwd ends with this
    /// suffix. Jobs are isolated per directory, so the suffix selects a
    /// single job.
    dir_suffix: Option<String>,
    outcome: Outcome,
}

/// One recorded executor call.
#[derive(Debug, Clone)]
pub struct Invocation {
    /// Step name as configured.
    pub step_name: String,

    /// Full command line.
    pub command: Vec<String>,

    /// Working directory, if the step had one.
    pub dir: Option<String>,
}

/// Step executor with scripted outcomes and an invocation log.
///
/// Unscripted steps pass with exit code 0.
#[derive(Debug, Default)]
pub struct ScriptedExecutor {
    rules: Mutex<Vec<Rule>>,
    log: Mutex<Vec<Invocation>>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the named step in every job.
    pub fn fail_step(&self, step_name: &str, exit_code: i32, stderr: &str) {
        self.rules.lock().unwrap().push(Rule {
            step_name: step_name.to_string(),
            dir_suffix: None,
            outcome: Outcome::Fail {
                exit_code,
                stderr: stderr.to_string(),
            },
        });
    }

    /// Fail the named step only for the job whose cwd ends with `dir_suffix`.
    pub fn fail_step_in_dir(&self, step_name: &str, dir_suffix: &str, exit_code: i32) {
        self.rules.lock().unwrap().push(Rule {
            step_name: step_name.to_string(),
            dir_suffix: Some(dir_suffix.to_string()),
            outcome: Outcome::Fail {
                exit_code,
                stderr: format!("scripted failure for {step_name}"),
            },
        });
    }

    /// Make the named step return an executor error (spawn failure).
    pub fn error_step(&self, step_name: &str, message: &str) {
        self.rules.lock().unwrap().push(Rule {
            step_name: step_name.to_string(),
            dir_suffix: None,
            outcome: Outcome::Error {
                message: message.to_string(),
            },
        });
    }

    /// Every call made so far, in order.
    pub fn invocations(&self) -> Vec<Invocation> {
        self.log.lock().unwrap().clone()
    }

    /// Names of steps invoked in the job whose cwd ends with `dir_suffix`.
    pub fn steps_in_dir(&self, dir_suffix: &str) -> Vec<String> {
        self.invocations()
            .into_iter()
            .filter(|inv| {
                inv.dir
                    .as_deref()
                    .map(|d| d.ends_with(dir_suffix))
                    .unwrap_or(false)
            })
            .map(|inv| inv.step_name)
            .collect()
    }

    fn matching_outcome(&self, config: &StepConfig) -> Option<Outcome> {
        let cwd = config
            .cwd
            .as_ref()
            .map(|p| p.to_string_lossy().to_string());
        let rules = self.rules.lock().unwrap();
        rules
            .iter()
            .find(|rule| {
                rule.step_name == config.name
                    && match (&rule.dir_suffix, &cwd) {
                        (None, _) => true,
                        (Some(suffix), Some(dir)) => dir.ends_with(suffix.as_str()),
                        (Some(_), None) => false,
                    }
            })
            .map(|rule| rule.outcome.clone())
    }
}

#[async_trait]
impl StepExecutor for ScriptedExecutor {
    async fn execute(&self, config: &StepConfig) -> Result<StepResult> {
        self.log.lock().unwrap().push(Invocation {
            step_name: config.name.clone(),
            command: config.command.clone(),
            dir: config
                .cwd
                .as_ref()
                .map(|p| p.to_string_lossy().to_string()),
        });

        match self.matching_outcome(config) {
            Some(Outcome::Error { message }) => Err(PipelineError::Spawn(
                std::io::Error::new(std::io::ErrorKind::Other, message),
            )),
            Some(Outcome::Fail { exit_code, stderr }) => Ok(StepResult {
                step_name: config.name.clone(),
                exit_code,
                stdout: String::new(),
                stderr,
                duration_ms: 1,
                success: false,
            }),
            None => Ok(StepResult {
                step_name: config.name.clone(),
                exit_code: 0,
                stdout: String::new(),
                stderr: String::new(),
                duration_ms: 1,
                success: true,
            }),
        }
    }
}
