//! Step execution.
//!
//! A step is one external tool invocation. The [`StepExecutor`] trait is
//! the seam between orchestration and the outside world: the real
//! [`ProcessExecutor`] spawns processes, while tests script outcomes via
//! [`crate::fakes::ScriptedExecutor`].

use async_trait::async_trait;
use gantry_core::{DeployToken, PipelineError, Result};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Instant;
use tokio::process::Command;
use tracing::debug;

/// Configuration for one step.
///
/// The deploy credential travels only through `secret_env`: it is added
/// to the child's environment at spawn time and is never part of the
/// command line.
#[derive(Debug, Clone)]
pub struct StepConfig {
    /// Step name, e.g. `"cargo_build"`.
    pub name: String,

    /// Command to execute (first element is the executable).
    pub command: Vec<String>,

    /// Plain environment variables for the child.
    pub env: Vec<(String, String)>,

    /// Credential injected as `(var_name, token)`, if any.
    pub secret_env: Option<(String, DeployToken)>,

    /// Working directory for the child, if any.
    pub cwd: Option<PathBuf>,

    /// Timeout in seconds. 0 means no timeout.
    pub timeout_secs: u64,
}

impl StepConfig {
    /// Create a step with no environment, cwd, or timeout.
    pub fn new(name: impl Into<String>, command: Vec<String>) -> Self {
        Self {
            name: name.into(),
            command,
            env: Vec::new(),
            secret_env: None,
            cwd: None,
            timeout_secs: 0,
        }
    }

    /// Set the working directory.
    pub fn with_cwd(mut self, cwd: PathBuf) -> Self {
        self.cwd = Some(cwd);
        self
    }

    /// Set the timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Inject a credential into the child environment.
    pub fn with_secret_env(mut self, var: impl Into<String>, token: DeployToken) -> Self {
        self.secret_env = Some((var.into(), token));
        self
    }
}

/// Result of a step execution.
#[derive(Debug, Clone)]
pub struct StepResult {
    /// Step name.
    pub step_name: String,

    /// Exit code (0 = success).
    pub exit_code: i32,

    /// Captured stdout.
    pub stdout: String,

    /// Captured stderr.
    pub stderr: String,

    /// Duration in milliseconds.
    pub duration_ms: u64,

    /// Whether execution succeeded.
    pub success: bool,
}

impl StepResult {
    /// Whether this step passed (exit code 0).
    pub fn passed(&self) -> bool {
        self.success && self.exit_code == 0
    }
}

/// Executes steps against the outside world.
#[async_trait]
pub trait StepExecutor: Send + Sync {
    /// Run one step to completion and return its result.
    async fn execute(&self, config: &StepConfig) -> Result<StepResult>;
}

/// Real executor backed by `tokio::process`.
pub struct ProcessExecutor;

#[async_trait]
impl StepExecutor for ProcessExecutor {
    async fn execute(&self, config: &StepConfig) -> Result<StepResult> {
        let start = Instant::now();

        if config.command.is_empty() {
            return Err(PipelineError::Spawn(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("step {} has empty command", config.name),
            )));
        }

        let exe = &config.command[0];
        let args = &config.command[1..];

        debug!(step = %config.name, exe = %exe, "Spawning step process");

        let mut cmd = Command::new(exe);
        cmd.args(args).stdout(Stdio::piped()).stderr(Stdio::piped());

        if let Some(cwd) = &config.cwd {
            cmd.current_dir(cwd);
        }
        for (key, value) in &config.env {
            cmd.env(key, value);
        }
        if let Some((var, token)) = &config.secret_env {
            cmd.env(var, token.expose());
        }

        let child = cmd.spawn()?;

        let output = if config.timeout_secs > 0 {
            tokio::time::timeout(
                std::time::Duration::from_secs(config.timeout_secs),
                child.wait_with_output(),
            )
            .await
            .map_err(|_| PipelineError::Timeout {
                step: config.name.clone(),
                secs: config.timeout_secs,
            })??
        } else {
            child.wait_with_output().await?
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        let exit_code = output.status.code().unwrap_or(-1);

        Ok(StepResult {
            step_name: config.name.clone(),
            exit_code,
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            duration_ms,
            success: output.status.success(),
        })
    }
}
