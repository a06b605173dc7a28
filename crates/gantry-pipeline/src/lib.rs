//! Gantry Pipeline - build/test/deploy orchestration
//!
//! Executes one pipeline run per trigger:
//! - Expands the toolchain axis into concurrent, isolated build jobs
//!   (failure of one never cancels another)
//! - Waits at a barrier for every matrix job to reach a terminal state
//! - Evaluates the deploy gate (branch predicate + matrix policy)
//! - Runs the single deploy job when the gate clears
//!
//! External tools (git, rustup, cargo, flyctl) are reached only through
//! the [`StepExecutor`] trait; `fakes::ScriptedExecutor` stands in for
//! them in tests.

pub mod build;
pub mod config;
pub mod deploy;
pub mod fakes;
pub mod gate;
pub mod pipeline;
pub mod sink;
pub mod step;
pub mod telemetry;

// Re-export key types
pub use build::{BuildJob, BuildMatrix, BuildReport};
pub use config::{DeployPolicy, PipelineConfig};
pub use deploy::{DeployJob, DeployReport};
pub use gate::{DeployGate, GateDecision};
pub use pipeline::{DeployOutcome, Pipeline, PipelineReport};
pub use sink::{EventSink, MemoryEventSink, TracingEventSink};
pub use step::{ProcessExecutor, StepConfig, StepExecutor, StepResult};
