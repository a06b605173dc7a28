//! Gantry Core - pipeline domain model
//!
//! Defines the vocabulary shared by every Gantry component:
//! - Trigger: the push/pull-request event that starts a pipeline run
//! - Toolchain: the build matrix axis (stable, beta)
//! - BuildJobState / DeployJobState: per-job state machines
//! - PipelineEvent: append-only provenance stream for a run
//! - DeployToken: the deploy credential, redacted everywhere
//! - PipelineSpec: deterministic identity (SHA-256) of a pipeline configuration

pub mod error;
pub mod event;
pub mod job;
pub mod secret;
pub mod spec;
pub mod toolchain;
pub mod trigger;

// Re-export key types
pub use error::{PipelineError, Result};
pub use event::{EventId, PipelineEvent};
pub use job::{BuildJobState, DeployJobState};
pub use secret::DeployToken;
pub use spec::PipelineSpec;
pub use toolchain::Toolchain;
pub use trigger::{Trigger, TriggerEvent};

/// Gantry domain model version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
