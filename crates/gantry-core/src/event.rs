//! Pipeline lifecycle events for append-only provenance
//!
//! Events form the ground truth for a run. Step stdout/stderr never
//! appear here: events are safe to log and serialize, so they carry
//! only names, states, exit codes, and durations.

use crate::job::{BuildJobState, DeployJobState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A unique event ID (UUID)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub Uuid);

impl EventId {
    pub fn new() -> Self {
        EventId(Uuid::new_v4())
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

/// Pipeline lifecycle events - fully ordered, append-only stream
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// A pipeline run has started for a trigger
    PipelineStarted {
        event_id: EventId,
        run_id: String,
        git_ref: String,
        spec_digest: String,
        timestamp: DateTime<Utc>,
    },

    /// A job has been queued (matrix or deploy)
    JobQueued {
        event_id: EventId,
        run_id: String,
        job_name: String,
        timestamp: DateTime<Utc>,
    },

    /// A step has begun execution
    StepStarted {
        event_id: EventId,
        run_id: String,
        job_name: String,
        step_name: String,
        timestamp: DateTime<Utc>,
    },

    /// A step has finished (passed or failed)
    StepFinished {
        event_id: EventId,
        run_id: String,
        job_name: String,
        step_name: String,
        passed: bool,
        exit_code: i32,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// A build-matrix job has reached a terminal state
    BuildJobFinished {
        event_id: EventId,
        run_id: String,
        job_name: String,
        state: BuildJobState,
        timestamp: DateTime<Utc>,
    },

    /// The deploy job has reached a terminal state
    DeployJobFinished {
        event_id: EventId,
        run_id: String,
        state: DeployJobState,
        timestamp: DateTime<Utc>,
    },

    /// The deploy was never started (gate predicate false or blocked)
    DeploySkipped {
        event_id: EventId,
        run_id: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// The run has finished
    PipelineFinished {
        event_id: EventId,
        run_id: String,
        success: bool,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
}

impl PipelineEvent {
    /// The run this event belongs to.
    pub fn run_id(&self) -> &str {
        match self {
            PipelineEvent::PipelineStarted { run_id, .. }
            | PipelineEvent::JobQueued { run_id, .. }
            | PipelineEvent::StepStarted { run_id, .. }
            | PipelineEvent::StepFinished { run_id, .. }
            | PipelineEvent::BuildJobFinished { run_id, .. }
            | PipelineEvent::DeployJobFinished { run_id, .. }
            | PipelineEvent::DeploySkipped { run_id, .. }
            | PipelineEvent::PipelineFinished { run_id, .. } => run_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_id_unique() {
        assert_ne!(EventId::new(), EventId::new());
    }

    #[test]
    fn test_event_serialization_round_trip() {
        let event = PipelineEvent::StepFinished {
            event_id: EventId::new(),
            run_id: "run-123".to_string(),
            job_name: "build-stable".to_string(),
            step_name: "cargo_build".to_string(),
            passed: true,
            exit_code: 0,
            duration_ms: 1500,
            timestamp: Utc::now(),
        };

        let json = serde_json::to_string(&event).expect("should serialize");
        assert!(json.contains("step_finished"));
        let _back: PipelineEvent = serde_json::from_str(&json).expect("should deserialize");
    }

    #[test]
    fn test_run_id_accessor() {
        let event = PipelineEvent::DeploySkipped {
            event_id: EventId::new(),
            run_id: "run-9".to_string(),
            reason: "ref is not the main branch".to_string(),
            timestamp: Utc::now(),
        };
        assert_eq!(event.run_id(), "run-9");
    }
}
