//! Event sinks.
//!
//! Every lifecycle event a run produces goes through an [`EventSink`].
//! The memory sink keeps the stream for inspection; the tracing sink
//! forwards events as structured log lines.

use gantry_core::PipelineEvent;
use std::sync::Mutex;
use tracing::info;

/// Receives the append-only event stream of a run.
pub trait EventSink: Send + Sync {
    fn record(&self, event: PipelineEvent);
}

/// In-memory sink backed by a `Mutex<Vec<_>>`.
#[derive(Debug, Default)]
pub struct MemoryEventSink {
    events: Mutex<Vec<PipelineEvent>>,
}

impl MemoryEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All events recorded so far, in order.
    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl EventSink for MemoryEventSink {
    fn record(&self, event: PipelineEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Sink that emits each event as a structured tracing line.
#[derive(Debug, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn record(&self, event: PipelineEvent) {
        match &event {
            PipelineEvent::PipelineStarted { run_id, git_ref, .. } => {
                info!(run_id = %run_id, git_ref = %git_ref, "Pipeline started");
            }
            PipelineEvent::JobQueued { run_id, job_name, .. } => {
                info!(run_id = %run_id, job = %job_name, "Job queued");
            }
            PipelineEvent::StepStarted { run_id, job_name, step_name, .. } => {
                info!(run_id = %run_id, job = %job_name, step = %step_name, "Step started");
            }
            PipelineEvent::StepFinished {
                run_id,
                job_name,
                step_name,
                passed,
                exit_code,
                duration_ms,
                ..
            } => {
                info!(
                    run_id = %run_id,
                    job = %job_name,
                    step = %step_name,
                    passed = passed,
                    exit_code = exit_code,
                    duration_ms = duration_ms,
                    "Step finished"
                );
            }
            PipelineEvent::BuildJobFinished { run_id, job_name, state, .. } => {
                info!(run_id = %run_id, job = %job_name, state = %state, "Build job finished");
            }
            PipelineEvent::DeployJobFinished { run_id, state, .. } => {
                info!(run_id = %run_id, state = %state, "Deploy job finished");
            }
            PipelineEvent::DeploySkipped { run_id, reason, .. } => {
                info!(run_id = %run_id, reason = %reason, "Deploy skipped");
            }
            PipelineEvent::PipelineFinished { run_id, success, duration_ms, .. } => {
                info!(run_id = %run_id, success = success, duration_ms = duration_ms, "Pipeline finished");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use gantry_core::EventId;

    #[test]
    fn test_memory_sink_preserves_order() {
        let sink = MemoryEventSink::new();
        for job in ["build-stable", "build-beta"] {
            sink.record(PipelineEvent::JobQueued {
                event_id: EventId::new(),
                run_id: "run-1".to_string(),
                job_name: job.to_string(),
                timestamp: Utc::now(),
            });
        }

        let events = sink.events();
        assert_eq!(events.len(), 2);
        match &events[0] {
            PipelineEvent::JobQueued { job_name, .. } => assert_eq!(job_name, "build-stable"),
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
