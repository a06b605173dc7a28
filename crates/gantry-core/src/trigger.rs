//! Pipeline triggers.
//!
//! A trigger is the version-control event that starts one pipeline run.
//! It is created by the external host, immutable, and consumed exactly
//! once per invocation.

use serde::{Deserialize, Serialize};

/// Kind of version-control event that started the pipeline.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TriggerEvent {
    Push,
    PullRequest,
}

impl std::fmt::Display for TriggerEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TriggerEvent::Push => write!(f, "push"),
            TriggerEvent::PullRequest => write!(f, "pull_request"),
        }
    }
}

/// The event carrying the ref to build and the event kind.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Trigger {
    /// Full git ref, e.g. `refs/heads/master` or a bare branch name.
    pub git_ref: String,

    /// What kind of event produced this trigger.
    pub event: TriggerEvent,
}

impl Trigger {
    /// Create a push trigger for the given ref.
    pub fn push(git_ref: impl Into<String>) -> Self {
        Self {
            git_ref: git_ref.into(),
            event: TriggerEvent::Push,
        }
    }

    /// Create a pull-request trigger for the given ref.
    pub fn pull_request(git_ref: impl Into<String>) -> Self {
        Self {
            git_ref: git_ref.into(),
            event: TriggerEvent::PullRequest,
        }
    }

    /// The branch name with any `refs/heads/` prefix stripped.
    pub fn branch(&self) -> &str {
        self.git_ref
            .strip_prefix("refs/heads/")
            .unwrap_or(&self.git_ref)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_branch_strips_refs_heads_prefix() {
        let trigger = Trigger::push("refs/heads/master");
        assert_eq!(trigger.branch(), "master");
    }

    #[test]
    fn test_branch_passes_bare_names_through() {
        let trigger = Trigger::push("feature-x");
        assert_eq!(trigger.branch(), "feature-x");
    }

    #[test]
    fn test_trigger_serialization_round_trip() {
        let trigger = Trigger::pull_request("refs/heads/feature-x");
        let json = serde_json::to_string(&trigger).expect("should serialize");
        let back: Trigger = serde_json::from_str(&json).expect("should deserialize");
        assert_eq!(back, trigger);
        assert!(json.contains("pull_request"));
    }
}
