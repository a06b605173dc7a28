//! Per-job state machines.
//!
//! Both machines are strictly linear on the success path: no transition
//! skips a state, and any step failure jumps directly to `Failed`.
//! Terminal states reject all further transitions.

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};

/// State of one build-matrix job.
///
/// `Pending -> Fetching -> SettingUpToolchain -> Building -> Testing
/// -> {Succeeded, Failed}`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BuildJobState {
    Pending,
    Fetching,
    SettingUpToolchain,
    Building,
    Testing,
    Succeeded,
    Failed,
}

impl BuildJobState {
    /// Advance along the success path.
    pub fn advance(self) -> Result<BuildJobState> {
        use BuildJobState::*;
        match self {
            Pending => Ok(Fetching),
            Fetching => Ok(SettingUpToolchain),
            SettingUpToolchain => Ok(Building),
            Building => Ok(Testing),
            Testing => Ok(Succeeded),
            Succeeded | Failed => Err(PipelineError::InvalidTransition {
                from: self.to_string(),
                to: "next".to_string(),
            }),
        }
    }

    /// Jump to `Failed` from any non-terminal state.
    pub fn fail(self) -> Result<BuildJobState> {
        if self.is_terminal() {
            return Err(PipelineError::InvalidTransition {
                from: self.to_string(),
                to: BuildJobState::Failed.to_string(),
            });
        }
        Ok(BuildJobState::Failed)
    }

    /// Whether no further transition can occur.
    pub fn is_terminal(&self) -> bool {
        matches!(self, BuildJobState::Succeeded | BuildJobState::Failed)
    }
}

impl std::fmt::Display for BuildJobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BuildJobState::Pending => "pending",
            BuildJobState::Fetching => "fetching",
            BuildJobState::SettingUpToolchain => "setting_up_toolchain",
            BuildJobState::Building => "building",
            BuildJobState::Testing => "testing",
            BuildJobState::Succeeded => "succeeded",
            BuildJobState::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// State of the deploy job.
///
/// `NotEligible` is terminal and means the job was never created: the
/// gate predicate (ref == main branch) was false. Otherwise
/// `Pending -> Fetching -> InstallingTool -> Deploying
/// -> {Succeeded, Failed}`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DeployJobState {
    NotEligible,
    Pending,
    Fetching,
    InstallingTool,
    Deploying,
    Succeeded,
    Failed,
}

impl DeployJobState {
    /// Advance along the success path.
    pub fn advance(self) -> Result<DeployJobState> {
        use DeployJobState::*;
        match self {
            Pending => Ok(Fetching),
            Fetching => Ok(InstallingTool),
            InstallingTool => Ok(Deploying),
            Deploying => Ok(Succeeded),
            NotEligible | Succeeded | Failed => Err(PipelineError::InvalidTransition {
                from: self.to_string(),
                to: "next".to_string(),
            }),
        }
    }

    /// Jump to `Failed` from any started, non-terminal state.
    pub fn fail(self) -> Result<DeployJobState> {
        if self.is_terminal() {
            return Err(PipelineError::InvalidTransition {
                from: self.to_string(),
                to: DeployJobState::Failed.to_string(),
            });
        }
        Ok(DeployJobState::Failed)
    }

    /// Whether no further transition can occur.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DeployJobState::NotEligible | DeployJobState::Succeeded | DeployJobState::Failed
        )
    }
}

impl std::fmt::Display for DeployJobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DeployJobState::NotEligible => "not_eligible",
            DeployJobState::Pending => "pending",
            DeployJobState::Fetching => "fetching",
            DeployJobState::InstallingTool => "installing_tool",
            DeployJobState::Deploying => "deploying",
            DeployJobState::Succeeded => "succeeded",
            DeployJobState::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_job_success_path_never_skips_a_state() {
        let mut state = BuildJobState::Pending;
        let expected = [
            BuildJobState::Fetching,
            BuildJobState::SettingUpToolchain,
            BuildJobState::Building,
            BuildJobState::Testing,
            BuildJobState::Succeeded,
        ];
        for next in expected {
            state = state.advance().expect("on-path transition");
            assert_eq!(state, next);
        }
        assert!(state.is_terminal());
    }

    #[test]
    fn test_build_job_fails_from_any_running_state() {
        for state in [
            BuildJobState::Pending,
            BuildJobState::Fetching,
            BuildJobState::SettingUpToolchain,
            BuildJobState::Building,
            BuildJobState::Testing,
        ] {
            assert_eq!(state.fail().unwrap(), BuildJobState::Failed);
        }
    }

    #[test]
    fn test_build_job_terminal_states_reject_transitions() {
        assert!(BuildJobState::Succeeded.advance().is_err());
        assert!(BuildJobState::Failed.advance().is_err());
        assert!(BuildJobState::Succeeded.fail().is_err());
        assert!(BuildJobState::Failed.fail().is_err());
    }

    #[test]
    fn test_deploy_job_success_path() {
        let mut state = DeployJobState::Pending;
        let expected = [
            DeployJobState::Fetching,
            DeployJobState::InstallingTool,
            DeployJobState::Deploying,
            DeployJobState::Succeeded,
        ];
        for next in expected {
            state = state.advance().expect("on-path transition");
            assert_eq!(state, next);
        }
        assert!(state.is_terminal());
    }

    #[test]
    fn test_deploy_not_eligible_is_terminal() {
        let state = DeployJobState::NotEligible;
        assert!(state.is_terminal());
        assert!(state.advance().is_err());
        assert!(state.fail().is_err());
    }

    #[test]
    fn test_invalid_transition_error_names_states() {
        let err = BuildJobState::Succeeded.advance().unwrap_err();
        assert!(err.to_string().contains("succeeded"));
    }
}
