use serde::{Deserialize, Serialize};
use std::fmt;

/// Task lifecycle states defined by the A2A protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskState {
    /// Accepted by the server, not yet started
    Submitted,
    /// The agent is actively working on the task
    Working,
    /// Paused until the caller supplies more input
    InputRequired,
    /// Paused until the caller authenticates
    AuthRequired,
    /// Finished successfully
    Completed,
    /// Finished with an error
    Failed,
    /// Canceled on request
    Canceled,
    /// Declined by the agent without being started
    Rejected,
    /// State could not be determined
    Unknown,
}

impl TaskState {
    /// Check if this is a terminal state (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::Canceled | Self::Rejected
        )
    }

    /// Check if the task is paused waiting on the caller
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::InputRequired | Self::AuthRequired)
    }

    /// Check if this is an active state (task may still produce events)
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::Working => "working",
            Self::InputRequired => "input-required",
            Self::AuthRequired => "auth-required",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Canceled => "canceled",
            Self::Rejected => "rejected",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "submitted" => Ok(Self::Submitted),
            "working" => Ok(Self::Working),
            "input-required" => Ok(Self::InputRequired),
            "auth-required" => Ok(Self::AuthRequired),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "canceled" => Ok(Self::Canceled),
            "rejected" => Ok(Self::Rejected),
            "unknown" => Ok(Self::Unknown),
            _ => Err(format!("Invalid task state: {s}")),
        }
    }
}

impl Default for TaskState {
    fn default() -> Self {
        Self::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_state_terminal_check() {
        assert!(TaskState::Completed.is_terminal());
        assert!(TaskState::Failed.is_terminal());
        assert!(TaskState::Canceled.is_terminal());
        assert!(TaskState::Rejected.is_terminal());
        assert!(!TaskState::Submitted.is_terminal());
        assert!(!TaskState::Working.is_terminal());
        assert!(!TaskState::InputRequired.is_terminal());
        assert!(!TaskState::AuthRequired.is_terminal());
        assert!(!TaskState::Unknown.is_terminal());
    }

    #[test]
    fn test_interrupted_states() {
        assert!(TaskState::InputRequired.is_interrupted());
        assert!(TaskState::AuthRequired.is_interrupted());
        assert!(!TaskState::Working.is_interrupted());
    }

    #[test]
    fn test_state_string_conversion() {
        assert_eq!(TaskState::InputRequired.to_string(), "input-required");
        assert_eq!(
            "canceled".parse::<TaskState>().unwrap(),
            TaskState::Canceled
        );
        assert!("cancelled".parse::<TaskState>().is_err());
    }

    #[test]
    fn test_state_serde() {
        let json = serde_json::to_string(&TaskState::AuthRequired).unwrap();
        assert_eq!(json, "\"auth-required\"");

        let parsed: TaskState = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, TaskState::AuthRequired);
    }
}
