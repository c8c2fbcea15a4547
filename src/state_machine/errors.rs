use thiserror::Error;

use super::states::TaskState;
use crate::constants::TERMINAL_STATE_REACHED_MESSAGE;
use crate::error::A2AError;

/// Errors raised by the task mutation API
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateMachineError {
    #[error("{}", TERMINAL_STATE_REACHED_MESSAGE)]
    TerminalStateReached { task_id: String, state: TaskState },
}

/// Result type for state machine operations
pub type StateMachineResult<T> = Result<T, StateMachineError>;

/// Helper function to create a terminal-state error
pub fn terminal_state_reached(task_id: impl Into<String>, state: TaskState) -> StateMachineError {
    StateMachineError::TerminalStateReached {
        task_id: task_id.into(),
        state,
    }
}

impl From<StateMachineError> for A2AError {
    fn from(error: StateMachineError) -> Self {
        match error {
            StateMachineError::TerminalStateReached { .. } => {
                A2AError::InvalidState(error.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_error_message() {
        let err = terminal_state_reached("t-1", TaskState::Completed);
        assert_eq!(
            err.to_string(),
            "Cannot update task status - terminal state already reached"
        );

        let a2a: A2AError = err.into();
        assert!(matches!(a2a, A2AError::InvalidState(_)));
    }
}
