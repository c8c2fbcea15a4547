//! Error types for the A2A server core.
//!
//! `A2AError` is the crate-wide error returned across the public surface.
//! It is `Clone` so a failure recorded against a unit of work can be
//! broadcast to every consumer reading that work's queue.

use thiserror::Error;

use crate::constants::error_codes;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum A2AError {
    #[error("Task not found: {task_id}")]
    TaskNotFound { task_id: String },

    #[error("Task {task_id} cannot be canceled: {reason}")]
    TaskNotCancelable { task_id: String, reason: String },

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Push notification config {config_id} not found for task {task_id}")]
    PushNotificationConfigNotFound { task_id: String, config_id: String },

    #[error("Push notifications are not supported by this server")]
    PushNotificationNotSupported,

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Agent execution failed: {0}")]
    AgentExecution(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl A2AError {
    pub fn task_not_found(task_id: impl Into<String>) -> Self {
        Self::TaskNotFound {
            task_id: task_id.into(),
        }
    }

    pub fn not_cancelable(task_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::TaskNotCancelable {
            task_id: task_id.into(),
            reason: reason.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    pub fn invalid_arguments(message: impl Into<String>) -> Self {
        Self::InvalidArguments(message.into())
    }

    /// JSON-RPC error code a transport adapter should use for this error
    pub fn code(&self) -> i32 {
        match self {
            Self::TaskNotFound { .. } | Self::PushNotificationConfigNotFound { .. } => {
                error_codes::TASK_NOT_FOUND
            }
            Self::TaskNotCancelable { .. } => error_codes::TASK_NOT_CANCELABLE,
            Self::InvalidArguments(_) => error_codes::INVALID_PARAMS,
            Self::UnsupportedOperation(_) => error_codes::UNSUPPORTED_OPERATION,
            Self::PushNotificationNotSupported => error_codes::PUSH_NOTIFICATION_NOT_SUPPORTED,
            Self::InvalidState(_) | Self::AgentExecution(_) | Self::Internal(_) => {
                error_codes::INTERNAL_ERROR
            }
        }
    }
}

impl From<serde_json::Error> for A2AError {
    fn from(error: serde_json::Error) -> Self {
        A2AError::InvalidArguments(format!("JSON serialization error: {error}"))
    }
}

pub type A2AResult<T> = Result<T, A2AError>;
