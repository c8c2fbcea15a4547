//! # System Constants
//!
//! Protocol discriminators, default timing values and JSON-RPC error codes
//! shared by every layer of the server core.

use std::time::Duration;

/// Discriminator values carried in the `kind` field of protocol objects
pub mod kinds {
    pub const TASK: &str = "task";
    pub const MESSAGE: &str = "message";
    pub const STATUS_UPDATE: &str = "status-update";
    pub const ARTIFACT_UPDATE: &str = "artifact-update";
}

/// Default timing values used when configuration does not override them
pub mod defaults {
    use super::Duration;

    /// Bound on how long a blocking send waits for the unit of work to finish
    pub const AGENT_COMPLETION_TIMEOUT_MS: u64 = 30_000;

    /// Bound on how long a blocking send waits for the background drain
    pub const CONSUMPTION_COMPLETION_TIMEOUT_MS: u64 = 5_000;

    /// Slice a consumer waits on an empty queue before re-checking producer state
    pub const QUEUE_POLL_INTERVAL_MS: u64 = 500;

    /// Page size for task listing when the caller does not specify one
    pub const LIST_TASKS_PAGE_SIZE: usize = 50;

    /// Upper bound on task listing page size
    pub const LIST_TASKS_MAX_PAGE_SIZE: usize = 100;

    pub fn agent_completion_timeout() -> Duration {
        Duration::from_millis(AGENT_COMPLETION_TIMEOUT_MS)
    }

    pub fn consumption_completion_timeout() -> Duration {
        Duration::from_millis(CONSUMPTION_COMPLETION_TIMEOUT_MS)
    }

    pub fn queue_poll_interval() -> Duration {
        Duration::from_millis(QUEUE_POLL_INTERVAL_MS)
    }
}

/// JSON-RPC error codes defined by the A2A protocol
pub mod error_codes {
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
    pub const TASK_NOT_FOUND: i32 = -32001;
    pub const TASK_NOT_CANCELABLE: i32 = -32002;
    pub const PUSH_NOTIFICATION_NOT_SUPPORTED: i32 = -32003;
    pub const UNSUPPORTED_OPERATION: i32 = -32004;
}

/// Message emitted when a status change is attempted after a terminal state
pub const TERMINAL_STATE_REACHED_MESSAGE: &str =
    "Cannot update task status - terminal state already reached";

/// Environment variables consulted by configuration and logging
pub mod env {
    pub const ENVIRONMENT: &str = "A2A_CORE_ENV";
    pub const CONFIG_PATH: &str = "A2A_CORE_CONFIG_PATH";
    pub const ENV_PREFIX: &str = "A2A_CORE";
    pub const ENV_SEPARATOR: &str = "__";
}
