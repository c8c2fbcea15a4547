use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use super::message::{Artifact, Message};
use crate::state_machine::TaskState;

/// Status of a task at a point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStatus {
    pub state: TaskState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl TaskStatus {
    /// Status stamped with the current time
    pub fn new(state: TaskState) -> Self {
        Self {
            state,
            message: None,
            timestamp: Some(Utc::now()),
        }
    }

    pub fn with_message(state: TaskState, message: Message) -> Self {
        Self {
            message: Some(message),
            ..Self::new(state)
        }
    }
}

/// The durable record of one unit of work
///
/// `id` and `context_id` never change once the task exists. `history` and
/// `artifacts` are always present (possibly empty) and only grow while the
/// task is active.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub context_id: String,
    pub status: TaskStatus,
    #[serde(default)]
    pub history: Vec<Message>,
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, Value>,
}

impl Task {
    pub fn new(id: impl Into<String>, context_id: impl Into<String>, state: TaskState) -> Self {
        Self {
            id: id.into(),
            context_id: context_id.into(),
            status: TaskStatus::new(state),
            history: Vec::new(),
            artifacts: Vec::new(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_history(mut self, history: Vec<Message>) -> Self {
        self.history = history;
        self
    }

    pub fn state(&self) -> TaskState {
        self.status.state
    }

    pub fn is_terminal(&self) -> bool {
        self.status.state.is_terminal()
    }

    /// Moment of the last recorded status change, if known
    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.status.timestamp
    }

    /// Copy of this task whose history keeps only the most recent entries
    ///
    /// `None` or a non-positive length leaves history untouched.
    pub fn with_history_length(&self, history_length: Option<i32>) -> Task {
        let mut task = self.clone();
        task.truncate_history(history_length);
        task
    }

    pub fn truncate_history(&mut self, history_length: Option<i32>) {
        let Some(limit) = history_length.filter(|n| *n > 0) else {
            return;
        };
        let limit = limit as usize;
        if self.history.len() > limit {
            let skip = self.history.len() - limit;
            self.history.drain(..skip);
        }
    }

    pub fn artifact(&self, artifact_id: &str) -> Option<&Artifact> {
        self.artifacts
            .iter()
            .find(|artifact| artifact.artifact_id == artifact_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task_with_history(count: usize) -> Task {
        let history = (0..count)
            .map(|i| Message::user_text(format!("m{i}")))
            .collect();
        Task::new("t-1", "c-1", TaskState::Working).with_history(history)
    }

    #[test]
    fn test_history_length_one_returns_most_recent_entry() {
        let task = task_with_history(3).with_history_length(Some(1));
        assert_eq!(task.history.len(), 1);
        assert_eq!(task.history[0].text_content(), "m2");
    }

    #[test]
    fn test_non_positive_history_length_is_unlimited() {
        assert_eq!(task_with_history(4).with_history_length(Some(0)).history.len(), 4);
        assert_eq!(task_with_history(4).with_history_length(Some(-3)).history.len(), 4);
        assert_eq!(task_with_history(4).with_history_length(None).history.len(), 4);
    }

    #[test]
    fn test_history_length_larger_than_history_keeps_everything() {
        let original = task_with_history(2);
        assert_eq!(original.with_history_length(Some(10)), original);
    }

    #[test]
    fn test_task_serializes_empty_collections() {
        let json = serde_json::to_value(Task::new("t", "c", TaskState::Submitted)).unwrap();
        assert_eq!(json["history"], serde_json::json!([]));
        assert_eq!(json["artifacts"], serde_json::json!([]));
        assert_eq!(json["contextId"], "c");
        assert_eq!(json["status"]["state"], "submitted");
    }
}
