use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use super::message::{Artifact, Message};
use super::task::{Task, TaskStatus};
use crate::constants::kinds;
use crate::state_machine::TaskState;

/// Status change notification for a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatusUpdateEvent {
    pub task_id: String,
    pub context_id: String,
    pub status: TaskStatus,
    #[serde(rename = "final")]
    pub is_final: bool,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, Value>,
}

impl TaskStatusUpdateEvent {
    pub fn new(
        task_id: impl Into<String>,
        context_id: impl Into<String>,
        status: TaskStatus,
        is_final: bool,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            context_id: context_id.into(),
            status,
            is_final,
            metadata: HashMap::new(),
        }
    }
}

/// Artifact emitted (or extended) while a task runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskArtifactUpdateEvent {
    pub task_id: String,
    pub context_id: String,
    pub artifact: Artifact,
    /// Extend the previously emitted artifact with the same id
    #[serde(default)]
    pub append: bool,
    /// Final chunk of an append sequence
    #[serde(default)]
    pub last_chunk: bool,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, Value>,
}

impl TaskArtifactUpdateEvent {
    pub fn new(task_id: impl Into<String>, context_id: impl Into<String>, artifact: Artifact) -> Self {
        Self {
            task_id: task_id.into(),
            context_id: context_id.into(),
            artifact,
            append: false,
            last_chunk: false,
            metadata: HashMap::new(),
        }
    }
}

/// Everything a unit of work can place on its event queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Event {
    #[serde(rename = "message")]
    Message(Message),
    #[serde(rename = "task")]
    Task(Task),
    #[serde(rename = "status-update")]
    StatusUpdate(TaskStatusUpdateEvent),
    #[serde(rename = "artifact-update")]
    ArtifactUpdate(TaskArtifactUpdateEvent),
}

impl Event {
    /// Get a string representation of the event type for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Message(_) => kinds::MESSAGE,
            Self::Task(_) => kinds::TASK,
            Self::StatusUpdate(_) => kinds::STATUS_UPDATE,
            Self::ArtifactUpdate(_) => kinds::ARTIFACT_UPDATE,
        }
    }

    pub fn task_id(&self) -> Option<&str> {
        match self {
            Self::Message(message) => message.task_id.as_deref(),
            Self::Task(task) => Some(&task.id),
            Self::StatusUpdate(event) => Some(&event.task_id),
            Self::ArtifactUpdate(event) => Some(&event.task_id),
        }
    }

    /// State this event puts the task into, if it carries one
    pub fn task_state(&self) -> Option<TaskState> {
        match self {
            Self::Task(task) => Some(task.status.state),
            Self::StatusUpdate(event) => Some(event.status.state),
            Self::Message(_) | Self::ArtifactUpdate(_) => None,
        }
    }

    /// Whether this event ends the stream for the current interaction
    ///
    /// A `Message` reply is always final; a `Task` is final once terminal; a
    /// status update is final when flagged or when it reaches a terminal state.
    pub fn is_final(&self) -> bool {
        match self {
            Self::Message(_) => true,
            Self::Task(task) => task.is_terminal(),
            Self::StatusUpdate(event) => event.is_final || event.status.state.is_terminal(),
            Self::ArtifactUpdate(_) => false,
        }
    }
}

impl From<Message> for Event {
    fn from(message: Message) -> Self {
        Self::Message(message)
    }
}

impl From<Task> for Event {
    fn from(task: Task) -> Self {
        Self::Task(task)
    }
}

impl From<TaskStatusUpdateEvent> for Event {
    fn from(event: TaskStatusUpdateEvent) -> Self {
        Self::StatusUpdate(event)
    }
}

impl From<TaskArtifactUpdateEvent> for Event {
    fn from(event: TaskArtifactUpdateEvent) -> Self {
        Self::ArtifactUpdate(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Part;

    #[test]
    fn test_finality_rules() {
        assert!(Event::from(Message::agent_text("done")).is_final());
        assert!(!Event::from(Task::new("t", "c", TaskState::Working)).is_final());
        assert!(Event::from(Task::new("t", "c", TaskState::Rejected)).is_final());

        let working = TaskStatusUpdateEvent::new("t", "c", TaskStatus::new(TaskState::Working), false);
        assert!(!Event::from(working).is_final());

        let input = TaskStatusUpdateEvent::new("t", "c", TaskStatus::new(TaskState::InputRequired), true);
        assert!(Event::from(input).is_final());

        let failed = TaskStatusUpdateEvent::new("t", "c", TaskStatus::new(TaskState::Failed), false);
        assert!(Event::from(failed).is_final());

        let artifact = TaskArtifactUpdateEvent::new("t", "c", Artifact::new("a", vec![Part::text("x")]));
        assert!(!Event::from(artifact).is_final());
    }

    #[test]
    fn test_event_kind_tag() {
        let event = Event::from(TaskStatusUpdateEvent::new(
            "t",
            "c",
            TaskStatus::new(TaskState::Working),
            false,
        ));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "status-update");
        assert_eq!(json["final"], false);
        assert_eq!(json["taskId"], "t");
    }
}
