//! Terminal-protected mutation API handed to a unit of work.

use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};
use uuid::Uuid;

use super::errors::{terminal_state_reached, StateMachineResult};
use super::states::TaskState;
use crate::events::EventQueue;
use crate::models::{
    Artifact, Message, Part, Role, Task, TaskArtifactUpdateEvent, TaskStatus,
    TaskStatusUpdateEvent,
};

/// Emits status and artifact events for one task onto its queue
///
/// Status transitions are linearized: once a terminal status has been
/// enqueued, every further status change fails with
/// [`StateMachineError::TerminalStateReached`](super::StateMachineError) and
/// enqueues nothing. Artifacts may still be emitted after a terminal status.
pub struct TaskUpdater {
    queue: EventQueue,
    task_id: String,
    context_id: String,
    terminal_reached: AtomicBool,
    state_lock: Mutex<()>,
}

impl TaskUpdater {
    pub fn new(queue: EventQueue, task_id: impl Into<String>, context_id: impl Into<String>) -> Self {
        Self {
            queue,
            task_id: task_id.into(),
            context_id: context_id.into(),
            terminal_reached: AtomicBool::new(false),
            state_lock: Mutex::new(()),
        }
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn context_id(&self) -> &str {
        &self.context_id
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal_reached.load(Ordering::Acquire)
    }

    /// Emit the initial task snapshot in `SUBMITTED` state
    pub fn submit_task(&self, history: Vec<Message>) -> StateMachineResult<()> {
        let _guard = self.state_lock.lock();
        if self.is_terminal() {
            return Err(terminal_state_reached(&self.task_id, TaskState::Submitted));
        }
        let task = Task::new(&self.task_id, &self.context_id, TaskState::Submitted)
            .with_history(history);
        self.queue.enqueue(task);
        Ok(())
    }

    /// Enqueue a status change, rejecting it once a terminal status was sent
    pub fn update_status(
        &self,
        state: TaskState,
        message: Option<Message>,
        is_final: bool,
    ) -> StateMachineResult<()> {
        let _guard = self.state_lock.lock();
        if self.terminal_reached.load(Ordering::Acquire) {
            warn!(
                task_id = %self.task_id,
                attempted_state = %state,
                "Rejected status update after terminal state"
            );
            return Err(terminal_state_reached(&self.task_id, state));
        }
        if state.is_terminal() {
            self.terminal_reached.store(true, Ordering::Release);
        }

        let status = TaskStatus {
            message,
            ..TaskStatus::new(state)
        };
        debug!(task_id = %self.task_id, state = %state, is_final = is_final, "Enqueueing status update");
        self.queue.enqueue(TaskStatusUpdateEvent::new(
            &self.task_id,
            &self.context_id,
            status,
            is_final || state.is_terminal(),
        ));
        Ok(())
    }

    pub fn submit(&self, message: Option<Message>) -> StateMachineResult<()> {
        self.update_status(TaskState::Submitted, message, false)
    }

    pub fn start_work(&self, message: Option<Message>) -> StateMachineResult<()> {
        self.update_status(TaskState::Working, message, false)
    }

    pub fn requires_input(&self, message: Option<Message>, is_final: bool) -> StateMachineResult<()> {
        self.update_status(TaskState::InputRequired, message, is_final)
    }

    pub fn requires_auth(&self, message: Option<Message>, is_final: bool) -> StateMachineResult<()> {
        self.update_status(TaskState::AuthRequired, message, is_final)
    }

    pub fn complete(&self, message: Option<Message>) -> StateMachineResult<()> {
        self.update_status(TaskState::Completed, message, true)
    }

    pub fn fail(&self, message: Option<Message>) -> StateMachineResult<()> {
        self.update_status(TaskState::Failed, message, true)
    }

    pub fn cancel(&self, message: Option<Message>) -> StateMachineResult<()> {
        self.update_status(TaskState::Canceled, message, true)
    }

    pub fn reject(&self, message: Option<Message>) -> StateMachineResult<()> {
        self.update_status(TaskState::Rejected, message, true)
    }

    /// Emit an artifact, or extend an earlier one when `append` is set
    ///
    /// A missing `artifact_id` gets a fresh UUID. Returns the id used.
    pub fn add_artifact(
        &self,
        parts: Vec<Part>,
        artifact_id: Option<String>,
        name: Option<String>,
        metadata: HashMap<String, Value>,
        append: bool,
        last_chunk: bool,
    ) -> String {
        let artifact_id = artifact_id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let artifact = Artifact {
            artifact_id: artifact_id.clone(),
            parts,
            name,
            description: None,
            metadata,
        };
        let mut event = TaskArtifactUpdateEvent::new(&self.task_id, &self.context_id, artifact);
        event.append = append;
        event.last_chunk = last_chunk;
        self.queue.enqueue(event);
        artifact_id
    }

    /// Build an agent message bound to this task, without enqueueing it
    pub fn new_agent_message(&self, parts: Vec<Part>, metadata: HashMap<String, Value>) -> Message {
        let mut message = Message::new(Role::Agent, parts)
            .with_task_id(&self.task_id)
            .with_context_id(&self.context_id);
        message.metadata = metadata;
        message
    }
}
