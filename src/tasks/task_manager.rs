//! Folds queue events into the canonical task snapshot.

use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

use super::task_store::TaskStore;
use crate::error::{A2AError, A2AResult};
use crate::models::{
    Event, Message, Task, TaskArtifactUpdateEvent, TaskStatusUpdateEvent,
};
use crate::state_machine::TaskState;

/// Applies events for one task attempt and persists each resulting snapshot
///
/// One manager serves one attempt: it accepts at most one `Task` event, and
/// once bound to a task id it rejects events for any other id.
pub struct TaskManager {
    task_id: Option<String>,
    context_id: Option<String>,
    current_task: Option<Task>,
    initial_message: Option<Message>,
    store: Arc<dyn TaskStore>,
    task_event_seen: bool,
    completed_artifacts: HashSet<String>,
}

impl TaskManager {
    pub fn new(
        task_id: Option<String>,
        context_id: Option<String>,
        store: Arc<dyn TaskStore>,
        initial_message: Option<Message>,
    ) -> Self {
        Self {
            task_id,
            context_id,
            current_task: None,
            initial_message,
            store,
            task_event_seen: false,
            completed_artifacts: HashSet::new(),
        }
    }

    pub fn task_id(&self) -> Option<&str> {
        self.task_id.as_deref()
    }

    pub fn context_id(&self) -> Option<&str> {
        self.context_id.as_deref()
    }

    /// Current snapshot, loading it from the store on first use
    pub async fn get_task(&mut self) -> A2AResult<Option<Task>> {
        if self.current_task.is_some() {
            return Ok(self.current_task.clone());
        }
        let Some(task_id) = self.task_id.clone() else {
            return Ok(None);
        };
        self.current_task = self.store.get(&task_id).await?;
        Ok(self.current_task.clone())
    }

    /// Apply one event and return the resulting snapshot
    ///
    /// `Message` events leave the task untouched.
    pub async fn process(&mut self, event: &Event) -> A2AResult<Option<Task>> {
        match event {
            Event::Task(task) => self.apply_task(task).await.map(Some),
            Event::StatusUpdate(update) => self.apply_status(update).await.map(Some),
            Event::ArtifactUpdate(update) => self.apply_artifact(update).await.map(Some),
            Event::Message(_) => Ok(self.current_task.clone()),
        }
    }

    /// Record a new inbound message on an existing task
    ///
    /// Any message carried by the current status moves into history first so
    /// the conversation keeps its order.
    pub async fn update_with_message(&mut self, message: Message, mut task: Task) -> A2AResult<Task> {
        if let Some(status_message) = task.status.message.take() {
            let already_recorded = task
                .history
                .last()
                .is_some_and(|last| last.message_id == status_message.message_id);
            if !already_recorded {
                task.history.push(status_message);
            }
        }
        task.history.push(message);
        self.save(task).await
    }

    async fn apply_task(&mut self, task: &Task) -> A2AResult<Task> {
        if self.task_event_seen {
            return Err(A2AError::invalid_arguments(format!(
                "Task {} was already received by this task manager",
                task.id
            )));
        }
        self.bind(&task.id, &task.context_id)?;
        self.task_event_seen = true;
        debug!(task_id = %task.id, state = %task.status.state, "Applying task event");
        self.save(task.clone()).await
    }

    async fn apply_status(&mut self, update: &TaskStatusUpdateEvent) -> A2AResult<Task> {
        self.bind(&update.task_id, &update.context_id)?;
        let mut task = self.ensure_task(&update.task_id, &update.context_id).await?;

        if task.is_terminal() {
            warn!(
                task_id = %task.id,
                current_state = %task.status.state,
                attempted_state = %update.status.state,
                "Ignoring status update for task in terminal state"
            );
            return Ok(task);
        }

        if let Some(message) = &update.status.message {
            task.history.push(message.clone());
        }
        task.metadata
            .extend(update.metadata.iter().map(|(k, v)| (k.clone(), v.clone())));
        task.status = update.status.clone();

        debug!(task_id = %task.id, state = %task.status.state, "Applying status update");
        self.save(task).await
    }

    async fn apply_artifact(&mut self, update: &TaskArtifactUpdateEvent) -> A2AResult<Task> {
        self.bind(&update.task_id, &update.context_id)?;
        let mut task = self.ensure_task(&update.task_id, &update.context_id).await?;
        let artifact = &update.artifact;
        let artifact_id = artifact.artifact_id.as_str();

        if update.append && self.completed_artifacts.contains(artifact_id) {
            warn!(
                task_id = %task.id,
                artifact_id = %artifact_id,
                "Ignoring append after last chunk"
            );
            return Ok(task);
        }

        let position = task
            .artifacts
            .iter()
            .position(|candidate| candidate.artifact_id == artifact_id);

        match position {
            Some(index) if update.append => {
                let existing = &mut task.artifacts[index];
                existing.parts.extend(artifact.parts.iter().cloned());
                existing
                    .metadata
                    .extend(artifact.metadata.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
            Some(index) => task.artifacts[index] = artifact.clone(),
            None => {
                if update.append {
                    debug!(task_id = %task.id, artifact_id = %artifact_id, "Append starts new artifact");
                }
                task.artifacts.push(artifact.clone());
            }
        }

        if update.last_chunk {
            self.completed_artifacts.insert(artifact_id.to_string());
        } else if !update.append {
            self.completed_artifacts.remove(artifact_id);
        }

        self.save(task).await
    }

    /// Snapshot to mutate, synthesizing an `UNKNOWN` task when none exists
    async fn ensure_task(&mut self, task_id: &str, context_id: &str) -> A2AResult<Task> {
        if let Some(task) = &self.current_task {
            return Ok(task.clone());
        }
        if let Some(task) = self.store.get(task_id).await? {
            return Ok(task);
        }

        debug!(task_id = %task_id, "No stored task, creating one from the event");
        let history = self.initial_message.iter().cloned().collect();
        Ok(Task::new(task_id, context_id, TaskState::Unknown).with_history(history))
    }

    fn bind(&mut self, task_id: &str, context_id: &str) -> A2AResult<()> {
        match &self.task_id {
            Some(bound) if bound != task_id => {
                return Err(A2AError::invalid_arguments(format!(
                    "Event for task {task_id} does not match task manager for task {bound}"
                )));
            }
            Some(_) => {}
            None => self.task_id = Some(task_id.to_string()),
        }
        if self.context_id.is_none() {
            self.context_id = Some(context_id.to_string());
        }
        Ok(())
    }

    async fn save(&mut self, task: Task) -> A2AResult<Task> {
        self.store.save(task.clone()).await?;
        if self.task_id.is_none() {
            self.task_id = Some(task.id.clone());
        }
        if self.context_id.is_none() {
            self.context_id = Some(task.context_id.clone());
        }
        self.current_task = Some(task.clone());
        Ok(task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Artifact, Part, TaskStatus};
    use crate::tasks::InMemoryTaskStore;
    use serde_json::json;

    fn manager(store: &InMemoryTaskStore, initial: Option<Message>) -> TaskManager {
        TaskManager::new(None, None, Arc::new(store.clone()), initial)
    }

    fn status_event(state: TaskState, message: Option<Message>) -> Event {
        let status = TaskStatus {
            message,
            ..TaskStatus::new(state)
        };
        TaskStatusUpdateEvent::new("t-1", "c-1", status, false).into()
    }

    fn artifact_event(id: &str, text: &str, append: bool, last_chunk: bool) -> Event {
        let mut event = TaskArtifactUpdateEvent::new("t-1", "c-1", Artifact::new(id, vec![Part::text(text)]));
        event.append = append;
        event.last_chunk = last_chunk;
        event.into()
    }

    #[tokio::test]
    async fn test_status_update_synthesizes_task_with_initial_message() {
        let store = InMemoryTaskStore::new();
        let initial = Message::user_text("start");
        let mut manager = manager(&store, Some(initial.clone()));

        let task = manager
            .process(&status_event(TaskState::Working, None))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(task.status.state, TaskState::Working);
        assert_eq!(task.history, vec![initial]);
        assert_eq!(manager.task_id(), Some("t-1"));
        assert!(store.get("t-1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_status_message_is_appended_and_metadata_merged() {
        let store = InMemoryTaskStore::new();
        let mut manager = manager(&store, None);
        manager
            .process(&Task::new("t-1", "c-1", TaskState::Submitted).into())
            .await
            .unwrap();

        let mut update = TaskStatusUpdateEvent::new(
            "t-1",
            "c-1",
            TaskStatus::with_message(TaskState::InputRequired, Message::agent_text("need more")),
            true,
        );
        update.metadata.insert("step".to_string(), json!(2));
        let task = manager.process(&update.into()).await.unwrap().unwrap();

        assert_eq!(task.history.len(), 1);
        assert_eq!(task.metadata["step"], json!(2));
        assert_eq!(task.status.state, TaskState::InputRequired);
    }

    #[tokio::test]
    async fn test_second_task_event_is_rejected() {
        let store = InMemoryTaskStore::new();
        let mut manager = manager(&store, None);
        let event: Event = Task::new("t-1", "c-1", TaskState::Submitted).into();

        manager.process(&event).await.unwrap();
        assert!(matches!(
            manager.process(&event).await,
            Err(A2AError::InvalidArguments(_))
        ));
    }

    #[tokio::test]
    async fn test_event_for_other_task_is_rejected() {
        let store = InMemoryTaskStore::new();
        let mut manager = TaskManager::new(Some("t-2".to_string()), None, Arc::new(store), None);

        assert!(matches!(
            manager.process(&status_event(TaskState::Working, None)).await,
            Err(A2AError::InvalidArguments(_))
        ));
    }

    #[tokio::test]
    async fn test_terminal_task_status_is_not_changed() {
        let store = InMemoryTaskStore::new();
        let mut manager = manager(&store, None);
        manager
            .process(&status_event(TaskState::Completed, None))
            .await
            .unwrap();
        manager
            .process(&status_event(TaskState::Working, None))
            .await
            .unwrap();

        let stored = store.get("t-1").await.unwrap().unwrap();
        assert_eq!(stored.status.state, TaskState::Completed);
    }

    #[tokio::test]
    async fn test_append_concatenates_parts() {
        let store = InMemoryTaskStore::new();
        let mut manager = manager(&store, None);
        manager.process(&artifact_event("a-1", "hello ", true, false)).await.unwrap();
        let task = manager
            .process(&artifact_event("a-1", "world", true, true))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(task.artifacts.len(), 1);
        let texts: Vec<_> = task.artifacts[0].parts.iter().filter_map(Part::as_text).collect();
        assert_eq!(texts, vec!["hello ", "world"]);
    }

    #[tokio::test]
    async fn test_append_after_last_chunk_is_ignored() {
        let store = InMemoryTaskStore::new();
        let mut manager = manager(&store, None);
        manager.process(&artifact_event("a-1", "done", false, true)).await.unwrap();
        let task = manager
            .process(&artifact_event("a-1", "extra", true, false))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(task.artifacts[0].parts.len(), 1);
    }

    #[tokio::test]
    async fn test_non_append_replaces_artifact() {
        let store = InMemoryTaskStore::new();
        let mut manager = manager(&store, None);
        manager.process(&artifact_event("a-1", "v1", false, false)).await.unwrap();
        let task = manager
            .process(&artifact_event("a-1", "v2", false, false))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(task.artifacts.len(), 1);
        assert_eq!(task.artifacts[0].parts[0].as_text(), Some("v2"));
    }

    #[tokio::test]
    async fn test_update_with_message_moves_status_message_into_history() {
        let store = InMemoryTaskStore::new();
        let mut manager = manager(&store, None);
        let question = Message::agent_text("which file?");
        let task = Task {
            status: TaskStatus::with_message(TaskState::InputRequired, question.clone()),
            ..Task::new("t-1", "c-1", TaskState::InputRequired)
        };

        let answer = Message::user_text("main.rs");
        let updated = manager.update_with_message(answer.clone(), task).await.unwrap();

        assert!(updated.status.message.is_none());
        assert_eq!(updated.history, vec![question, answer]);
    }

    #[tokio::test]
    async fn test_update_with_message_does_not_duplicate_recorded_status_message() {
        let store = InMemoryTaskStore::new();
        let mut manager = manager(&store, None);
        let question = Message::agent_text("which file?");
        let task = Task {
            status: TaskStatus::with_message(TaskState::InputRequired, question.clone()),
            ..Task::new("t-1", "c-1", TaskState::InputRequired).with_history(vec![question.clone()])
        };

        let updated = manager
            .update_with_message(Message::user_text("lib.rs"), task)
            .await
            .unwrap();

        assert_eq!(updated.history.len(), 2);
    }

    #[tokio::test]
    async fn test_message_event_leaves_task_untouched() {
        let store = InMemoryTaskStore::new();
        let mut manager = manager(&store, None);
        let result = manager.process(&Message::agent_text("hi").into()).await.unwrap();

        assert!(result.is_none());
        assert!(store.is_empty());
    }
}
