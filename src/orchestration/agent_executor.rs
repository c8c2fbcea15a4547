//! # Agent Executor Contract
//!
//! The unit of work is supplied by the embedding application through the
//! [`AgentExecutor`] trait. The orchestrator hands it a [`RequestContext`]
//! describing the request and an [`EventQueue`] through which it reports
//! progress; the executor never touches the task store directly.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::{A2AError, A2AResult};
use crate::events::EventQueue;
use crate::models::{Message, MessageSendConfiguration, MessageSendParams, Task};
use crate::state_machine::TaskUpdater;

/// Agent business logic driven by the orchestrator
#[async_trait]
pub trait AgentExecutor: Send + Sync {
    /// Run the work, enqueueing at least the events needed to reach a
    /// decidable state
    ///
    /// An error returned here is recorded against the work and surfaced to
    /// consumers as a stream error.
    async fn execute(&self, context: RequestContext, queue: EventQueue) -> A2AResult<()>;

    /// Try to bring an active task to `CANCELED`
    async fn cancel(&self, context: RequestContext, queue: EventQueue) -> A2AResult<()>;
}

/// Everything the executor needs to know about one request
#[derive(Debug, Clone)]
pub struct RequestContext {
    task_id: String,
    context_id: String,
    message: Option<Message>,
    task: Option<Task>,
    configuration: Option<MessageSendConfiguration>,
    metadata: HashMap<String, Value>,
}

impl RequestContext {
    /// Context for a send request
    ///
    /// Ids come from the message, then the existing task, then fresh UUIDs.
    /// The message is rebound to the resolved ids.
    pub fn from_send_params(params: &MessageSendParams, task: Option<Task>) -> A2AResult<Self> {
        let message = &params.message;

        if let (Some(task), Some(task_id)) = (&task, &message.task_id) {
            if &task.id != task_id {
                return Err(A2AError::invalid_arguments(format!(
                    "Message task id {task_id} does not match task {}",
                    task.id
                )));
            }
        }
        if let (Some(task), Some(context_id)) = (&task, &message.context_id) {
            if &task.context_id != context_id {
                return Err(A2AError::invalid_arguments(format!(
                    "Message context id {context_id} does not match context {} of task {}",
                    task.context_id, task.id
                )));
            }
        }

        let task_id = message
            .task_id
            .clone()
            .or_else(|| task.as_ref().map(|t| t.id.clone()))
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let context_id = message
            .context_id
            .clone()
            .or_else(|| task.as_ref().map(|t| t.context_id.clone()))
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let message = message
            .clone()
            .with_task_id(&task_id)
            .with_context_id(&context_id);

        Ok(Self {
            task_id,
            context_id,
            message: Some(message),
            task,
            configuration: params.configuration.clone(),
            metadata: params.metadata.clone(),
        })
    }

    /// Context for acting on a stored task without a new message
    pub fn for_task(task: Task) -> Self {
        Self {
            task_id: task.id.clone(),
            context_id: task.context_id.clone(),
            message: None,
            task: Some(task),
            configuration: None,
            metadata: HashMap::new(),
        }
    }

    /// Replace the stored task snapshot, e.g. after the inbound message was recorded
    pub fn with_task(mut self, task: Task) -> Self {
        self.task = Some(task);
        self
    }

    pub fn with_metadata(mut self, metadata: HashMap<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn context_id(&self) -> &str {
        &self.context_id
    }

    pub fn message(&self) -> Option<&Message> {
        self.message.as_ref()
    }

    /// The stored task this request continues, if any
    pub fn task(&self) -> Option<&Task> {
        self.task.as_ref()
    }

    pub fn configuration(&self) -> Option<&MessageSendConfiguration> {
        self.configuration.as_ref()
    }

    pub fn metadata(&self) -> &HashMap<String, Value> {
        &self.metadata
    }

    /// Text of the inbound message, empty when there is none
    pub fn user_input(&self) -> String {
        self.message
            .as_ref()
            .map(Message::text_content)
            .unwrap_or_default()
    }

    /// A [`TaskUpdater`] bound to this request's task
    pub fn updater(&self, queue: EventQueue) -> TaskUpdater {
        TaskUpdater::new(queue, &self.task_id, &self.context_id)
    }
}
