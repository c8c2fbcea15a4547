use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

use a2a_core::{
    A2AError, A2AResult, AgentExecutor, EventQueue, Message, Part, RequestContext, TaskState,
};

/// One action of a scripted agent run
#[derive(Clone)]
pub enum Step {
    /// Enqueue a `Task` event in SUBMITTED carrying the inbound message
    SubmitTask,
    Status(TaskState),
    /// Status update explicitly flagged final
    FinalStatus(TaskState),
    Artifact {
        id: &'static str,
        text: &'static str,
        append: bool,
        last_chunk: bool,
    },
    Reply(&'static str),
    Wait(Arc<Notify>),
    Sleep(Duration),
    Fail(&'static str),
}

/// Agent that replays a fixed script and counts cancel calls
pub struct ScriptedAgent {
    steps: Vec<Step>,
    cancel_state: TaskState,
    cancel_calls: AtomicUsize,
}

impl ScriptedAgent {
    pub fn new(steps: Vec<Step>) -> Arc<Self> {
        Self::with_cancel_outcome(steps, TaskState::Canceled)
    }

    /// Agent whose cancel hook drives the task to `cancel_state`
    pub fn with_cancel_outcome(steps: Vec<Step>, cancel_state: TaskState) -> Arc<Self> {
        Arc::new(Self {
            steps,
            cancel_state,
            cancel_calls: AtomicUsize::new(0),
        })
    }

    pub fn cancel_calls(&self) -> usize {
        self.cancel_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AgentExecutor for ScriptedAgent {
    async fn execute(&self, context: RequestContext, queue: EventQueue) -> A2AResult<()> {
        let updater = context.updater(queue.clone());
        for step in &self.steps {
            match step {
                Step::SubmitTask => {
                    let history = context.message().cloned().into_iter().collect();
                    updater.submit_task(history)?;
                }
                Step::Status(state) => updater.update_status(*state, None, false)?,
                Step::FinalStatus(state) => updater.update_status(*state, None, true)?,
                Step::Artifact {
                    id,
                    text,
                    append,
                    last_chunk,
                } => {
                    updater.add_artifact(
                        vec![Part::text(*text)],
                        Some(id.to_string()),
                        None,
                        HashMap::new(),
                        *append,
                        *last_chunk,
                    );
                }
                Step::Reply(text) => {
                    queue.enqueue(updater.new_agent_message(vec![Part::text(*text)], HashMap::new()));
                }
                Step::Wait(gate) => gate.notified().await,
                Step::Sleep(duration) => tokio::time::sleep(*duration).await,
                Step::Fail(reason) => return Err(A2AError::AgentExecution(reason.to_string())),
            }
        }
        Ok(())
    }

    async fn cancel(&self, context: RequestContext, queue: EventQueue) -> A2AResult<()> {
        self.cancel_calls.fetch_add(1, Ordering::SeqCst);
        context
            .updater(queue)
            .update_status(self.cancel_state, None, true)?;
        Ok(())
    }
}

/// Message continuing an existing task
pub fn follow_up(task_id: &str, text: &str) -> Message {
    Message::user_text(text).with_task_id(task_id)
}
