//! Decides what a send request returns while events keep flowing.

use futures::stream::{self, BoxStream, StreamExt};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch, Mutex as AsyncMutex};
use tracing::{debug, warn};

use super::task_manager::TaskManager;
use crate::error::{A2AError, A2AResult};
use crate::events::EventConsumer;
use crate::models::{Event, Message, SendMessageResult};
use crate::state_machine::TaskState;

/// Completion signal of a background drain
///
/// Resolves once the consumer behind it has stopped. A drain that vanished
/// without reporting (its task was aborted) resolves to an internal error.
#[derive(Debug, Clone)]
pub struct ConsumptionHandle {
    state: watch::Receiver<Option<A2AResult<()>>>,
}

impl ConsumptionHandle {
    pub(crate) fn channel() -> (watch::Sender<Option<A2AResult<()>>>, Self) {
        let (tx, rx) = watch::channel(None);
        (tx, Self { state: rx })
    }

    pub fn is_finished(&self) -> bool {
        self.state.borrow().is_some()
    }

    pub async fn wait(&self) -> A2AResult<()> {
        let mut state = self.state.clone();
        let outcome = state
            .wait_for(Option::is_some)
            .await
            .map_err(|_| A2AError::internal("Background consumption was interrupted"))?;
        outcome.clone().unwrap_or(Ok(()))
    }

    /// Wait at most `timeout`; `None` when the drain is still running
    pub async fn wait_timeout(&self, timeout: Duration) -> Option<A2AResult<()>> {
        tokio::time::timeout(timeout, self.wait()).await.ok()
    }
}

/// Outcome of [`ResultAggregator::consume_and_break_on_interrupt`]
#[derive(Debug)]
pub struct InterruptResult {
    /// Snapshot after the event that ended the wait
    pub result: Option<SendMessageResult>,
    /// The call returned before the task reached a final event
    pub interrupted: bool,
    /// The caller should not wait for the remaining events
    pub continue_in_background: bool,
    /// Drain of the events still to come
    pub consumption: ConsumptionHandle,
}

struct FirstEvent {
    result: Option<SendMessageResult>,
    is_final: bool,
    auth_required: bool,
}

/// Folds consumed events through a [`TaskManager`]
#[derive(Clone)]
pub struct ResultAggregator {
    task_manager: Arc<AsyncMutex<TaskManager>>,
    message: Arc<Mutex<Option<Message>>>,
}

impl ResultAggregator {
    pub fn new(task_manager: TaskManager, message: Option<Message>) -> Self {
        Self {
            task_manager: Arc::new(AsyncMutex::new(task_manager)),
            message: Arc::new(Mutex::new(message)),
        }
    }

    pub fn task_manager(&self) -> &Arc<AsyncMutex<TaskManager>> {
        &self.task_manager
    }

    /// The direct reply if one was received, else the current task snapshot
    pub async fn get_current_result(&self) -> A2AResult<Option<SendMessageResult>> {
        let reply = self.message.lock().clone();
        if let Some(message) = reply {
            return Ok(Some(SendMessageResult::Message(message)));
        }
        let task = self.task_manager.lock().await.get_task().await?;
        Ok(task.map(SendMessageResult::Task))
    }

    /// Every event, applied to the task before it is yielded
    ///
    /// The stream ends after the first error.
    pub fn consume_and_emit(&self, consumer: EventConsumer) -> BoxStream<'static, A2AResult<Event>> {
        let aggregator = self.clone();
        stream::unfold(Some(consumer.consume_all()), move |events| {
            let aggregator = aggregator.clone();
            async move {
                let mut events = events?;
                let item = match events.next().await? {
                    Ok(event) => aggregator.apply(&event).await.map(|_| event),
                    Err(error) => Err(error),
                };
                let next = item.is_ok().then_some(events);
                Some((item, next))
            }
        })
        .boxed()
    }

    /// Drain to the end and return the final result
    ///
    /// A `Message` event ends consumption at once and is returned as is.
    pub async fn consume_all(&self, consumer: EventConsumer) -> A2AResult<Option<SendMessageResult>> {
        let mut events = consumer.consume_all();
        while let Some(item) = events.next().await {
            let event = item?;
            if let Event::Message(message) = &event {
                *self.message.lock() = Some(message.clone());
                return Ok(Some(SendMessageResult::Message(message.clone())));
            }
            self.apply(&event).await?;
        }
        self.get_current_result().await
    }

    /// Return at the first event while a background task keeps draining
    ///
    /// `interrupted` is set when that event was not final. The work continues
    /// in the background when the caller is not blocking or the task is
    /// waiting on authentication; otherwise the caller is expected to wait on
    /// [`InterruptResult::consumption`] before treating the result as final.
    pub async fn consume_and_break_on_interrupt(
        &self,
        consumer: EventConsumer,
        blocking: bool,
    ) -> A2AResult<InterruptResult> {
        let (first_tx, first_rx) = oneshot::channel::<A2AResult<FirstEvent>>();
        let (state_tx, consumption) = ConsumptionHandle::channel();
        let aggregator = self.clone();
        let task_id = consumer.queue().task_id().to_string();

        tokio::spawn(async move {
            let mut first_tx = Some(first_tx);
            let mut events = consumer.consume_all();
            let mut outcome = Ok(());

            while let Some(item) = events.next().await {
                let applied = match item {
                    Ok(event) => aggregator.apply(&event).await.map(|result| (event, result)),
                    Err(error) => Err(error),
                };
                match applied {
                    Ok((event, result)) => {
                        if let Some(tx) = first_tx.take() {
                            let first = FirstEvent {
                                result: Some(result),
                                is_final: event.is_final(),
                                auth_required: event.task_state() == Some(TaskState::AuthRequired),
                            };
                            let _ = tx.send(Ok(first));
                        }
                    }
                    Err(error) => {
                        if let Some(tx) = first_tx.take() {
                            let _ = tx.send(Err(error.clone()));
                        } else {
                            warn!(task_id = %task_id, error = %error, "Background consumption failed");
                        }
                        outcome = Err(error);
                        break;
                    }
                }
            }

            if let Some(tx) = first_tx.take() {
                let first = aggregator.get_current_result().await.map(|result| FirstEvent {
                    result,
                    is_final: true,
                    auth_required: false,
                });
                let _ = tx.send(first);
            }

            debug!(task_id = %task_id, "Event consumption finished");
            state_tx.send_replace(Some(outcome));
        });

        let first = first_rx
            .await
            .map_err(|_| A2AError::internal("Event consumption stopped before producing a result"))??;

        let interrupted = !first.is_final;
        Ok(InterruptResult {
            result: first.result,
            interrupted,
            continue_in_background: interrupted && (!blocking || first.auth_required),
            consumption,
        })
    }

    async fn apply(&self, event: &Event) -> A2AResult<SendMessageResult> {
        if let Event::Message(message) = event {
            *self.message.lock() = Some(message.clone());
            return Ok(SendMessageResult::Message(message.clone()));
        }
        let task = self.task_manager.lock().await.process(event).await?;
        task.map(SendMessageResult::Task)
            .ok_or_else(|| A2AError::internal("Task event produced no task snapshot"))
    }
}
