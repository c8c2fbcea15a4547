//! # Request Handler
//!
//! The control loop behind every exposed operation. [`DefaultRequestHandler`]
//! launches the agent for a send request, tracks it in the running-work
//! registry, decides what a blocking call returns and when, keeps a streaming
//! call's events flowing after the client goes away, and wires resubscribe and
//! cancel into the same per-task queues.
//!
//! ## Lifecycle of one send
//!
//! 1. Setup: resolve ids, record the message on an existing task, register a
//!    queue and spawn the agent.
//! 2. Delivery: blocking or streaming consumption through a [`ResultAggregator`].
//! 3. Cleanup (background): once the agent finishes its registry entry is
//!    released, the main queue is closed gracefully unless another dispatch
//!    still holds the task, and the drain is awaited.

use async_trait::async_trait;
use futures::stream::{BoxStream, Stream, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::agent_executor::{AgentExecutor, RequestContext};
use super::running_work::{spawn_work, BackgroundTasks, RunningWorkRegistry, WorkHandle};
use crate::config::CoreConfig;
use crate::error::{A2AError, A2AResult};
use crate::events::{EventConsumer, EventQueue, MainQueue, QueueManager};
use crate::logging::{log_error, log_queue_operation, log_task_operation};
use crate::models::{
    DeleteTaskPushNotificationConfigParams, Event, GetTaskPushNotificationConfigParams,
    ListTasksParams, ListTasksResult, MessageSendParams, PushNotificationConfig,
    SendMessageResult, Task, TaskIdParams, TaskPushNotificationConfig, TaskQueryParams,
};
use crate::state_machine::TaskState;
use crate::tasks::{
    ConsumptionHandle, PushNotificationConfigStore, PushNotificationSender, ResultAggregator,
    TaskManager, TaskStore,
};

/// Stream of events handed to a streaming caller
pub type EventStream = BoxStream<'static, A2AResult<Event>>;

/// Operations exposed to transport adapters
#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn on_get_task(&self, params: TaskQueryParams) -> A2AResult<Task>;

    async fn on_list_tasks(&self, params: ListTasksParams) -> A2AResult<ListTasksResult>;

    async fn on_cancel_task(&self, params: TaskIdParams) -> A2AResult<Task>;

    async fn on_message_send(&self, params: MessageSendParams) -> A2AResult<SendMessageResult>;

    async fn on_message_send_stream(&self, params: MessageSendParams) -> A2AResult<EventStream>;

    async fn on_resubscribe_to_task(&self, params: TaskIdParams) -> A2AResult<EventStream>;

    async fn on_set_task_push_notification_config(
        &self,
        params: TaskPushNotificationConfig,
    ) -> A2AResult<TaskPushNotificationConfig>;

    async fn on_get_task_push_notification_config(
        &self,
        params: GetTaskPushNotificationConfigParams,
    ) -> A2AResult<TaskPushNotificationConfig>;

    async fn on_list_task_push_notification_config(
        &self,
        params: TaskIdParams,
    ) -> A2AResult<Vec<TaskPushNotificationConfig>>;

    async fn on_delete_task_push_notification_config(
        &self,
        params: DeleteTaskPushNotificationConfigParams,
    ) -> A2AResult<()>;
}

/// Everything a send request needs once setup succeeded
struct SendSetup {
    task_id: String,
    existing_task: bool,
    push_config: Option<PushNotificationConfig>,
    aggregator: ResultAggregator,
    queue: EventQueue,
    work: WorkHandle,
}

/// Orchestrator over pluggable executor, storage and queue backends
#[derive(Clone)]
pub struct DefaultRequestHandler {
    executor: Arc<dyn AgentExecutor>,
    task_store: Arc<dyn TaskStore>,
    queue_manager: Arc<dyn QueueManager>,
    push_config_store: Option<Arc<dyn PushNotificationConfigStore>>,
    push_sender: Option<Arc<dyn PushNotificationSender>>,
    config: CoreConfig,
    running_agents: RunningWorkRegistry,
    background_tasks: BackgroundTasks,
}

impl DefaultRequestHandler {
    pub fn new(
        executor: Arc<dyn AgentExecutor>,
        task_store: Arc<dyn TaskStore>,
        queue_manager: Arc<dyn QueueManager>,
    ) -> Self {
        Self {
            executor,
            task_store,
            queue_manager,
            push_config_store: None,
            push_sender: None,
            config: CoreConfig::default(),
            running_agents: RunningWorkRegistry::new(),
            background_tasks: BackgroundTasks::new(),
        }
    }

    pub fn with_push_config_store(mut self, store: Arc<dyn PushNotificationConfigStore>) -> Self {
        self.push_config_store = Some(store);
        self
    }

    pub fn with_push_sender(mut self, sender: Arc<dyn PushNotificationSender>) -> Self {
        self.push_sender = Some(sender);
        self
    }

    pub fn with_config(mut self, config: CoreConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Agents still registered as running
    pub fn running_agent_count(&self) -> usize {
        self.running_agents.len()
    }

    /// Cleanup and drain tasks still in flight
    pub fn background_task_count(&self) -> usize {
        self.background_tasks.len()
    }

    async fn require_task(&self, task_id: &str) -> A2AResult<Task> {
        self.task_store
            .get(task_id)
            .await?
            .ok_or_else(|| A2AError::task_not_found(task_id))
    }

    fn push_store(&self) -> A2AResult<&Arc<dyn PushNotificationConfigStore>> {
        self.push_config_store
            .as_ref()
            .ok_or(A2AError::PushNotificationNotSupported)
    }

    fn consumer(&self, queue: EventQueue) -> EventConsumer {
        EventConsumer::new(queue).with_poll_interval(self.config.queue.poll_interval())
    }

    async fn store_push_config(&self, task_id: &str, config: &PushNotificationConfig) -> A2AResult<()> {
        if let Some(store) = &self.push_config_store {
            store.set_info(task_id, config.clone()).await?;
        }
        Ok(())
    }

    async fn notify(&self, task: &Task) {
        if let Some(sender) = &self.push_sender {
            sender.send_notification(task).await;
        }
    }

    /// Resolve ids, record the message, register a queue and launch the agent
    async fn setup_message_execution(&self, params: &MessageSendParams) -> A2AResult<SendSetup> {
        let push_config = params.push_notification_config().cloned();
        if push_config.is_some() && self.push_config_store.is_none() {
            return Err(A2AError::UnsupportedOperation(
                "Push notifications are not configured on this server".to_string(),
            ));
        }

        let existing = match &params.message.task_id {
            Some(task_id) => {
                let task = self.require_task(task_id).await?;
                if task.is_terminal() {
                    return Err(A2AError::invalid_arguments(format!(
                        "Task {} is in terminal state: {}",
                        task.id, task.status.state
                    )));
                }
                Some(task)
            }
            None => None,
        };
        let existing_task = existing.is_some();

        let mut context = RequestContext::from_send_params(params, existing.clone())?;
        let initial_message = context.message().cloned();
        let mut task_manager = TaskManager::new(
            params.message.task_id.clone(),
            params.message.context_id.clone(),
            Arc::clone(&self.task_store),
            initial_message.clone(),
        );

        if let (Some(task), Some(message)) = (existing, initial_message) {
            let updated = task_manager.update_with_message(message, task).await?;
            context = context.with_task(updated);
            if let Some(config) = &push_config {
                self.store_push_config(context.task_id(), config).await?;
            }
        }

        let task_id = context.task_id().to_string();
        let reservation = self.running_agents.reserve(&task_id);
        let queue = self.queue_manager.create_or_tap(&task_id).await?;
        log_queue_operation("create_or_tap", &task_id, "main", None);

        let work = spawn_work(Arc::clone(&self.executor), context, queue.clone());
        reservation.commit(work.clone());
        log_task_operation("agent_started", &task_id, None, Some(&work.run_id().to_string()));

        Ok(SendSetup {
            task_id,
            existing_task,
            push_config,
            aggregator: ResultAggregator::new(task_manager, None),
            queue,
            work,
        })
    }

    /// Background bookkeeping once the agent stops
    ///
    /// The main queue is closed only when no newer run for the task holds it.
    fn spawn_cleanup(&self, work: WorkHandle, main: MainQueue, drained: Option<ConsumptionHandle>) {
        let registry = self.running_agents.clone();
        let task_id = work.task_id().to_string();

        let cleanup_task_id = task_id.clone();
        self.background_tasks.spawn("cleanup_producer", &task_id, async move {
            let outcome = work.wait().await;
            if registry.release(&cleanup_task_id, work.run_id(), || main.close(false)) {
                log_queue_operation("close", &cleanup_task_id, "main", Some("agent finished"));
            }

            if let Some(drained) = drained {
                if let Err(error) = drained.wait().await {
                    debug!(task_id = %cleanup_task_id, error = %error, "Event consumption ended with error");
                }
            }

            outcome.map(|_| ())
        });
    }
}

#[async_trait]
impl RequestHandler for DefaultRequestHandler {
    async fn on_get_task(&self, params: TaskQueryParams) -> A2AResult<Task> {
        let task = self.require_task(&params.id).await?;
        Ok(task.with_history_length(params.history_length))
    }

    async fn on_list_tasks(&self, params: ListTasksParams) -> A2AResult<ListTasksResult> {
        self.task_store.list(&params).await
    }

    async fn on_cancel_task(&self, params: TaskIdParams) -> A2AResult<Task> {
        let task = self.require_task(&params.id).await?;
        if task.is_terminal() {
            return Err(A2AError::not_cancelable(
                &task.id,
                format!("Task is in terminal state: {}", task.status.state),
            ));
        }

        let queue = match self.queue_manager.tap(&task.id).await {
            Some(queue) => queue,
            None => EventQueue::standalone(&task.id),
        };

        let aggregator = ResultAggregator::new(
            TaskManager::new(
                Some(task.id.clone()),
                Some(task.context_id.clone()),
                Arc::clone(&self.task_store),
                None,
            ),
            None,
        );

        let task_id = task.id.clone();
        let context = RequestContext::for_task(task).with_metadata(params.metadata);
        self.executor.cancel(context, queue.clone()).await?;

        if let Some(work) = self.running_agents.get(&task_id) {
            work.cancel();
        }

        let timeout = self.config.orchestration.agent_completion_timeout();
        let consumed =
            tokio::time::timeout(timeout, aggregator.consume_all(self.consumer(queue.clone()))).await;
        queue.close(false, true);

        let result = match consumed {
            Ok(result) => result?,
            Err(_) => {
                warn!(task_id = %task_id, timeout_ms = timeout.as_millis() as u64, "Timed out waiting for cancellation");
                aggregator.get_current_result().await?
            }
        };

        match result {
            Some(SendMessageResult::Task(task)) if task.state() == TaskState::Canceled => {
                log_task_operation("cancel", &task.id, Some(task.status.state.as_str()), None);
                Ok(task)
            }
            Some(SendMessageResult::Task(task)) => Err(A2AError::not_cancelable(
                &task.id,
                format!("Task ended in state {}", task.status.state),
            )),
            _ => Err(A2AError::internal("Agent did not return a task for cancel")),
        }
    }

    async fn on_message_send(&self, params: MessageSendParams) -> A2AResult<SendMessageResult> {
        let blocking = params
            .blocking()
            .unwrap_or(self.config.orchestration.default_blocking);
        let setup = self.setup_message_execution(&params).await?;
        let consumer = self
            .consumer(setup.queue.clone())
            .with_error_signal(setup.work.error_signal());

        let interrupt = match setup
            .aggregator
            .consume_and_break_on_interrupt(consumer, blocking)
            .await
        {
            Ok(interrupt) => interrupt,
            Err(error) => {
                self.spawn_cleanup(setup.work.clone(), setup.queue.main().clone(), None);
                return Err(error);
            }
        };
        self.spawn_cleanup(
            setup.work.clone(),
            setup.queue.main().clone(),
            Some(interrupt.consumption.clone()),
        );

        let mut result = interrupt.result;
        if interrupt.interrupted && !interrupt.continue_in_background {
            let agent_timeout = self.config.orchestration.agent_completion_timeout();
            match setup.work.wait_timeout(agent_timeout).await {
                Some(outcome) => {
                    outcome?;
                }
                None => warn!(
                    task_id = %setup.task_id,
                    timeout_ms = agent_timeout.as_millis() as u64,
                    "Timed out waiting for agent to finish"
                ),
            }

            // No more producer output is expected; let this request's drain
            // run to the end without closing the hub other requests may share
            setup.queue.close(false, false);

            let consumption_timeout = self.config.orchestration.consumption_completion_timeout();
            match interrupt.consumption.wait_timeout(consumption_timeout).await {
                Some(outcome) => outcome?,
                None => warn!(
                    task_id = %setup.task_id,
                    timeout_ms = consumption_timeout.as_millis() as u64,
                    "Timed out waiting for event consumption to finish"
                ),
            }
            result = match setup.aggregator.get_current_result().await? {
                Some(SendMessageResult::Message(message)) => Some(SendMessageResult::Message(message)),
                current => self
                    .task_store
                    .get(&setup.task_id)
                    .await?
                    .map(SendMessageResult::Task)
                    .or(current),
            };
        }

        let mut result =
            result.ok_or_else(|| A2AError::internal("Agent did not return any result"))?;

        if let SendMessageResult::Task(task) = &mut result {
            if task.id != setup.task_id {
                log_error(
                    "request_handler",
                    "on_message_send",
                    "task id mismatch",
                    Some(&format!("expected {} got {}", setup.task_id, task.id)),
                );
                return Err(A2AError::internal(format!(
                    "Task id mismatch in agent response: expected {}, got {}",
                    setup.task_id, task.id
                )));
            }
            if !setup.existing_task {
                if let Some(config) = &setup.push_config {
                    self.store_push_config(&task.id, config).await?;
                }
            }
            self.notify(task).await;
            task.truncate_history(params.history_length());
            log_task_operation("message_send", &task.id, Some(task.status.state.as_str()), None);
        }

        Ok(result)
    }

    async fn on_message_send_stream(&self, params: MessageSendParams) -> A2AResult<EventStream> {
        let setup = self.setup_message_execution(&params).await?;
        let consumer = self
            .consumer(setup.queue.clone())
            .with_error_signal(setup.work.error_signal());
        let (done, drained) = ConsumptionHandle::channel();

        let forwarder = StreamForwarder {
            handler: self.clone(),
            task_id: setup.task_id.clone(),
            existing_task: setup.existing_task,
            push_config: setup.push_config.clone(),
            aggregator: setup.aggregator.clone(),
            main: setup.queue.main().clone(),
        };
        let events = setup
            .aggregator
            .consume_and_emit(consumer)
            .then(move |item| {
                let forwarder = forwarder.clone();
                async move {
                    let event = item?;
                    forwarder.forward(&event).await?;
                    Ok(event)
                }
            })
            .boxed();

        self.spawn_cleanup(setup.work, setup.queue.main().clone(), Some(drained));

        Ok(ClientEventStream {
            task_id: setup.task_id,
            inner: Some(events),
            done: Some(done),
            background_tasks: self.background_tasks.clone(),
        }
        .boxed())
    }

    async fn on_resubscribe_to_task(&self, params: TaskIdParams) -> A2AResult<EventStream> {
        let task = self.require_task(&params.id).await?;

        let queue = match self.queue_manager.tap(&task.id).await {
            Some(queue) => queue,
            None if task.is_terminal() => return Err(A2AError::task_not_found(&task.id)),
            None => {
                // Registration was lost; only events enqueued from now on are seen
                debug!(task_id = %task.id, "No queue registered for active task, creating one");
                self.queue_manager.create_or_tap(&task.id).await?
            }
        };

        let aggregator = ResultAggregator::new(
            TaskManager::new(
                Some(task.id.clone()),
                Some(task.context_id.clone()),
                Arc::clone(&self.task_store),
                None,
            ),
            None,
        );

        let mut consumer = self.consumer(queue.clone());
        if let Some(work) = self.running_agents.get(&task.id) {
            consumer = consumer.with_error_signal(work.error_signal());
        }

        log_task_operation("resubscribe", &task.id, Some(task.status.state.as_str()), None);
        Ok(SubscriptionStream {
            inner: aggregator.consume_and_emit(consumer),
            queue,
        }
        .boxed())
    }

    async fn on_set_task_push_notification_config(
        &self,
        params: TaskPushNotificationConfig,
    ) -> A2AResult<TaskPushNotificationConfig> {
        let store = self.push_store()?;
        self.require_task(&params.task_id).await?;

        let config = store
            .set_info(&params.task_id, params.push_notification_config)
            .await?;
        Ok(TaskPushNotificationConfig {
            task_id: params.task_id,
            push_notification_config: config,
        })
    }

    async fn on_get_task_push_notification_config(
        &self,
        params: GetTaskPushNotificationConfigParams,
    ) -> A2AResult<TaskPushNotificationConfig> {
        let store = self.push_store()?;
        self.require_task(&params.id).await?;

        let configs = store.get_info(&params.id).await?;
        let found = match &params.push_notification_config_id {
            Some(config_id) => configs
                .into_iter()
                .find(|config| config.id.as_deref() == Some(config_id.as_str())),
            None => configs.into_iter().next(),
        };

        found
            .map(|config| TaskPushNotificationConfig {
                task_id: params.id.clone(),
                push_notification_config: config,
            })
            .ok_or_else(|| A2AError::PushNotificationConfigNotFound {
                config_id: params
                    .push_notification_config_id
                    .clone()
                    .unwrap_or_else(|| params.id.clone()),
                task_id: params.id.clone(),
            })
    }

    async fn on_list_task_push_notification_config(
        &self,
        params: TaskIdParams,
    ) -> A2AResult<Vec<TaskPushNotificationConfig>> {
        let store = self.push_store()?;
        self.require_task(&params.id).await?;

        Ok(store
            .get_info(&params.id)
            .await?
            .into_iter()
            .map(|config| TaskPushNotificationConfig {
                task_id: params.id.clone(),
                push_notification_config: config,
            })
            .collect())
    }

    async fn on_delete_task_push_notification_config(
        &self,
        params: DeleteTaskPushNotificationConfigParams,
    ) -> A2AResult<()> {
        let store = self.push_store()?;
        self.require_task(&params.id).await?;
        store
            .delete_info(&params.id, &params.push_notification_config_id)
            .await
    }
}

/// Side effects applied to every event of a streaming send
#[derive(Clone)]
struct StreamForwarder {
    handler: DefaultRequestHandler,
    task_id: String,
    existing_task: bool,
    push_config: Option<PushNotificationConfig>,
    aggregator: ResultAggregator,
    main: MainQueue,
}

impl StreamForwarder {
    async fn forward(&self, event: &Event) -> A2AResult<()> {
        if let Event::Task(task) = event {
            if task.id != self.task_id {
                info!(
                    provisional_id = %self.task_id,
                    task_id = %task.id,
                    "Rebinding queue under reported task id"
                );
                if let Err(error) = self.handler.queue_manager.add(&task.id, self.main.clone()).await {
                    warn!(task_id = %task.id, error = %error, "Queue rebinding failed");
                }
            }
            if !self.existing_task {
                if let Some(config) = &self.push_config {
                    self.handler.store_push_config(&task.id, config).await?;
                }
            }
        }

        if self.handler.push_sender.is_some() {
            let snapshot = self.aggregator.task_manager().lock().await.get_task().await?;
            if let Some(task) = snapshot {
                self.handler.notify(&task).await;
            }
        }
        Ok(())
    }
}

/// Event stream of a streaming send
///
/// Dropping it before the end hands the remaining events to a background
/// drain so they are still persisted and forwarded.
struct ClientEventStream {
    task_id: String,
    inner: Option<EventStream>,
    done: Option<watch::Sender<Option<A2AResult<()>>>>,
    background_tasks: BackgroundTasks,
}

impl ClientEventStream {
    fn finish(&mut self, outcome: A2AResult<()>) {
        self.inner = None;
        if let Some(done) = self.done.take() {
            done.send_replace(Some(outcome));
        }
    }
}

impl Stream for ClientEventStream {
    type Item = A2AResult<Event>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let Some(inner) = this.inner.as_mut() else {
            return Poll::Ready(None);
        };
        match inner.poll_next_unpin(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Some(Ok(event))) => Poll::Ready(Some(Ok(event))),
            Poll::Ready(Some(Err(error))) => {
                this.finish(Err(error.clone()));
                Poll::Ready(Some(Err(error)))
            }
            Poll::Ready(None) => {
                this.finish(Ok(()));
                Poll::Ready(None)
            }
        }
    }
}

impl Drop for ClientEventStream {
    fn drop(&mut self) {
        let (Some(mut events), Some(done)) = (self.inner.take(), self.done.take()) else {
            return;
        };
        debug!(task_id = %self.task_id, "Client disconnected, draining events in background");

        self.background_tasks.spawn("stream_drain", &self.task_id, async move {
            let mut outcome = Ok(());
            while let Some(item) = events.next().await {
                if let Err(error) = item {
                    outcome = Err(error);
                    break;
                }
            }
            done.send_replace(Some(outcome.clone()));
            outcome
        });
    }
}

/// Event stream of a resubscription; detaches its queue when dropped
struct SubscriptionStream {
    inner: EventStream,
    queue: EventQueue,
}

impl Stream for SubscriptionStream {
    type Item = A2AResult<Event>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().inner.poll_next_unpin(cx)
    }
}

impl Drop for SubscriptionStream {
    fn drop(&mut self) {
        self.queue.close(false, true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::InMemoryQueueManager;
    use crate::models::{Message, TaskStatus, TaskStatusUpdateEvent};
    use crate::tasks::{InMemoryPushNotificationConfigStore, InMemoryTaskStore};

    struct EchoAgent;

    #[async_trait]
    impl AgentExecutor for EchoAgent {
        async fn execute(&self, context: RequestContext, queue: EventQueue) -> A2AResult<()> {
            let updater = context.updater(queue);
            updater.submit(None)?;
            updater.complete(None)?;
            Ok(())
        }

        async fn cancel(&self, context: RequestContext, queue: EventQueue) -> A2AResult<()> {
            queue.enqueue(TaskStatusUpdateEvent::new(
                context.task_id(),
                context.context_id(),
                TaskStatus::new(TaskState::Canceled),
                true,
            ));
            Ok(())
        }
    }

    fn handler(store: &InMemoryTaskStore) -> DefaultRequestHandler {
        let mut config = CoreConfig::default();
        config.queue.poll_interval_ms = 10;
        DefaultRequestHandler::new(
            Arc::new(EchoAgent),
            Arc::new(store.clone()),
            Arc::new(InMemoryQueueManager::new()),
        )
        .with_config(config)
    }

    #[tokio::test]
    async fn test_get_task_applies_history_length() {
        let store = InMemoryTaskStore::new();
        let history = vec![Message::user_text("a"), Message::user_text("b")];
        store
            .save(Task::new("t-1", "c-1", TaskState::Working).with_history(history))
            .await
            .unwrap();

        let handler = handler(&store);
        let task = handler
            .on_get_task(TaskQueryParams {
                id: "t-1".to_string(),
                history_length: Some(1),
            })
            .await
            .unwrap();

        assert_eq!(task.history.len(), 1);
        assert_eq!(task.history[0].text_content(), "b");
    }

    #[tokio::test]
    async fn test_get_missing_task_is_not_found() {
        let handler = handler(&InMemoryTaskStore::new());
        let err = handler
            .on_get_task(TaskQueryParams::new("missing"))
            .await
            .unwrap_err();
        assert_eq!(err, A2AError::task_not_found("missing"));
    }

    #[tokio::test]
    async fn test_blocking_send_returns_completed_task() {
        let store = InMemoryTaskStore::new();
        let handler = handler(&store);

        let result = handler
            .on_message_send(MessageSendParams::new(Message::user_text("hi")))
            .await
            .unwrap();

        let task = result.as_task().unwrap();
        assert_eq!(task.state(), TaskState::Completed);
        assert_eq!(store.get(&task.id).await.unwrap().unwrap().state(), TaskState::Completed);
    }

    #[tokio::test]
    async fn test_push_config_without_store_is_unsupported() {
        let handler = handler(&InMemoryTaskStore::new());
        let mut params = MessageSendParams::new(Message::user_text("hi"));
        params.configuration = Some(crate::models::MessageSendConfiguration {
            push_notification_config: Some(PushNotificationConfig::new("https://example.test/hook")),
            ..Default::default()
        });

        let err = handler.on_message_send(params).await.unwrap_err();
        assert!(matches!(err, A2AError::UnsupportedOperation(_)));
    }

    #[tokio::test]
    async fn test_push_config_rpcs_require_store() {
        let handler = handler(&InMemoryTaskStore::new());
        let err = handler
            .on_list_task_push_notification_config(TaskIdParams::new("t-1"))
            .await
            .unwrap_err();
        assert_eq!(err, A2AError::PushNotificationNotSupported);
    }

    #[tokio::test]
    async fn test_push_config_round_trip_through_handler() {
        let store = InMemoryTaskStore::new();
        store.save(Task::new("t-1", "c-1", TaskState::Working)).await.unwrap();
        let handler =
            handler(&store).with_push_config_store(Arc::new(InMemoryPushNotificationConfigStore::new()));

        let stored = handler
            .on_set_task_push_notification_config(TaskPushNotificationConfig {
                task_id: "t-1".to_string(),
                push_notification_config: PushNotificationConfig::new("https://example.test/hook"),
            })
            .await
            .unwrap();
        assert_eq!(stored.push_notification_config.id.as_deref(), Some("t-1"));

        let fetched = handler
            .on_get_task_push_notification_config(GetTaskPushNotificationConfigParams {
                id: "t-1".to_string(),
                push_notification_config_id: None,
            })
            .await
            .unwrap();
        assert_eq!(fetched, stored);

        handler
            .on_delete_task_push_notification_config(DeleteTaskPushNotificationConfigParams {
                id: "t-1".to_string(),
                push_notification_config_id: "t-1".to_string(),
            })
            .await
            .unwrap();
        let err = handler
            .on_get_task_push_notification_config(GetTaskPushNotificationConfigParams {
                id: "t-1".to_string(),
                push_notification_config_id: Some("t-1".to_string()),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, A2AError::PushNotificationConfigNotFound { .. }));
    }

    #[tokio::test]
    async fn test_cancel_active_task_without_running_agent() {
        let store = InMemoryTaskStore::new();
        store.save(Task::new("t-1", "c-1", TaskState::Working)).await.unwrap();
        let handler = handler(&store);

        let task = handler.on_cancel_task(TaskIdParams::new("t-1")).await.unwrap();
        assert_eq!(task.state(), TaskState::Canceled);
    }
}
