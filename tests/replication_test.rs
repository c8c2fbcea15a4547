mod common;

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;

use a2a_core::events::{ReplicatedEvent, ReplicationStrategy, TaskStateProvider};
use a2a_core::{
    DefaultRequestHandler, InMemoryTaskStore, Message, MessageSendParams, ReplicatedQueueManager,
    RequestHandler, TaskState, TaskStore,
};
use common::*;

#[derive(Default)]
struct CollectingStrategy {
    sent: Mutex<Vec<ReplicatedEvent>>,
}

impl ReplicationStrategy for CollectingStrategy {
    fn send(&self, event: ReplicatedEvent) {
        self.sent.lock().push(event);
    }
}

struct StoreStateProvider {
    store: InMemoryTaskStore,
}

#[async_trait]
impl TaskStateProvider for StoreStateProvider {
    async fn is_task_terminal(&self, task_id: &str) -> bool {
        matches!(self.store.get(task_id).await, Ok(Some(task)) if task.is_terminal())
    }
}

#[tokio::test]
async fn test_send_through_replicated_manager_mirrors_traffic() {
    let store = InMemoryTaskStore::new();
    let strategy = Arc::new(CollectingStrategy::default());
    let queue_manager = Arc::new(ReplicatedQueueManager::new(
        strategy.clone(),
        Arc::new(StoreStateProvider {
            store: store.clone(),
        }),
    ));
    let agent = ScriptedAgent::new(vec![Step::SubmitTask, Step::Status(TaskState::Completed)]);
    let handler = DefaultRequestHandler::new(agent, Arc::new(store.clone()), queue_manager)
        .with_config(test_config());

    let task = handler
        .on_message_send(MessageSendParams::new(Message::user_text("mirror")))
        .await
        .unwrap()
        .into_task()
        .unwrap();
    assert_eq!(task.state(), TaskState::Completed);
    wait_for_quiescence(&handler).await;

    let replicated_events = strategy
        .sent
        .lock()
        .iter()
        .filter(|event| matches!(event, ReplicatedEvent::Event { .. }))
        .count();
    assert_eq!(replicated_events, 2);
}
