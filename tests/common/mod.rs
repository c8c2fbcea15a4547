#![allow(dead_code)]

pub mod agents;
pub mod push;
pub mod strategies;

pub use agents::*;
pub use push::*;

use std::sync::Arc;
use std::time::Duration;

use a2a_core::{
    CoreConfig, DefaultRequestHandler, InMemoryQueueManager, InMemoryTaskStore, Task, TaskState,
    TaskStore,
};

/// Handler over in-memory backends with short poll and wait bounds
pub fn test_handler(agent: Arc<ScriptedAgent>, store: &InMemoryTaskStore) -> DefaultRequestHandler {
    DefaultRequestHandler::new(
        agent,
        Arc::new(store.clone()),
        Arc::new(InMemoryQueueManager::new()),
    )
    .with_config(test_config())
}

pub fn test_config() -> CoreConfig {
    let mut config = CoreConfig::default();
    config.queue.poll_interval_ms = 10;
    config.orchestration.agent_completion_timeout_ms = 2_000;
    config.orchestration.consumption_completion_timeout_ms = 2_000;
    config
}

/// Poll the store until the task reaches `state`
pub async fn wait_for_state(store: &InMemoryTaskStore, task_id: &str, state: TaskState) -> Task {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let Some(task) = store.get(task_id).await.unwrap() {
                if task.state() == state {
                    return task;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("task {task_id} never reached {state}"))
}

/// Wait until the handler has no registered agents and no background work
pub async fn wait_for_quiescence(handler: &DefaultRequestHandler) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while handler.running_agent_count() > 0 || handler.background_task_count() > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("handler did not become idle");
}
