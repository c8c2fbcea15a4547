//! Queue manager that mirrors queue traffic to other server instances.
//!
//! Every event enqueued locally is handed to a [`ReplicationStrategy`]. Events
//! arriving from other instances are applied with
//! [`ReplicatedQueueManager::on_replicated_event`] and are never sent back out.
//! When a local hub closes and the [`TaskStateProvider`] confirms the task is
//! durably terminal, a [`ReplicatedEvent::QueueClosed`] poison signal tells the
//! other instances to close their replicas.

use async_trait::async_trait;
use dashmap::DashSet;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use super::event_queue::{EventQueue, MainQueue, QueueError, QueueObserver};
use super::queue_manager::{InMemoryQueueManager, QueueManager};
use crate::models::Event;

/// Traffic exchanged between instances
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReplicatedEvent {
    Event { task_id: String, event: Event },
    /// Poison signal: the task is finalized and its queues must close
    QueueClosed { task_id: String },
}

impl ReplicatedEvent {
    pub fn task_id(&self) -> &str {
        match self {
            Self::Event { task_id, .. } | Self::QueueClosed { task_id } => task_id,
        }
    }
}

/// Transport that carries replicated events to other instances
///
/// Called on the producer's path in enqueue order; implementations must not
/// block and should buffer internally.
pub trait ReplicationStrategy: Send + Sync {
    fn send(&self, event: ReplicatedEvent);
}

/// Durable view of task state used to decide when to poison remote queues
#[async_trait]
pub trait TaskStateProvider: Send + Sync {
    async fn is_task_terminal(&self, task_id: &str) -> bool;
}

struct Replicator {
    strategy: Arc<dyn ReplicationStrategy>,
    state_provider: Arc<dyn TaskStateProvider>,
    remote_closes: DashSet<String>,
}

impl QueueObserver for Replicator {
    fn on_enqueue(&self, queue: &MainQueue, event: &Event) {
        self.strategy.send(ReplicatedEvent::Event {
            task_id: queue.task_id().to_string(),
            event: event.clone(),
        });
    }

    fn on_close(&self, queue: &MainQueue) {
        let task_id = queue.task_id().to_string();
        if self.remote_closes.remove(&task_id).is_some() {
            return;
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(task_id = %task_id, "No runtime available, skipping queue close replication");
            return;
        };
        let strategy = Arc::clone(&self.strategy);
        let state_provider = Arc::clone(&self.state_provider);
        runtime.spawn(async move {
            if state_provider.is_task_terminal(&task_id).await {
                debug!(task_id = %task_id, "Replicating queue close for finalized task");
                strategy.send(ReplicatedEvent::QueueClosed { task_id });
            }
        });
    }
}

/// [`QueueManager`] backed by an in-memory registry plus replication
pub struct ReplicatedQueueManager {
    local: InMemoryQueueManager,
    replicator: Arc<Replicator>,
}

impl ReplicatedQueueManager {
    pub fn new(
        strategy: Arc<dyn ReplicationStrategy>,
        state_provider: Arc<dyn TaskStateProvider>,
    ) -> Self {
        let replicator = Arc::new(Replicator {
            strategy,
            state_provider,
            remote_closes: DashSet::new(),
        });
        let local = InMemoryQueueManager::new().with_observer(replicator.clone());
        Self { local, replicator }
    }

    /// Apply an event received from another instance
    ///
    /// Events for tasks with no local queue are dropped: nobody here is
    /// consuming them, and a later resubscribe only sees future events.
    pub async fn on_replicated_event(&self, replicated: ReplicatedEvent) {
        match replicated {
            ReplicatedEvent::Event { task_id, event } => match self.local.get(&task_id).await {
                Some(queue) => queue.enqueue_local(event),
                None => debug!(task_id = %task_id, "No local queue for replicated event"),
            },
            ReplicatedEvent::QueueClosed { task_id } => {
                if let Some(queue) = self.local.get(&task_id).await {
                    self.replicator.remote_closes.insert(task_id.clone());
                    queue.close(false);
                    // Already closed locally: on_close did not consume the marker
                    self.replicator.remote_closes.remove(&task_id);
                    debug!(task_id = %task_id, "Closed queue on remote poison signal");
                }
            }
        }
    }

    pub fn active_queue_count(&self) -> usize {
        self.local.active_queue_count()
    }
}

#[async_trait]
impl QueueManager for ReplicatedQueueManager {
    async fn add(&self, task_id: &str, queue: MainQueue) -> Result<(), QueueError> {
        self.local.add(task_id, queue).await
    }

    async fn get(&self, task_id: &str) -> Option<MainQueue> {
        self.local.get(task_id).await
    }

    async fn tap(&self, task_id: &str) -> Option<EventQueue> {
        self.local.tap(task_id).await
    }

    async fn create_or_tap(&self, task_id: &str) -> Result<EventQueue, QueueError> {
        self.local.create_or_tap(task_id).await
    }

    async fn close(&self, task_id: &str) -> Result<(), QueueError> {
        self.local.close(task_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Message;
    use parking_lot::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingStrategy {
        sent: Mutex<Vec<ReplicatedEvent>>,
    }

    impl ReplicationStrategy for RecordingStrategy {
        fn send(&self, event: ReplicatedEvent) {
            self.sent.lock().push(event);
        }
    }

    struct FixedState(bool);

    #[async_trait]
    impl TaskStateProvider for FixedState {
        async fn is_task_terminal(&self, _task_id: &str) -> bool {
            self.0
        }
    }

    fn manager(terminal: bool) -> (ReplicatedQueueManager, Arc<RecordingStrategy>) {
        let strategy = Arc::new(RecordingStrategy::default());
        let manager = ReplicatedQueueManager::new(strategy.clone(), Arc::new(FixedState(terminal)));
        (manager, strategy)
    }

    #[tokio::test]
    async fn test_local_events_are_replicated() {
        let (manager, strategy) = manager(false);
        let queue = manager.create_or_tap("t-1").await.unwrap();
        queue.enqueue(Message::agent_text("hello"));

        let sent = strategy.sent.lock().clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].task_id(), "t-1");
    }

    #[tokio::test]
    async fn test_inbound_events_are_not_echoed() {
        let (manager, strategy) = manager(false);
        let queue = manager.create_or_tap("t-1").await.unwrap();

        manager
            .on_replicated_event(ReplicatedEvent::Event {
                task_id: "t-1".to_string(),
                event: Message::agent_text("remote").into(),
            })
            .await;

        assert!(queue.dequeue(Duration::ZERO).await.unwrap().is_some());
        assert!(strategy.sent.lock().is_empty());
    }

    #[tokio::test]
    async fn test_poison_sent_when_task_terminal() {
        let (manager, strategy) = manager(true);
        let queue = manager.create_or_tap("t-1").await.unwrap();
        queue.close(false, true);

        tokio::time::timeout(Duration::from_secs(1), async {
            while strategy.sent.lock().is_empty() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();

        assert_eq!(
            strategy.sent.lock()[0],
            ReplicatedEvent::QueueClosed {
                task_id: "t-1".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_remote_poison_closes_local_queue_without_echo() {
        let (manager, strategy) = manager(true);
        let queue = manager.create_or_tap("t-1").await.unwrap();

        manager
            .on_replicated_event(ReplicatedEvent::QueueClosed {
                task_id: "t-1".to_string(),
            })
            .await;
        tokio::task::yield_now().await;

        assert!(queue.is_closed());
        assert_eq!(manager.active_queue_count(), 0);
        assert!(strategy.sent.lock().is_empty());
    }
}
