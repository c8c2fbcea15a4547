//! Registry mapping task ids to their main event queue.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::{Arc, Weak};
use tracing::debug;

use super::event_queue::{EventQueue, MainQueue, QueueError, QueueObserver};

/// Registry of per-task queues
///
/// `tap` never creates; `create_or_tap` does. Both hand out children, never
/// the hub itself, so every consumer gets its own buffer.
#[async_trait]
pub trait QueueManager: Send + Sync {
    /// Register a hub under `task_id`; fails if one is already registered
    async fn add(&self, task_id: &str, queue: MainQueue) -> Result<(), QueueError>;

    async fn get(&self, task_id: &str) -> Option<MainQueue>;

    /// Child of an existing queue, or `None` when nothing is registered
    async fn tap(&self, task_id: &str) -> Option<EventQueue>;

    /// Child of the existing queue, creating and registering one if needed
    async fn create_or_tap(&self, task_id: &str) -> Result<EventQueue, QueueError>;

    /// Remove the registration and close the hub immediately
    async fn close(&self, task_id: &str) -> Result<(), QueueError>;
}

/// Removes a hub from the registry once it closes
struct RegistryCleanup {
    queues: Weak<DashMap<String, MainQueue>>,
}

impl QueueObserver for RegistryCleanup {
    fn on_close(&self, queue: &MainQueue) {
        // A hub may be registered under a provisional id and its real id
        if let Some(queues) = self.queues.upgrade() {
            queues.retain(|_, registered| !registered.same_queue(queue));
            debug!(task_id = %queue.task_id(), "Deregistered closed queue");
        }
    }
}

/// Single-process queue manager
#[derive(Clone)]
pub struct InMemoryQueueManager {
    queues: Arc<DashMap<String, MainQueue>>,
    observers: Vec<Arc<dyn QueueObserver>>,
}

impl InMemoryQueueManager {
    pub fn new() -> Self {
        let queues = Arc::new(DashMap::new());
        let cleanup: Arc<dyn QueueObserver> = Arc::new(RegistryCleanup {
            queues: Arc::downgrade(&queues),
        });
        Self {
            queues,
            observers: vec![cleanup],
        }
    }

    /// Attach `observer` to every queue this manager registers from now on
    pub fn with_observer(mut self, observer: Arc<dyn QueueObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Number of registered, still-open queues
    pub fn active_queue_count(&self) -> usize {
        self.queues.len()
    }

    fn watch(&self, queue: &MainQueue) {
        for observer in &self.observers {
            queue.add_observer(Arc::clone(observer));
        }
    }

    fn new_main(&self, task_id: &str) -> MainQueue {
        let queue = MainQueue::new(task_id);
        self.watch(&queue);
        debug!(task_id = %task_id, "Created main queue");
        queue
    }
}

impl Default for InMemoryQueueManager {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QueueManager for InMemoryQueueManager {
    async fn add(&self, task_id: &str, queue: MainQueue) -> Result<(), QueueError> {
        // A hub rebound under a second id already carries this manager's observers
        let already_watched = self
            .queues
            .iter()
            .any(|registered| registered.same_queue(&queue));

        match self.queues.entry(task_id.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(QueueError::AlreadyExists {
                task_id: task_id.to_string(),
            }),
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                if !already_watched {
                    self.watch(&queue);
                }
                entry.insert(queue);
                debug!(task_id = %task_id, "Registered queue");
                Ok(())
            }
        }
    }

    async fn get(&self, task_id: &str) -> Option<MainQueue> {
        self.queues.get(task_id).map(|entry| entry.clone())
    }

    async fn tap(&self, task_id: &str) -> Option<EventQueue> {
        let queue = self.queues.get(task_id).map(|entry| entry.clone())?;
        queue.tap().ok()
    }

    async fn create_or_tap(&self, task_id: &str) -> Result<EventQueue, QueueError> {
        let mut entry = self
            .queues
            .entry(task_id.to_string())
            .or_insert_with(|| self.new_main(task_id));
        if entry.is_closed() {
            *entry = self.new_main(task_id);
        }
        entry.tap()
    }

    async fn close(&self, task_id: &str) -> Result<(), QueueError> {
        let (_, queue) = self
            .queues
            .remove(task_id)
            .ok_or_else(|| QueueError::NotFound {
                task_id: task_id.to_string(),
            })?;
        queue.close(true);
        Ok(())
    }
}
