//! # Event Delivery
//!
//! Per-task event queues, the registry that owns them and the consumer that
//! turns a queue into a stream.
//!
//! - [`event_queue`] - main/child fan-out queues with graceful and immediate close
//! - [`queue_manager`] - `QueueManager` contract and the in-memory registry
//! - [`replicated`] - registry variant that mirrors traffic across instances
//! - [`event_consumer`] - lazy stream over one queue, surfacing producer failures

pub mod event_consumer;
pub mod event_queue;
pub mod queue_manager;
pub mod replicated;

pub use event_consumer::{ErrorSignal, EventConsumer};
pub use event_queue::{EventQueue, MainQueue, QueueError, QueueObserver};
pub use queue_manager::{InMemoryQueueManager, QueueManager};
pub use replicated::{
    ReplicatedEvent, ReplicatedQueueManager, ReplicationStrategy, TaskStateProvider,
};
