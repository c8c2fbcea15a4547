//! # Task Aggregation and Storage
//!
//! Turns a stream of queue events into persisted task snapshots and decides
//! what a send request returns.
//!
//! - [`task_manager`] - folds events into the canonical `Task`
//! - [`result_aggregator`] - blocking and streaming consumption on top of the manager
//! - [`task_store`] - durable task storage contract and in-memory store
//! - [`push`] - push notification config store and sender contracts

pub mod push;
pub mod result_aggregator;
pub mod task_manager;
pub mod task_store;

pub use push::{
    InMemoryPushNotificationConfigStore, PushNotificationConfigStore, PushNotificationSender,
};
pub use result_aggregator::{ConsumptionHandle, InterruptResult, ResultAggregator};
pub use task_manager::TaskManager;
pub use task_store::{InMemoryTaskStore, TaskStore};
