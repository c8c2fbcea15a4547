#![allow(clippy::doc_markdown)] // Allow technical terms like JSON-RPC, gRPC in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # A2A Core
//!
//! Execution and event-delivery core for agent-to-agent (A2A) protocol servers.
//!
//! ## Overview
//!
//! A remote caller sends a message; the core runs the agent's unit of work for
//! the resulting task, captures every status change and artifact it produces
//! as a stream of events, and delivers that stream either as a single blocking
//! result or as a live event stream that keeps being consumed and persisted
//! after the caller disconnects.
//!
//! ## Module Organization
//!
//! - [`models`] - Protocol data types: tasks, messages, events, request params
//! - [`state_machine`] - Task states and the terminal-protected [`TaskUpdater`]
//! - [`events`] - Per-task fan-out queues, queue managers and the event consumer
//! - [`tasks`] - Task aggregation, task storage and push notification contracts
//! - [`orchestration`] - Agent contract, running-work tracking and the request handler
//! - [`config`] - Layered configuration
//! - [`logging`] - Tracing setup and structured operation logging
//! - [`error`] - Structured error handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use a2a_core::{
//!     A2AResult, AgentExecutor, DefaultRequestHandler, EventQueue, InMemoryQueueManager,
//!     InMemoryTaskStore, Message, MessageSendParams, RequestContext, RequestHandler,
//! };
//!
//! struct Echo;
//!
//! #[async_trait]
//! impl AgentExecutor for Echo {
//!     async fn execute(&self, context: RequestContext, queue: EventQueue) -> A2AResult<()> {
//!         let updater = context.updater(queue);
//!         updater.complete(Some(updater.new_agent_message(
//!             vec![a2a_core::Part::text(context.user_input())],
//!             Default::default(),
//!         )))?;
//!         Ok(())
//!     }
//!
//!     async fn cancel(&self, context: RequestContext, queue: EventQueue) -> A2AResult<()> {
//!         context.updater(queue).cancel(None)?;
//!         Ok(())
//!     }
//! }
//!
//! # async fn example() -> A2AResult<()> {
//! let handler = DefaultRequestHandler::new(
//!     Arc::new(Echo),
//!     Arc::new(InMemoryTaskStore::new()),
//!     Arc::new(InMemoryQueueManager::new()),
//! );
//! let result = handler
//!     .on_message_send(MessageSendParams::new(Message::user_text("hello")))
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod logging;
pub mod models;
pub mod orchestration;
pub mod state_machine;
pub mod tasks;

pub use config::{ConfigLoader, CoreConfig};
pub use error::{A2AError, A2AResult};
pub use events::{
    EventConsumer, EventQueue, InMemoryQueueManager, MainQueue, QueueManager,
    ReplicatedQueueManager,
};
pub use models::{
    Artifact, Event, Message, MessageSendParams, Part, Role, SendMessageResult, Task,
    TaskArtifactUpdateEvent, TaskStatus, TaskStatusUpdateEvent,
};
pub use orchestration::{
    AgentExecutor, DefaultRequestHandler, EventStream, RequestContext, RequestHandler,
};
pub use state_machine::{TaskState, TaskUpdater};
pub use tasks::{
    InMemoryPushNotificationConfigStore, InMemoryTaskStore, PushNotificationConfigStore,
    PushNotificationSender, TaskStore,
};
