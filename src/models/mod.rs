//! # Protocol Data Model
//!
//! Task, message, artifact and event types exchanged between the unit of
//! work, the event queues and the request handler.
//!
//! - [`task`] - the durable `Task` record and its `TaskStatus`
//! - [`message`] - messages, parts and artifacts
//! - [`events`] - the `Event` union placed on event queues
//! - [`params`] - request parameters and response shapes of the handler surface

pub mod events;
pub mod message;
pub mod params;
pub mod task;

pub use events::{Event, TaskArtifactUpdateEvent, TaskStatusUpdateEvent};
pub use message::{Artifact, FileContent, Message, Part, Role};
pub use params::{
    DeleteTaskPushNotificationConfigParams, GetTaskPushNotificationConfigParams,
    ListTasksParams, ListTasksResult, MessageSendConfiguration, MessageSendParams,
    PushNotificationAuthenticationInfo, PushNotificationConfig, SendMessageResult, TaskIdParams,
    TaskPushNotificationConfig, TaskQueryParams,
};
pub use task::{Task, TaskStatus};
