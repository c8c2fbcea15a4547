//! # Orchestration Engine
//!
//! Runs agents on behalf of remote callers and delivers what they produce.
//!
//! ## Core Components
//!
//! - **AgentExecutor**: the embedding application's unit of work, driven through a [`RequestContext`]
//! - **WorkHandle / RunningWorkRegistry**: supervised, cancelable agent runs keyed by task id
//! - **BackgroundTasks**: detached cleanup and drain tasks tracked until they finish
//! - **DefaultRequestHandler**: the control loop behind send, stream, cancel, resubscribe and push config

pub mod agent_executor;
pub mod request_handler;
pub mod running_work;

pub use agent_executor::{AgentExecutor, RequestContext};
pub use request_handler::{DefaultRequestHandler, EventStream, RequestHandler};
pub use running_work::{
    spawn_work, BackgroundTasks, DispatchReservation, RunningWorkRegistry, WorkHandle, WorkOutcome,
};
