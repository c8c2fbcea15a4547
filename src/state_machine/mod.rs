// Task state machine
//
// Lifecycle states of an A2A task, the terminal-state rules and the
// linearized mutation API a unit of work uses to emit status changes.

pub mod errors;
pub mod states;
pub mod task_updater;

pub use errors::{terminal_state_reached, StateMachineError, StateMachineResult};
pub use states::TaskState;
pub use task_updater::TaskUpdater;
