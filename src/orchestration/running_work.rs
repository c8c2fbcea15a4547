//! Handles and registries for work running on the tokio pool.
//!
//! [`spawn_work`] launches a unit of work under a supervisor task that records
//! how it ended and broadcasts failures to the work's consumers.
//! [`RunningWorkRegistry`] maps task ids to the in-flight handle, and
//! [`BackgroundTasks`] tracks detached bookkeeping tasks until they finish.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::AbortHandle;
use tracing::{debug, error, warn};
use uuid::Uuid;

use super::agent_executor::{AgentExecutor, RequestContext};
use crate::error::{A2AError, A2AResult};
use crate::events::{ErrorSignal, EventQueue};

/// How a unit of work ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkOutcome {
    Running,
    Succeeded,
    Failed(A2AError),
    Cancelled,
}

impl WorkOutcome {
    pub fn is_finished(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

/// Awaitable, cancelable handle to one running unit of work
#[derive(Debug, Clone)]
pub struct WorkHandle {
    run_id: Uuid,
    task_id: String,
    abort: AbortHandle,
    outcome: watch::Receiver<WorkOutcome>,
    error_signal: ErrorSignal,
}

impl WorkHandle {
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// Failure signal for consumers of this work's queue
    pub fn error_signal(&self) -> ErrorSignal {
        self.error_signal.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.outcome.borrow().is_finished()
    }

    /// Abort the work; a no-op once it has finished
    pub fn cancel(&self) {
        if !self.is_finished() {
            debug!(task_id = %self.task_id, run_id = %self.run_id, "Aborting running work");
            self.abort.abort();
        }
    }

    /// Wait for the work to end
    ///
    /// Fails with an internal error if the supervisor vanished without
    /// recording an outcome.
    pub async fn wait(&self) -> A2AResult<WorkOutcome> {
        let mut outcome = self.outcome.clone();
        let finished = outcome
            .wait_for(WorkOutcome::is_finished)
            .await
            .map_err(|_| A2AError::internal("Wait for agent completion was interrupted"))?;
        Ok(finished.clone())
    }

    /// Wait at most `timeout`; `None` when the work is still running
    pub async fn wait_timeout(&self, timeout: Duration) -> Option<A2AResult<WorkOutcome>> {
        tokio::time::timeout(timeout, self.wait()).await.ok()
    }
}

/// Launch `executor.execute` for `context` on the tokio pool
pub fn spawn_work(
    executor: Arc<dyn AgentExecutor>,
    context: RequestContext,
    queue: EventQueue,
) -> WorkHandle {
    let task_id = context.task_id().to_string();
    let run_id = Uuid::new_v4();
    let (outcome_tx, outcome_rx) = watch::channel(WorkOutcome::Running);
    let (error_tx, error_rx) = watch::channel(None);

    let work = tokio::spawn(async move { executor.execute(context, queue).await });
    let abort = work.abort_handle();

    let supervised_task_id = task_id.clone();
    tokio::spawn(async move {
        let outcome = match work.await {
            Ok(Ok(())) => WorkOutcome::Succeeded,
            Ok(Err(failure)) => WorkOutcome::Failed(failure),
            Err(join_error) if join_error.is_cancelled() => WorkOutcome::Cancelled,
            Err(join_error) => {
                WorkOutcome::Failed(A2AError::AgentExecution(format!("Agent panicked: {join_error}")))
            }
        };

        match &outcome {
            WorkOutcome::Failed(failure) => {
                warn!(task_id = %supervised_task_id, run_id = %run_id, error = %failure, "Agent execution failed");
                error_tx.send_replace(Some(failure.clone()));
            }
            WorkOutcome::Cancelled => {
                debug!(task_id = %supervised_task_id, run_id = %run_id, "Agent execution cancelled");
            }
            _ => debug!(task_id = %supervised_task_id, run_id = %run_id, "Agent execution finished"),
        }
        outcome_tx.send_replace(outcome);
    });

    WorkHandle {
        run_id,
        task_id,
        abort,
        outcome: outcome_rx,
        error_signal: error_rx,
    }
}

/// In-flight work plus dispatches still being set up for one task
#[derive(Debug, Default)]
struct TaskSlot {
    work: Option<WorkHandle>,
    pending: usize,
}

impl TaskSlot {
    fn is_idle(&self) -> bool {
        self.work.is_none() && self.pending == 0
    }
}

/// Task id to in-flight work
///
/// A dispatch reserves the task's slot before it touches the task's queue and
/// commits its handle once the work is spawned. Releasing a finished run and
/// deciding the task is idle happen under the same slot lock, so a dispatch
/// that has reserved can never have its queue closed underneath it.
#[derive(Debug, Clone, Default)]
pub struct RunningWorkRegistry {
    running: Arc<DashMap<String, TaskSlot>>,
}

impl RunningWorkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold the task's slot open until the dispatch commits or is dropped
    pub fn reserve(&self, task_id: &str) -> DispatchReservation {
        self.running.entry(task_id.to_string()).or_default().pending += 1;
        DispatchReservation {
            registry: self.clone(),
            task_id: task_id.to_string(),
            settled: false,
        }
    }

    pub fn get(&self, task_id: &str) -> Option<WorkHandle> {
        self.running
            .get(task_id)
            .and_then(|slot| slot.work.clone())
    }

    /// Drop `run_id` from the task's slot and run `on_idle` if nothing else
    /// holds the task
    ///
    /// A newer run or an outstanding reservation keeps the slot busy. Returns
    /// whether `on_idle` ran.
    pub fn release<F>(&self, task_id: &str, run_id: Uuid, on_idle: F) -> bool
    where
        F: FnOnce(),
    {
        match self.running.entry(task_id.to_string()) {
            Entry::Occupied(mut entry) => {
                let slot = entry.get_mut();
                if slot.work.as_ref().is_some_and(|work| work.run_id() == run_id) {
                    slot.work = None;
                }
                if !slot.is_idle() {
                    debug!(task_id = %task_id, run_id = %run_id, "Task still in use, keeping queue open");
                    return false;
                }
                on_idle();
                entry.remove();
                true
            }
            Entry::Vacant(_guard) => {
                on_idle();
                true
            }
        }
    }

    /// Number of tasks with work in flight
    pub fn len(&self) -> usize {
        self.running.iter().filter(|slot| slot.work.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn settle(&self, task_id: &str, handle: Option<WorkHandle>) {
        let Entry::Occupied(mut entry) = self.running.entry(task_id.to_string()) else {
            return;
        };
        let slot = entry.get_mut();
        slot.pending = slot.pending.saturating_sub(1);
        if let Some(handle) = handle {
            if let Some(previous) = slot.work.replace(handle) {
                if !previous.is_finished() {
                    warn!(
                        task_id = %task_id,
                        previous_run = %previous.run_id(),
                        "Overlapping agent invocation for task"
                    );
                }
            }
        }
        if slot.is_idle() {
            entry.remove();
        }
    }
}

/// A dispatch's claim on a task slot
///
/// Dropping it without [`commit`](Self::commit) gives the claim back.
#[derive(Debug)]
pub struct DispatchReservation {
    registry: RunningWorkRegistry,
    task_id: String,
    settled: bool,
}

impl DispatchReservation {
    /// Record `handle` as the task's work
    ///
    /// A still-running predecessor is replaced, with a warning, and keeps
    /// running.
    pub fn commit(mut self, handle: WorkHandle) {
        self.settled = true;
        self.registry.settle(&self.task_id, Some(handle));
    }
}

impl Drop for DispatchReservation {
    fn drop(&mut self) {
        if !self.settled {
            self.registry.settle(&self.task_id, None);
        }
    }
}

/// Detached bookkeeping tasks, tracked until they finish
#[derive(Debug, Clone, Default)]
pub struct BackgroundTasks {
    tasks: Arc<DashMap<Uuid, AbortHandle>>,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `future` and track it until it completes
    ///
    /// Failures are logged at error level; cancellation at debug level.
    /// Returns `false` when no tokio runtime is available.
    pub fn spawn<F>(&self, label: &'static str, task_id: &str, future: F) -> bool
    where
        F: Future<Output = A2AResult<()>> + Send + 'static,
    {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(task = label, task_id = %task_id, "No tokio runtime, background task not started");
            return false;
        };

        let id = Uuid::new_v4();
        let inner = runtime.spawn(future);
        self.tasks.insert(id, inner.abort_handle());

        let tasks = Arc::clone(&self.tasks);
        let task_id = task_id.to_string();
        runtime.spawn(async move {
            match inner.await {
                Ok(Ok(())) => debug!(task = label, task_id = %task_id, "Background task finished"),
                Ok(Err(failure)) => {
                    error!(task = label, task_id = %task_id, error = %failure, "Background task failed")
                }
                Err(join_error) if join_error.is_cancelled() => {
                    debug!(task = label, task_id = %task_id, "Background task cancelled")
                }
                Err(join_error) => {
                    error!(task = label, task_id = %task_id, error = %join_error, "Background task panicked")
                }
            }
            tasks.remove(&id);
        });
        true
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
