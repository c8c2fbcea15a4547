//! # Event Queue
//!
//! Ordered, closeable event channels scoped to a single task.
//!
//! A [`MainQueue`] is a fan-out hub: it holds no events itself, it copies every
//! enqueued event into the buffer of each of its children. Consumers only ever
//! read from an [`EventQueue`] (a child obtained with [`MainQueue::tap`]), and a
//! producer writing through any child writes to the hub, so every consumer sees
//! the same ordered sequence from the moment it tapped.
//!
//! Two close semantics apply:
//!
//! - `immediate = false` lets consumers drain what is already buffered, then
//!   `dequeue` reports [`QueueError::Closed`].
//! - `immediate = true` discards anything not yet consumed.
//!
//! Closing a child never closes the hub unless the child notifies its parent;
//! the hub then finalizes once its last child is gone, or at once when the
//! close was immediate.

use parking_lot::{Mutex, RwLock};
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{debug, warn};

use crate::error::A2AError;
use crate::models::Event;

/// Errors raised by queues and queue managers
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    #[error("Event queue is closed")]
    Closed,
    #[error("A queue is already registered for task {task_id}")]
    AlreadyExists { task_id: String },
    #[error("No queue registered for task {task_id}")]
    NotFound { task_id: String },
}

impl From<QueueError> for A2AError {
    fn from(error: QueueError) -> Self {
        A2AError::Internal(error.to_string())
    }
}

/// Hook invoked by a main queue as events pass through it and when it closes
///
/// Observers run synchronously on the producer's path and must not block.
pub trait QueueObserver: Send + Sync {
    fn on_enqueue(&self, _queue: &MainQueue, _event: &Event) {}

    fn on_close(&self, _queue: &MainQueue) {}
}

#[derive(Default)]
struct BufferState {
    events: VecDeque<Event>,
    closed: bool,
}

struct ChildBuffer {
    id: u64,
    state: Mutex<BufferState>,
    notify: Notify,
}

impl ChildBuffer {
    fn new(id: u64) -> Self {
        Self {
            id,
            state: Mutex::new(BufferState::default()),
            notify: Notify::new(),
        }
    }

    fn push(&self, event: Event) {
        {
            let mut state = self.state.lock();
            if state.closed {
                return;
            }
            state.events.push_back(event);
        }
        self.notify.notify_waiters();
    }

    fn close(&self, immediate: bool) {
        {
            let mut state = self.state.lock();
            state.closed = true;
            if immediate {
                state.events.clear();
            }
        }
        self.notify.notify_waiters();
    }
}

struct HubState {
    children: Vec<Arc<ChildBuffer>>,
    closed: bool,
}

struct QueueHub {
    task_id: String,
    state: Mutex<HubState>,
    observers: RwLock<Vec<Arc<dyn QueueObserver>>>,
    next_child_id: AtomicU64,
}

/// The fan-out hub for one task's events
#[derive(Clone)]
pub struct MainQueue {
    hub: Arc<QueueHub>,
}

impl MainQueue {
    pub fn new(task_id: impl Into<String>) -> Self {
        Self {
            hub: Arc::new(QueueHub {
                task_id: task_id.into(),
                state: Mutex::new(HubState {
                    children: Vec::new(),
                    closed: false,
                }),
                observers: RwLock::new(Vec::new()),
                next_child_id: AtomicU64::new(1),
            }),
        }
    }

    pub fn task_id(&self) -> &str {
        &self.hub.task_id
    }

    pub fn add_observer(&self, observer: Arc<dyn QueueObserver>) {
        self.hub.observers.write().push(observer);
    }

    /// Append an event to every child; dropped with a warning once closed
    pub fn enqueue(&self, event: impl Into<Event>) {
        let event = event.into();
        if self.publish(&event) {
            for observer in self.observers() {
                observer.on_enqueue(self, &event);
            }
        }
    }

    /// Append an event without notifying observers
    ///
    /// Used to apply events received from another instance, which must not
    /// be replicated back out.
    pub(crate) fn enqueue_local(&self, event: Event) {
        self.publish(&event);
    }

    fn publish(&self, event: &Event) -> bool {
        let state = self.hub.state.lock();
        if state.closed {
            warn!(
                task_id = %self.hub.task_id,
                event_type = event.event_type(),
                "Queue is closed, dropping event"
            );
            return false;
        }
        for child in &state.children {
            child.push(event.clone());
        }
        true
    }

    /// Create a child that receives every event enqueued from now on
    pub fn tap(&self) -> Result<EventQueue, QueueError> {
        let mut state = self.hub.state.lock();
        if state.closed {
            return Err(QueueError::Closed);
        }
        let id = self.hub.next_child_id.fetch_add(1, Ordering::Relaxed);
        let buffer = Arc::new(ChildBuffer::new(id));
        state.children.push(Arc::clone(&buffer));
        Ok(EventQueue {
            main: self.clone(),
            buffer,
        })
    }

    /// Close the hub and every child still attached to it
    ///
    /// Idempotent: only the first call closes children and fires observers.
    pub fn close(&self, immediate: bool) {
        let children = {
            let mut state = self.hub.state.lock();
            if state.closed {
                return;
            }
            state.closed = true;
            std::mem::take(&mut state.children)
        };

        for child in &children {
            child.close(immediate);
        }

        debug!(
            task_id = %self.hub.task_id,
            immediate = immediate,
            children = children.len(),
            "Main queue closed"
        );

        for observer in self.observers() {
            observer.on_close(self);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.hub.state.lock().closed
    }

    /// Number of children still attached
    pub fn child_count(&self) -> usize {
        self.hub.state.lock().children.len()
    }

    /// Whether both handles refer to the same hub
    pub fn same_queue(&self, other: &MainQueue) -> bool {
        Arc::ptr_eq(&self.hub, &other.hub)
    }

    fn child_closing(&self, child_id: u64, immediate: bool) {
        let should_close = {
            let mut state = self.hub.state.lock();
            if state.closed {
                return;
            }
            let before = state.children.len();
            state.children.retain(|child| child.id != child_id);
            if state.children.len() == before {
                return;
            }
            immediate || state.children.is_empty()
        };

        if should_close {
            self.close(immediate);
        }
    }

    fn observers(&self) -> Vec<Arc<dyn QueueObserver>> {
        self.hub.observers.read().clone()
    }
}

impl fmt::Debug for MainQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MainQueue")
            .field("task_id", &self.hub.task_id)
            .field("closed", &self.is_closed())
            .field("children", &self.child_count())
            .finish()
    }
}

/// A consumer's view of a task's events
///
/// Enqueueing through a child writes to the hub, so producers may hold any
/// child handle. Cloning shares the same buffer.
#[derive(Clone)]
pub struct EventQueue {
    main: MainQueue,
    buffer: Arc<ChildBuffer>,
}

impl EventQueue {
    /// A queue with its own hub, not registered with any manager
    pub fn standalone(task_id: impl Into<String>) -> Self {
        let main = MainQueue::new(task_id);
        let buffer = Arc::new(ChildBuffer::new(0));
        main.hub.state.lock().children.push(Arc::clone(&buffer));
        Self { main, buffer }
    }

    pub fn task_id(&self) -> &str {
        self.main.task_id()
    }

    pub fn main(&self) -> &MainQueue {
        &self.main
    }

    pub fn enqueue(&self, event: impl Into<Event>) {
        self.main.enqueue(event);
    }

    /// Remove the head event, waiting up to `timeout` for one to arrive
    ///
    /// A zero timeout never waits. `Ok(None)` means nothing arrived in time;
    /// `Err(QueueError::Closed)` means the queue is closed and drained.
    pub async fn dequeue(&self, timeout: Duration) -> Result<Option<Event>, QueueError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let notified = self.buffer.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.buffer.state.lock();
                if let Some(event) = state.events.pop_front() {
                    return Ok(Some(event));
                }
                if state.closed {
                    return Err(QueueError::Closed);
                }
            }

            if timeout.is_zero() {
                return Ok(None);
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Ok(None);
            }
        }
    }

    /// Close this child
    ///
    /// With `notify_parent` the child detaches from its hub, which closes
    /// when this was its last child or when `immediate` is set.
    pub fn close(&self, immediate: bool, notify_parent: bool) {
        self.buffer.close(immediate);
        if notify_parent {
            self.main.child_closing(self.buffer.id, immediate);
        }
    }

    /// Another child of the same hub
    pub fn tap(&self) -> Result<EventQueue, QueueError> {
        self.main.tap()
    }

    pub fn is_closed(&self) -> bool {
        self.buffer.state.lock().closed
    }

    /// Events buffered and not yet dequeued
    pub fn pending(&self) -> usize {
        self.buffer.state.lock().events.len()
    }
}

impl fmt::Debug for EventQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventQueue")
            .field("task_id", &self.main.task_id())
            .field("child_id", &self.buffer.id)
            .field("closed", &self.is_closed())
            .field("pending", &self.pending())
            .finish()
    }
}
