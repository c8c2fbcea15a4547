use futures::stream::{self, BoxStream, StreamExt};
use std::time::Duration;
use tokio::sync::watch;
use tracing::debug;

use super::event_queue::{EventQueue, QueueError};
use crate::constants::defaults;
use crate::error::{A2AError, A2AResult};
use crate::models::Event;

/// Receiver side of a unit of work's failure signal
pub type ErrorSignal = watch::Receiver<Option<A2AError>>;

/// Drains one event queue as a lazy stream
///
/// The stream ends when the queue closes, or right after a final event (the
/// consumer then closes its queue and notifies the parent). A failure recorded
/// against the producing work is yielded as the stream's last item, even if
/// the failure happened before consumption started.
pub struct EventConsumer {
    queue: EventQueue,
    poll_interval: Duration,
    error_signal: Option<ErrorSignal>,
}

impl EventConsumer {
    pub fn new(queue: EventQueue) -> Self {
        Self {
            queue,
            poll_interval: defaults::queue_poll_interval(),
            error_signal: None,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Surface failures of the producing work through this consumer
    pub fn with_error_signal(mut self, error_signal: ErrorSignal) -> Self {
        self.error_signal = Some(error_signal);
        self
    }

    pub fn queue(&self) -> &EventQueue {
        &self.queue
    }

    /// Every event until the queue closes or a final event arrives
    pub fn consume_all(self) -> BoxStream<'static, A2AResult<Event>> {
        stream::unfold(Some(self), |state| async move {
            let mut consumer = state?;
            loop {
                if let Some(error) = consumer.producer_error() {
                    debug!(task_id = %consumer.queue.task_id(), error = %error, "Producer failed");
                    return Some((Err(error), None));
                }

                let dequeued = tokio::select! {
                    result = consumer.queue.dequeue(consumer.poll_interval) => result,
                    _ = producer_failed(&mut consumer.error_signal) => continue,
                };

                match dequeued {
                    Ok(Some(event)) => {
                        if event.is_final() {
                            debug!(
                                task_id = %consumer.queue.task_id(),
                                event_type = event.event_type(),
                                "Final event consumed, closing queue"
                            );
                            consumer.queue.close(false, true);
                            return Some((Ok(event), None));
                        }
                        return Some((Ok(event), Some(consumer)));
                    }
                    Ok(None) => continue,
                    Err(QueueError::Closed) => {
                        return consumer.producer_error().map(|error| (Err(error), None));
                    }
                    Err(error) => return Some((Err(error.into()), None)),
                }
            }
        })
        .boxed()
    }

    fn producer_error(&self) -> Option<A2AError> {
        self.error_signal
            .as_ref()
            .and_then(|signal| signal.borrow().clone())
    }
}

/// Resolves once a failure is recorded; never resolves without a live signal
async fn producer_failed(signal: &mut Option<ErrorSignal>) {
    let Some(receiver) = signal.as_mut() else {
        return std::future::pending().await;
    };
    if receiver.wait_for(Option::is_some).await.is_ok() {
        return;
    }
    *signal = None;
    std::future::pending().await
}
