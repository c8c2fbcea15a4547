use async_trait::async_trait;
use parking_lot::Mutex;

use a2a_core::{PushNotificationSender, Task, TaskState};

/// Push sender that records every snapshot it is asked to deliver
#[derive(Default)]
pub struct RecordingPushSender {
    sent: Mutex<Vec<Task>>,
}

impl RecordingPushSender {
    pub fn sent(&self) -> Vec<Task> {
        self.sent.lock().clone()
    }

    pub fn states(&self) -> Vec<TaskState> {
        self.sent.lock().iter().map(Task::state).collect()
    }
}

#[async_trait]
impl PushNotificationSender for RecordingPushSender {
    async fn send_notification(&self, task: &Task) {
        self.sent.lock().push(task.clone());
    }
}
