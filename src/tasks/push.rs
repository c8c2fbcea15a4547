//! Push notification configuration storage and delivery contracts.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

use crate::error::A2AResult;
use crate::models::{PushNotificationConfig, Task};

/// Per-task push notification configurations
///
/// A task may carry several configurations, distinguished by id. A config
/// stored without an id takes the task id as its id.
#[async_trait]
pub trait PushNotificationConfigStore: Send + Sync {
    /// Insert or replace a configuration, returning it with its id assigned
    async fn set_info(
        &self,
        task_id: &str,
        config: PushNotificationConfig,
    ) -> A2AResult<PushNotificationConfig>;

    async fn get_info(&self, task_id: &str) -> A2AResult<Vec<PushNotificationConfig>>;

    async fn delete_info(&self, task_id: &str, config_id: &str) -> A2AResult<()>;
}

/// Delivers a task snapshot to the task's configured endpoints
///
/// Fire-and-forget: delivery failures are the sender's concern.
#[async_trait]
pub trait PushNotificationSender: Send + Sync {
    async fn send_notification(&self, task: &Task);
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryPushNotificationConfigStore {
    configs: Arc<DashMap<String, Vec<PushNotificationConfig>>>,
}

impl InMemoryPushNotificationConfigStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PushNotificationConfigStore for InMemoryPushNotificationConfigStore {
    async fn set_info(
        &self,
        task_id: &str,
        mut config: PushNotificationConfig,
    ) -> A2AResult<PushNotificationConfig> {
        let config_id = config.id.get_or_insert_with(|| task_id.to_string()).clone();
        let mut configs = self.configs.entry(task_id.to_string()).or_default();
        configs.retain(|existing| existing.id.as_deref() != Some(config_id.as_str()));
        configs.push(config.clone());
        debug!(task_id = %task_id, config_id = %config_id, "Stored push notification config");
        Ok(config)
    }

    async fn get_info(&self, task_id: &str) -> A2AResult<Vec<PushNotificationConfig>> {
        Ok(self
            .configs
            .get(task_id)
            .map(|entry| entry.clone())
            .unwrap_or_default())
    }

    async fn delete_info(&self, task_id: &str, config_id: &str) -> A2AResult<()> {
        if let Some(mut configs) = self.configs.get_mut(task_id) {
            configs.retain(|existing| existing.id.as_deref() != Some(config_id));
        }
        self.configs.remove_if(task_id, |_, configs| configs.is_empty());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_config_without_id_uses_task_id() {
        let store = InMemoryPushNotificationConfigStore::new();
        let stored = store
            .set_info("t-1", PushNotificationConfig::new("http://hook"))
            .await
            .unwrap();

        assert_eq!(stored.id.as_deref(), Some("t-1"));
        assert_eq!(store.get_info("t-1").await.unwrap(), vec![stored]);
    }

    #[tokio::test]
    async fn test_multiple_configs_and_replace_by_id() {
        let store = InMemoryPushNotificationConfigStore::new();
        let mut first = PushNotificationConfig::new("http://one");
        first.id = Some("a".to_string());
        let mut second = PushNotificationConfig::new("http://two");
        second.id = Some("b".to_string());
        store.set_info("t-1", first).await.unwrap();
        store.set_info("t-1", second).await.unwrap();

        let mut replacement = PushNotificationConfig::new("http://one-v2");
        replacement.id = Some("a".to_string());
        store.set_info("t-1", replacement).await.unwrap();

        let configs = store.get_info("t-1").await.unwrap();
        assert_eq!(configs.len(), 2);
        assert!(configs.iter().any(|c| c.url == "http://one-v2"));
    }

    #[tokio::test]
    async fn test_delete_removes_only_named_config() {
        let store = InMemoryPushNotificationConfigStore::new();
        store
            .set_info("t-1", PushNotificationConfig::new("http://hook"))
            .await
            .unwrap();
        store.delete_info("t-1", "other").await.unwrap();
        assert_eq!(store.get_info("t-1").await.unwrap().len(), 1);

        store.delete_info("t-1", "t-1").await.unwrap();
        assert!(store.get_info("t-1").await.unwrap().is_empty());
    }
}
