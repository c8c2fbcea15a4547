//! Durable task storage contract and its in-memory implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::debug;

use crate::constants::defaults::{LIST_TASKS_MAX_PAGE_SIZE, LIST_TASKS_PAGE_SIZE};
use crate::error::{A2AError, A2AResult};
use crate::models::{ListTasksParams, ListTasksResult, Task};

/// Source of truth for task snapshots
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn get(&self, task_id: &str) -> A2AResult<Option<Task>>;

    /// Insert or replace the snapshot for `task.id`
    async fn save(&self, task: Task) -> A2AResult<()>;

    async fn delete(&self, task_id: &str) -> A2AResult<()>;

    async fn list(&self, params: &ListTasksParams) -> A2AResult<ListTasksResult>;
}

/// Task store backed by a concurrent map
#[derive(Debug, Clone, Default)]
pub struct InMemoryTaskStore {
    tasks: Arc<DashMap<String, Task>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn get(&self, task_id: &str) -> A2AResult<Option<Task>> {
        Ok(self.tasks.get(task_id).map(|entry| entry.clone()))
    }

    async fn save(&self, task: Task) -> A2AResult<()> {
        debug!(task_id = %task.id, state = %task.status.state, "Saving task");
        self.tasks.insert(task.id.clone(), task);
        Ok(())
    }

    async fn delete(&self, task_id: &str) -> A2AResult<()> {
        self.tasks.remove(task_id);
        Ok(())
    }

    async fn list(&self, params: &ListTasksParams) -> A2AResult<ListTasksResult> {
        let page_size = resolve_page_size(params.page_size)?;
        let offset = parse_page_token(params.page_token.as_deref())?;
        let updated_after = params
            .last_updated_after
            .as_deref()
            .map(parse_timestamp)
            .transpose()?;

        let mut matching: Vec<Task> = self
            .tasks
            .iter()
            .filter(|entry| {
                let task = entry.value();
                params
                    .context_id
                    .as_ref()
                    .map_or(true, |context_id| &task.context_id == context_id)
                    && params.status.map_or(true, |state| task.status.state == state)
                    && updated_after.map_or(true, |after| {
                        task.last_updated().is_some_and(|updated| updated > after)
                    })
            })
            .map(|entry| entry.value().clone())
            .collect();

        matching.sort_by(newest_first);

        let total_size = matching.len();
        let tasks: Vec<Task> = matching
            .into_iter()
            .skip(offset)
            .take(page_size)
            .map(|mut task| {
                task.truncate_history(params.history_length);
                if !params.include_artifacts {
                    task.artifacts.clear();
                }
                task
            })
            .collect();

        let next_offset = offset + tasks.len();
        let next_page_token = (next_offset < total_size).then(|| next_offset.to_string());

        Ok(ListTasksResult {
            tasks,
            total_size,
            page_size,
            next_page_token,
        })
    }
}

fn newest_first(a: &Task, b: &Task) -> Ordering {
    b.last_updated()
        .cmp(&a.last_updated())
        .then_with(|| a.id.cmp(&b.id))
}

fn resolve_page_size(page_size: Option<usize>) -> A2AResult<usize> {
    match page_size {
        None => Ok(LIST_TASKS_PAGE_SIZE),
        Some(size) if (1..=LIST_TASKS_MAX_PAGE_SIZE).contains(&size) => Ok(size),
        Some(size) => Err(A2AError::invalid_arguments(format!(
            "pageSize must be between 1 and {LIST_TASKS_MAX_PAGE_SIZE}, got {size}"
        ))),
    }
}

fn parse_page_token(token: Option<&str>) -> A2AResult<usize> {
    match token {
        None | Some("") => Ok(0),
        Some(token) => token
            .parse()
            .map_err(|_| A2AError::invalid_arguments(format!("Invalid page token: {token}"))),
    }
}

fn parse_timestamp(value: &str) -> A2AResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|timestamp| timestamp.with_timezone(&Utc))
        .map_err(|e| {
            A2AError::invalid_arguments(format!("Invalid lastUpdatedAfter timestamp '{value}': {e}"))
        })
}
