//! # Structured Logging Module
//!
//! Environment-aware tracing setup plus helpers that emit the structured
//! "operation" records used across the server core.

use chrono::Utc;
use std::io::IsTerminal;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::LoggingConfig;
use crate::constants::env as env_vars;

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Install the global tracing subscriber once
///
/// The filter comes from `RUST_LOG`, else the configured level, else the
/// environment name. An already-installed global subscriber is left in place.
pub fn init_tracing(config: Option<&LoggingConfig>) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let filter = std::env::var("RUST_LOG")
            .ok()
            .filter(|directive| !directive.is_empty())
            .or_else(|| config.and_then(|c| c.level.clone()))
            .unwrap_or_else(|| get_log_level(&environment).to_string());
        let json = config.is_some_and(|c| c.json);

        let layer = if json {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_ansi(false)
                .json()
                .with_filter(EnvFilter::new(&filter))
                .boxed()
        } else {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_ansi(std::io::stdout().is_terminal())
                .with_filter(EnvFilter::new(&filter))
                .boxed()
        };

        if tracing_subscriber::registry().with(layer).try_init().is_err() {
            tracing::debug!("Global tracing subscriber already initialized - continuing with existing subscriber");
            return;
        }

        tracing::info!(
            environment = %environment,
            filter = %filter,
            json = json,
            "Structured logging initialized"
        );
    });
}

fn get_environment() -> String {
    std::env::var(env_vars::ENVIRONMENT).unwrap_or_else(|_| "development".to_string())
}

fn get_log_level(environment: &str) -> &'static str {
    match environment {
        "production" => "info",
        _ => "debug",
    }
}

/// Log structured data for task operations
pub fn log_task_operation(operation: &str, task_id: &str, state: Option<&str>, details: Option<&str>) {
    tracing::info!(
        operation = %operation,
        task_id = %task_id,
        state = state,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "TASK_OPERATION"
    );
}

/// Log structured data for queue lifecycle operations
pub fn log_queue_operation(operation: &str, task_id: &str, queue_kind: &str, details: Option<&str>) {
    tracing::debug!(
        operation = %operation,
        task_id = %task_id,
        queue_kind = %queue_kind,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "QUEUE_OPERATION"
    );
}

/// Log error with full context
pub fn log_error(component: &str, operation: &str, error: &str, context: Option<&str>) {
    tracing::error!(
        component = %component,
        operation = %operation,
        error = %error,
        context = context,
        timestamp = %Utc::now().to_rfc3339(),
        "ERROR"
    );
}
