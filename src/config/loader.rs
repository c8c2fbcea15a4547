//! Configuration Loader
//!
//! Merges serde defaults, an optional TOML file and `A2A_CORE` environment
//! variables into a validated [`CoreConfig`].

use config::{Config, Environment, File, FileFormat};
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use tracing::debug;

use super::error::{ConfigResult, ConfigurationError};
use super::CoreConfig;
use crate::constants::env as env_vars;

/// Builder for a layered configuration load
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    file: Option<PathBuf>,
    environment: Option<HashMap<String, String>>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read this TOML file instead of consulting `A2A_CORE_CONFIG_PATH`
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Use these variables instead of the process environment
    pub fn with_environment(mut self, variables: HashMap<String, String>) -> Self {
        self.environment = Some(variables);
        self
    }

    /// Load, merge and validate
    pub fn load(&self) -> ConfigResult<CoreConfig> {
        let mut builder = Config::builder();

        if let Some(path) = self.config_file() {
            if !path.exists() {
                return Err(ConfigurationError::ConfigFileNotFound { path });
            }
            debug!(path = %path.display(), "Loading configuration file");
            builder = builder.add_source(File::from(path).format(FileFormat::Toml));
        }

        let environment = Environment::with_prefix(env_vars::ENV_PREFIX)
            .separator(env_vars::ENV_SEPARATOR)
            .try_parsing(true)
            .source(self.environment.clone());
        builder = builder.add_source(environment);

        let config: CoreConfig = builder.build()?.try_deserialize()?;
        config.validate()?;

        debug!(
            agent_completion_timeout_ms = config.orchestration.agent_completion_timeout_ms,
            consumption_completion_timeout_ms = config.orchestration.consumption_completion_timeout_ms,
            poll_interval_ms = config.queue.poll_interval_ms,
            "Configuration loaded"
        );
        Ok(config)
    }

    fn config_file(&self) -> Option<PathBuf> {
        self.file.clone().or_else(|| {
            let from_env = match &self.environment {
                Some(variables) => variables.get(env_vars::CONFIG_PATH).cloned(),
                None => env::var(env_vars::CONFIG_PATH).ok(),
            };
            from_env.filter(|path| !path.is_empty()).map(PathBuf::from)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn toml_file(contents: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_empty_sources_yield_defaults() {
        let config = ConfigLoader::new()
            .with_environment(HashMap::new())
            .load()
            .unwrap();
        assert_eq!(config, CoreConfig::default());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let file = toml_file(
            r#"
            [orchestration]
            agent_completion_timeout_ms = 1000
            default_blocking = false

            [logging]
            json = true
            "#,
        );

        let config = ConfigLoader::new()
            .with_file(file.path())
            .with_environment(HashMap::new())
            .load()
            .unwrap();

        assert_eq!(config.orchestration.agent_completion_timeout_ms, 1000);
        assert!(!config.orchestration.default_blocking);
        assert_eq!(config.orchestration.consumption_completion_timeout_ms, 5_000);
        assert!(config.logging.json);
    }

    #[test]
    fn test_environment_overrides_file() {
        let file = toml_file("[queue]\npoll_interval_ms = 100\n");
        let variables = HashMap::from([(
            "A2A_CORE__QUEUE__POLL_INTERVAL_MS".to_string(),
            "25".to_string(),
        )]);

        let config = ConfigLoader::new()
            .with_file(file.path())
            .with_environment(variables)
            .load()
            .unwrap();

        assert_eq!(config.queue.poll_interval_ms, 25);
    }

    #[test]
    fn test_missing_file_is_reported() {
        let err = ConfigLoader::new()
            .with_file("/nonexistent/a2a-core.toml")
            .with_environment(HashMap::new())
            .load()
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::ConfigFileNotFound { .. }));
    }

    #[test]
    fn test_invalid_values_fail_validation() {
        let file = toml_file("[queue]\npoll_interval_ms = 0\n");
        let err = ConfigLoader::new()
            .with_file(file.path())
            .with_environment(HashMap::new())
            .load()
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidValue { .. }));
    }
}
