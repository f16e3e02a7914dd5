//! Runtime configuration for task execution.
//!
//! Autosave and the acting user are passed to the pipeline explicitly rather
//! than read from global state.

use thiserror::Error;

/// Environment variable enabling automatic persistence of runs.
pub const ENV_AUTOSAVE_RUNS: &str = "TASK_FORGE_AUTOSAVE_RUNS";

/// Environment variable naming the acting user.
pub const ENV_USER_ID: &str = "TASK_FORGE_USER_ID";

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable has an invalid value.
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Process-level settings read by the execution pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Whether completed runs are saved when the task has a durable location.
    pub autosave_runs: bool,
    /// Identity recorded on human data sources created by default.
    pub user_id: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            autosave_runs: true,
            user_id: "unknown".to_string(),
        }
    }
}

impl RuntimeConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `TASK_FORGE_AUTOSAVE_RUNS`: Save runs automatically (default: true)
    /// - `TASK_FORGE_USER_ID`: Acting user (default: `$USER`, then "unknown")
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an unparseable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(val) = std::env::var(ENV_AUTOSAVE_RUNS) {
            config.autosave_runs = parse_env_bool(&val, ENV_AUTOSAVE_RUNS)?;
        }

        if let Some(user) = std::env::var(ENV_USER_ID)
            .ok()
            .or_else(|| std::env::var("USER").ok())
            .filter(|u| !u.trim().is_empty())
        {
            config.user_id = user;
        }

        Ok(config)
    }

    /// Sets whether runs are saved automatically.
    pub fn with_autosave_runs(mut self, autosave: bool) -> Self {
        self.autosave_runs = autosave;
        self
    }

    /// Sets the acting user.
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self
    }
}

/// Per-adapter options that do not change what the model produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterConfig {
    /// When false, runs are never persisted by this adapter.
    pub allow_saving: bool,
    /// Number of top log-probabilities to request, if any.
    pub top_logprobs: Option<u32>,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            allow_saving: true,
            top_logprobs: None,
        }
    }
}

impl AdapterConfig {
    pub fn with_allow_saving(mut self, allow: bool) -> Self {
        self.allow_saving = allow;
        self
    }

    pub fn with_top_logprobs(mut self, top_logprobs: u32) -> Self {
        self.top_logprobs = Some(top_logprobs);
        self
    }
}

/// Parse an environment variable as a boolean.
fn parse_env_bool(value: &str, key: &str) -> Result<bool, ConfigError> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected boolean value, got '{}'", value),
        }),
    }
}
