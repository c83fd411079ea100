//! Client configuration.
//!
//! Defaults match the dashboard: base path `/api`, 10 second timeout.
//! `from_env` lets deployments point the client elsewhere without code
//! changes.

use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_BASE_PATH: &str = "/api";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(10_000);

pub const ENV_BASE_PATH: &str = "PREP_API_BASE";
pub const ENV_TIMEOUT_MS: &str = "PREP_API_TIMEOUT_MS";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be a positive integer of milliseconds, got {value:?}")]
    InvalidTimeout { var: &'static str, value: String },
}

/// Settings shared by every request of an `ApiClient`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Prefix joined to every call path. Trailing slashes are stripped.
    pub base_path: String,
    /// Timeout applied when a call does not override it.
    pub timeout: Duration,
    /// Headers sent with every request, below per-call overrides.
    pub default_headers: Vec<(String, String)>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_path: DEFAULT_BASE_PATH.to_string(),
            timeout: DEFAULT_TIMEOUT,
            default_headers: Vec::new(),
        }
    }
}

impl ClientConfig {
    pub fn new(base_path: &str) -> Self {
        Self {
            base_path: base_path.to_string(),
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.default_headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Reads `PREP_API_BASE` and `PREP_API_TIMEOUT_MS`, falling back to the
    /// defaults for unset variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(base) = lookup(ENV_BASE_PATH) {
            config.base_path = base;
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_MS) {
            let millis = raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|ms| *ms > 0)
                .ok_or_else(|| ConfigError::InvalidTimeout {
                    var: ENV_TIMEOUT_MS,
                    value: raw.clone(),
                })?;
            config.timeout = Duration::from_millis(millis);
        }
        Ok(config)
    }
}
