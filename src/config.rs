//! Configuration System
//!
//! Explicit, layered configuration for a generation session: remote service access,
//! retry and polling budgets, pacing, output locations and logging. Sources are merged
//! by [`ConfigLoader`]; the resulting [`BatchConfig`] is handed to the session rather
//! than read from ambient state.

use crate::error::ApiError;
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub use crate::generation::retry::RetryPolicy;
pub use crate::generation::strategy::{PollPolicy, StrategyKind};

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;

pub const DEFAULT_BASE_URL: &str = "https://api.pixellab.ai/v1";
pub const API_KEY_ENV: &str = "PIXELLAB_API_KEY";

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchConfig {
    #[serde(default)]
    pub service: ServiceConfig,

    #[serde(default)]
    pub retry: RetryPolicy,

    #[serde(default)]
    pub polling: PollPolicy,

    #[serde(default)]
    pub pacing: PacingConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Remote image service access
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Bearer token; falls back to `PIXELLAB_API_KEY` when unset.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    /// Strategy used for every item of a session
    #[serde(default)]
    pub strategy: StrategyKind,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Per-call timeout; no request may wait longer than this
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_request_timeout_ms() -> u64 {
    60_000
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            strategy: StrategyKind::default(),
            connect_timeout_ms: default_connect_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl ServiceConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| std::env::var(API_KEY_ENV).ok().filter(|k| !k.trim().is_empty()))
    }
}

/// Courtesy delay between consecutive items
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacingConfig {
    #[serde(default = "default_pacing_delay_ms")]
    pub delay_ms: u64,
}

fn default_pacing_delay_ms() -> u64 {
    2_000
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            delay_ms: default_pacing_delay_ms(),
        }
    }
}

impl PacingConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// Where generated files and session records land
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_records_dir")]
    pub records_dir: PathBuf,

    #[serde(default = "default_extension")]
    pub extension: String,
}

fn default_records_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_extension() -> String {
    "png".to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            records_dir: default_records_dir(),
            extension: default_extension(),
        }
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Service(String),
    Retry(String),
    Polling(String),
    Output(String),
    Logging(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Service(msg) => write!(f, "service: {}", msg),
            ValidationError::Retry(msg) => write!(f, "retry: {}", msg),
            ValidationError::Polling(msg) => write!(f, "polling: {}", msg),
            ValidationError::Output(msg) => write!(f, "output: {}", msg),
            ValidationError::Logging(msg) => write!(f, "logging: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl BatchConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        let base_url = self.service.base_url.trim();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            errors.push(ValidationError::Service(format!(
                "base_url must be an http(s) URL, got '{}'",
                self.service.base_url
            )));
        }
        if self.service.request_timeout_ms == 0 {
            errors.push(ValidationError::Service(
                "request_timeout_ms must be greater than zero".to_string(),
            ));
        }

        if self.retry.max_attempts == 0 {
            errors.push(ValidationError::Retry(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if self.retry.multiplier == 0 {
            errors.push(ValidationError::Retry(
                "multiplier must be at least 1".to_string(),
            ));
        }

        if self.polling.interval_ms == 0 {
            errors.push(ValidationError::Polling(
                "interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.polling.timeout_ms < self.polling.interval_ms {
            errors.push(ValidationError::Polling(format!(
                "timeout_ms ({}) must not be shorter than interval_ms ({})",
                self.polling.timeout_ms, self.polling.interval_ms
            )));
        }

        let extension = self.output.extension.trim();
        if extension.is_empty() || extension.contains(['/', '\\', '.']) {
            errors.push(ValidationError::Output(format!(
                "extension must be a bare file extension, got '{}'",
                self.output.extension
            )));
        }

        if let Err(e) = crate::logging::validate_logging_config(&self.logging) {
            errors.push(ValidationError::Logging(e.to_string()));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validate and fold all problems into one error.
    pub fn ensure_valid(&self) -> Result<(), ApiError> {
        self.validate().map_err(|errors| {
            let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            ApiError::ConfigError(format!(
                "Configuration validation failed:\n{}",
                messages.join("\n")
            ))
        })
    }

    /// Effective configuration rendered as TOML (secrets omitted).
    pub fn to_toml(&self) -> Result<String, ApiError> {
        toml::to_string_pretty(self)
            .map_err(|e| ApiError::ConfigError(format!("Failed to render config: {}", e)))
    }
}
