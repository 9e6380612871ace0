//! # Controller Configuration
//!
//! Controller-level settings loaded from environment variables.

use std::time::Duration;

/// Controller-level configuration
///
/// The annotation key and endpoint enforcement flag come from the CLI only
/// (see [`crate::cli::Args`]); the watch tuning and logging knobs are read from
/// the environment.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Annotation that marks a Secret as managed by this controller
    pub annotation_key: String,
    /// Skip records whose endpoint pin differs from the configured backend endpoint
    pub enforce_endpoint_check: bool,
    /// Server-side watch timeout (seconds)
    /// The watch stream ends after this long and is re-established
    pub watch_timeout_secs: u32,
    /// Fixed delay before reconnecting the watch stream (seconds)
    pub watch_reconnect_delay_secs: u64,
    /// Global log level (ERROR, WARN, INFO, DEBUG, TRACE)
    pub log_level: String,
    /// Log format (json, text)
    pub log_format: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        use crate::constants::*;
        Self {
            annotation_key: DEFAULT_ANNOTATION_KEY.to_string(),
            enforce_endpoint_check: true,
            watch_timeout_secs: DEFAULT_WATCH_TIMEOUT_SECS,
            watch_reconnect_delay_secs: DEFAULT_WATCH_RECONNECT_DELAY_SECS,
            log_level: "INFO".to_string(),
            log_format: "text".to_string(),
        }
    }
}

impl ControllerConfig {
    /// Load the environment-only settings; CLI-owned fields keep their defaults
    pub fn from_env() -> Self {
        use crate::constants::*;
        Self {
            watch_timeout_secs: env_var_or_default("WATCH_TIMEOUT_SECS", DEFAULT_WATCH_TIMEOUT_SECS),
            watch_reconnect_delay_secs: env_var_or_default(
                "WATCH_RECONNECT_DELAY_SECS",
                DEFAULT_WATCH_RECONNECT_DELAY_SECS,
            ),
            log_level: env_var_or_default_str("LOG_LEVEL", "INFO"),
            log_format: env_var_or_default_str("LOG_FORMAT", "text"),
            ..Self::default()
        }
    }

    /// Get watch timeout duration
    pub fn watch_timeout_duration(&self) -> Duration {
        Duration::from_secs(u64::from(self.watch_timeout_secs))
    }

    /// Get watch reconnect delay duration
    pub fn watch_reconnect_delay_duration(&self) -> Duration {
        Duration::from_secs(self.watch_reconnect_delay_secs)
    }
}

/// HTTP server configuration for the metrics and probe endpoints
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port for `/metrics`, `/healthz` and `/readyz`
    pub metrics_port: u16,
    /// How long to wait for the server to bind (seconds)
    pub startup_timeout_secs: u64,
    /// Poll interval while waiting for the server to bind (milliseconds)
    pub poll_interval_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        use crate::constants::*;
        Self {
            metrics_port: DEFAULT_METRICS_PORT,
            startup_timeout_secs: DEFAULT_SERVER_STARTUP_TIMEOUT_SECS,
            poll_interval_ms: DEFAULT_SERVER_POLL_INTERVAL_MS,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        use crate::constants::*;
        Self {
            metrics_port: env_var_or_default("METRICS_PORT", DEFAULT_METRICS_PORT),
            startup_timeout_secs: env_var_or_default(
                "SERVER_STARTUP_TIMEOUT_SECS",
                DEFAULT_SERVER_STARTUP_TIMEOUT_SECS,
            ),
            poll_interval_ms: env_var_or_default(
                "SERVER_POLL_INTERVAL_MS",
                DEFAULT_SERVER_POLL_INTERVAL_MS,
            ),
        }
    }
}

/// Read environment variable or return default value
fn env_var_or_default<T: std::str::FromStr>(key: &str, default: T) -> T
where
    <T as std::str::FromStr>::Err: std::fmt::Debug,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Interpret the usual truthy spellings of a flag
pub(crate) fn parse_bool_flag(value: &str) -> bool {
    let v_lower = value.trim().to_lowercase();
    v_lower == "true" || v_lower == "1" || v_lower == "yes" || v_lower == "on"
}

/// Read environment variable as string or return default
fn env_var_or_default_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
