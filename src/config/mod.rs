//! # Configuration
//!
//! Controller tuning, HTTP server settings and backend connection settings.

mod backend;
mod controller;

pub use backend::BackendConfig;
pub use controller::{ControllerConfig, ServerConfig};
pub(crate) use controller::parse_bool_flag;

/// Errors raised while assembling startup configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// One or more required settings were not supplied (flag or environment)
    #[error("missing required settings: {}", .0.join(", "))]
    MissingSettings(Vec<String>),

    /// A setting was supplied but could not be interpreted
    #[error("invalid value for {setting}: {reason}")]
    InvalidSetting { setting: String, reason: String },
}
