//! # Command Line
//!
//! Flags for the controller binary. Every flag falls back to an environment
//! variable so the controller can be configured entirely from a Deployment
//! manifest.
//!
//! ```bash
//! s3-resource-controller \
//!     --s3-endpoint-url http://versitygw:7070 \
//!     --root-access-key admin --root-secret-key "$ROOT_SECRET_KEY"
//!
//! # verify credentials and exit
//! s3-resource-controller --check-connection
//!
//! # reconcile existing secrets once and exit
//! s3-resource-controller --sync-once
//! ```

use std::path::PathBuf;

use clap::{ArgAction, Parser};

use crate::backend::BackendKind;
use crate::config::{parse_bool_flag, BackendConfig, ConfigError, ControllerConfig, ServerConfig};
use crate::constants::{DEFAULT_ANNOTATION_KEY, DEFAULT_BACKEND_NAME, DEFAULT_METRICS_PORT};

/// Provision S3 buckets and users from annotated Kubernetes Secrets
#[derive(Parser, Debug, Clone)]
#[command(name = "s3-resource-controller", version, about, long_about = None)]
pub struct Args {
    /// Path to a kubeconfig file (defaults to in-cluster config or ~/.kube/config)
    #[arg(long, env = "KUBECONFIG")]
    pub kubeconfig: Option<PathBuf>,

    /// Port for metrics and health endpoints
    #[arg(long, env = "METRICS_PORT", default_value_t = DEFAULT_METRICS_PORT)]
    pub metrics_port: u16,

    /// Annotation that opts a Secret into reconciliation
    #[arg(long, env = "ANNOTATION_KEY", default_value = DEFAULT_ANNOTATION_KEY)]
    pub annotation_key: String,

    /// S3 endpoint URL of the backend
    #[arg(long, env = "S3_ENDPOINT_URL")]
    pub s3_endpoint_url: Option<String>,

    /// Root access key for the backend
    #[arg(long, env = "ROOT_ACCESS_KEY", hide_env_values = true)]
    pub root_access_key: Option<String>,

    /// Root secret key for the backend
    #[arg(long, env = "ROOT_SECRET_KEY", hide_env_values = true)]
    pub root_secret_key: Option<String>,

    /// Backend type (versitygw, minio, garage)
    #[arg(long, env = "BACKEND_NAME", default_value = DEFAULT_BACKEND_NAME)]
    pub backend_name: String,

    /// Skip secrets whose endpoint URL does not match --s3-endpoint-url
    #[arg(
        long,
        env = "ENFORCE_ENDPOINT_CHECK",
        default_value = "true",
        action = ArgAction::Set,
        value_parser = parse_flag
    )]
    pub enforce_endpoint_check: bool,

    /// Verify the backend connection and exit
    #[arg(long)]
    pub check_connection: bool,

    /// Reconcile existing secrets once and exit without watching
    #[arg(long)]
    pub sync_once: bool,
}

fn parse_flag(value: &str) -> Result<bool, String> {
    match value.trim().to_lowercase().as_str() {
        "false" | "0" | "no" | "off" => Ok(false),
        other if parse_bool_flag(other) => Ok(true),
        other => Err(format!("expected true or false, got '{other}'")),
    }
}

impl Args {
    /// Backend connection settings
    ///
    /// # Errors
    ///
    /// [`ConfigError::MissingSettings`] listing every absent endpoint/credential
    /// setting at once, or [`ConfigError::InvalidSetting`] for an unknown backend.
    pub fn backend_config(&self) -> Result<BackendConfig, ConfigError> {
        let present = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        let endpoint_url = present(&self.s3_endpoint_url);
        let access_key = present(&self.root_access_key);
        let secret_key = present(&self.root_secret_key);

        let missing: Vec<String> = [
            ("S3_ENDPOINT_URL", endpoint_url.is_none()),
            ("ROOT_ACCESS_KEY", access_key.is_none()),
            ("ROOT_SECRET_KEY", secret_key.is_none()),
        ]
        .into_iter()
        .filter(|(_, is_missing)| *is_missing)
        .map(|(name, _)| name.to_string())
        .collect();

        let kind: BackendKind = self.backend_name.parse().map_err(|e| ConfigError::InvalidSetting {
            setting: "BACKEND_NAME".to_string(),
            reason: format!("{e}"),
        })?;

        match (endpoint_url, access_key, secret_key) {
            (Some(endpoint_url), Some(access_key), Some(secret_key)) => {
                Ok(BackendConfig::new(kind, endpoint_url, access_key, secret_key))
            }
            _ => Err(ConfigError::MissingSettings(missing)),
        }
    }

    /// Controller tuning from the environment, with flag values applied on top
    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            annotation_key: self.annotation_key.clone(),
            enforce_endpoint_check: self.enforce_endpoint_check,
            ..ControllerConfig::from_env()
        }
    }

    /// Server settings from the environment, with the flag port applied on top
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            metrics_port: self.metrics_port,
            ..ServerConfig::from_env()
        }
    }
}
