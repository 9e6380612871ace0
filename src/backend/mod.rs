//! # Storage Backends
//!
//! Backend adapters the reconciler drives.
//!
//! Every adapter implements [`Backend`], which covers three capabilities:
//! - bucket lifecycle (exists, create, delete)
//! - bucket ownership (get owner, change owner)
//! - principal lifecycle (exists, create, update, delete)
//!
//! Mutations are at-least-once safe: creating something that already exists
//! is a no-op success.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::BackendConfig;

pub mod stub;
pub mod versitygw;

pub use stub::StubBackend;
pub use versitygw::VersityGw;

/// Errors raised by backend adapters
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The backend could not be reached or failed verification
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// The adapter does not implement this operation
    #[error("{backend} backend does not implement {operation}")]
    Unimplemented {
        backend: &'static str,
        operation: &'static str,
    },

    /// The backend rejected or failed an operation
    #[error("{operation} failed: {reason}")]
    OperationFailed {
        operation: &'static str,
        reason: String,
    },

    /// No adapter exists for the requested backend name
    #[error("unsupported backend: {0}")]
    Unsupported(String),
}

impl BackendError {
    pub(crate) fn operation_failed(operation: &'static str, reason: impl ToString) -> Self {
        Self::OperationFailed {
            operation,
            reason: reason.to_string(),
        }
    }
}

/// Capability interface for an S3-compatible storage backend
#[async_trait]
pub trait Backend: Send + Sync {
    /// Whether a bucket with this name exists
    async fn bucket_exists(&self, name: &str) -> Result<bool, BackendError>;

    /// Create a bucket, optionally assigning it to `owner`
    ///
    /// A bucket that already exists is left untouched.
    async fn create_bucket(&self, name: &str, owner: Option<&str>) -> Result<(), BackendError>;

    /// Delete a bucket
    async fn delete_bucket(&self, name: &str) -> Result<(), BackendError>;

    /// Access key of the bucket's owner, or `None` if unknown
    async fn get_bucket_owner(&self, name: &str) -> Result<Option<String>, BackendError>;

    /// Reassign a bucket to another principal
    async fn change_bucket_owner(&self, name: &str, owner: &str) -> Result<(), BackendError>;

    /// Whether a principal with this access key exists
    async fn user_exists(&self, access_key: &str) -> Result<bool, BackendError>;

    /// Create a principal; no-op if it already exists
    async fn create_user(
        &self,
        access_key: &str,
        secret_key: &str,
        role: Option<&str>,
        user_id: Option<i64>,
        group_id: Option<i64>,
    ) -> Result<(), BackendError>;

    /// Update mutable properties of an existing principal
    async fn update_user(
        &self,
        access_key: &str,
        secret_key: Option<&str>,
        user_id: Option<i64>,
        group_id: Option<i64>,
    ) -> Result<(), BackendError>;

    /// Delete a principal
    async fn delete_user(&self, access_key: &str) -> Result<(), BackendError>;

    /// Verify connectivity and credentials
    ///
    /// Never succeeds silently: an unreachable backend is
    /// [`BackendError::Unavailable`].
    async fn test_connection(&self) -> Result<(), BackendError>;

    /// Endpoint URL this adapter talks to
    fn endpoint_url(&self) -> &str;

    /// Short backend name, used in logs and errors
    fn name(&self) -> &'static str;
}

/// Known backend adapters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    VersityGw,
    Minio,
    Garage,
}

impl BackendKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BackendKind::VersityGw => "versitygw",
            BackendKind::Minio => "minio",
            BackendKind::Garage => "garage",
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = BackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "versitygw" => Ok(BackendKind::VersityGw),
            "minio" => Ok(BackendKind::Minio),
            "garage" => Ok(BackendKind::Garage),
            _ => Err(BackendError::Unsupported(s.to_string())),
        }
    }
}

/// Build the adapter selected by `config.kind`
///
/// # Errors
///
/// Returns [`BackendError::Unavailable`] if the adapter's HTTP client cannot be built.
pub fn create_backend(config: &BackendConfig) -> Result<Arc<dyn Backend>, BackendError> {
    let backend: Arc<dyn Backend> = match config.kind {
        BackendKind::VersityGw => Arc::new(VersityGw::new(config)?),
        BackendKind::Minio => Arc::new(StubBackend::minio(&config.endpoint_url)),
        BackendKind::Garage => Arc::new(StubBackend::garage(&config.endpoint_url)),
    };
    tracing::info!(
        backend = backend.name(),
        endpoint = backend.endpoint_url(),
        "Backend adapter created"
    );
    Ok(backend)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_kind_from_str_is_case_insensitive() {
        assert_eq!("versitygw".parse::<BackendKind>().unwrap(), BackendKind::VersityGw);
        assert_eq!("VersityGW".parse::<BackendKind>().unwrap(), BackendKind::VersityGw);
        assert_eq!("MINIO".parse::<BackendKind>().unwrap(), BackendKind::Minio);
        assert_eq!(" garage ".parse::<BackendKind>().unwrap(), BackendKind::Garage);
    }

    #[test]
    fn test_unknown_backend_is_unsupported() {
        let err = "ceph".parse::<BackendKind>().unwrap_err();
        assert!(matches!(err, BackendError::Unsupported(ref name) if name == "ceph"));
        assert_eq!(err.to_string(), "unsupported backend: ceph");
    }

    #[tokio::test]
    async fn test_create_backend_selects_stub() {
        let config = BackendConfig::new(BackendKind::Garage, "http://garage:3900", "ak", "sk");
        let backend = create_backend(&config).unwrap();
        assert_eq!(backend.name(), "garage");
        assert_eq!(backend.endpoint_url(), "http://garage:3900");
    }
}
