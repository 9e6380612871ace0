//! # Stub Backends
//!
//! Placeholder adapters for MinIO and Garage. Every operation, including the
//! connection check, reports [`BackendError::Unimplemented`].

use async_trait::async_trait;

use super::{Backend, BackendError};

/// Adapter for a backend whose admin protocol is not implemented yet
#[derive(Debug, Clone)]
pub struct StubBackend {
    name: &'static str,
    endpoint_url: String,
}

impl StubBackend {
    pub fn minio(endpoint_url: &str) -> Self {
        Self::new("minio", endpoint_url)
    }

    pub fn garage(endpoint_url: &str) -> Self {
        Self::new("garage", endpoint_url)
    }

    fn new(name: &'static str, endpoint_url: &str) -> Self {
        Self {
            name,
            endpoint_url: endpoint_url.to_string(),
        }
    }

    fn unimplemented<T>(&self, operation: &'static str) -> Result<T, BackendError> {
        Err(BackendError::Unimplemented {
            backend: self.name,
            operation,
        })
    }
}

#[async_trait]
impl Backend for StubBackend {
    async fn bucket_exists(&self, _name: &str) -> Result<bool, BackendError> {
        self.unimplemented("bucket_exists")
    }

    async fn create_bucket(&self, _name: &str, _owner: Option<&str>) -> Result<(), BackendError> {
        self.unimplemented("create_bucket")
    }

    async fn delete_bucket(&self, _name: &str) -> Result<(), BackendError> {
        self.unimplemented("delete_bucket")
    }

    async fn get_bucket_owner(&self, _name: &str) -> Result<Option<String>, BackendError> {
        self.unimplemented("get_bucket_owner")
    }

    async fn change_bucket_owner(&self, _name: &str, _owner: &str) -> Result<(), BackendError> {
        self.unimplemented("change_bucket_owner")
    }

    async fn user_exists(&self, _access_key: &str) -> Result<bool, BackendError> {
        self.unimplemented("user_exists")
    }

    async fn create_user(
        &self,
        _access_key: &str,
        _secret_key: &str,
        _role: Option<&str>,
        _user_id: Option<i64>,
        _group_id: Option<i64>,
    ) -> Result<(), BackendError> {
        self.unimplemented("create_user")
    }

    async fn update_user(
        &self,
        _access_key: &str,
        _secret_key: Option<&str>,
        _user_id: Option<i64>,
        _group_id: Option<i64>,
    ) -> Result<(), BackendError> {
        self.unimplemented("update_user")
    }

    async fn delete_user(&self, _access_key: &str) -> Result<(), BackendError> {
        self.unimplemented("delete_user")
    }

    async fn test_connection(&self) -> Result<(), BackendError> {
        self.unimplemented("test_connection")
    }

    fn endpoint_url(&self) -> &str {
        &self.endpoint_url
    }

    fn name(&self) -> &'static str {
        self.name
    }
}
