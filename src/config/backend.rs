//! # Backend Configuration
//!
//! Connection settings for the storage backend, resolved once at startup.

use std::fmt;

use crate::backend::BackendKind;

/// Connection settings for the storage backend
#[derive(Clone)]
pub struct BackendConfig {
    /// Which backend adapter to drive
    pub kind: BackendKind,
    /// Base URL of the gateway (scheme, host, optional port)
    pub endpoint_url: String,
    /// Root access key used for both admin and S3 calls
    pub access_key: String,
    /// Root secret key
    pub secret_key: String,
}

impl BackendConfig {
    pub fn new(
        kind: BackendKind,
        endpoint_url: impl Into<String>,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            endpoint_url: endpoint_url.into(),
            access_key: access_key.into(),
            secret_key: secret_key.into(),
        }
    }
}

impl fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendConfig")
            .field("kind", &self.kind)
            .field("endpoint_url", &self.endpoint_url)
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}
