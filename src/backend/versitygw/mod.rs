//! # VersityGW Adapter
//!
//! Drives a VersityGW gateway through two channels:
//! - the standard S3 API (bucket create/delete) via `aws-sdk-s3`
//! - the admin API (principals, ownership, listings) via SigV4-signed PATCH requests
//!
//! | Operation             | Channel | Request                                     |
//! |-----------------------|---------|---------------------------------------------|
//! | list buckets          | admin   | `PATCH /list-buckets`                       |
//! | change bucket owner   | admin   | `PATCH /change-bucket-owner?bucket=&owner=` |
//! | create user           | admin   | `PATCH /create-user` + `<Account>`          |
//! | update user           | admin   | `PATCH /update-user?access=` + `<MutableProps>` |
//! | delete user           | admin   | `PATCH /delete-user?access=`                |
//! | list users            | admin   | `PATCH /list-users`                         |
//! | create/delete bucket  | S3      | `CreateBucket` / `DeleteBucket`             |

mod admin;
mod operations;
pub mod sigv4;
pub mod xml;

pub use admin::{AdminClient, AdminResponse, TRANSPORT_FAILURE_STATUS};

use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};

use crate::backend::BackendError;
use crate::config::BackendConfig;
use crate::constants::SIGNING_REGION;

/// VersityGW backend adapter
#[derive(Debug, Clone)]
pub struct VersityGw {
    endpoint_url: String,
    admin: AdminClient,
    s3: aws_sdk_s3::Client,
}

impl VersityGw {
    /// # Errors
    ///
    /// [`BackendError::Unavailable`] if the endpoint URL is unusable.
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let admin = AdminClient::new(&config.endpoint_url, &config.access_key, &config.secret_key)?;

        let credentials = Credentials::new(
            config.access_key.clone(),
            config.secret_key.clone(),
            None,
            None,
            "static",
        );
        let s3_config = aws_sdk_s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(SIGNING_REGION))
            .credentials_provider(credentials)
            .endpoint_url(config.endpoint_url.clone())
            .force_path_style(true)
            .build();

        Ok(Self {
            endpoint_url: config.endpoint_url.clone(),
            admin,
            s3: aws_sdk_s3::Client::from_conf(s3_config),
        })
    }
}
