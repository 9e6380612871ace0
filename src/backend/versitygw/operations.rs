//! # VersityGW Operations
//!
//! Implements [`Backend`] for [`VersityGw`].
//!
//! Admin calls that come back non-2xx are logged with status and body and
//! otherwise treated as done: mutations return `Ok(())`, listings come back
//! empty. Only [`Backend::test_connection`] is strict.

use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use tracing::{debug, error, info, info_span, warn, Instrument};

use super::xml::{self, AccountEntry, BucketEntry, XmlError};
use super::{AdminResponse, VersityGw};
use crate::backend::{Backend, BackendError};

const PROVIDER: &str = "versitygw";

impl VersityGw {
    async fn list_buckets(&self) -> Vec<BucketEntry> {
        let response = self.admin.patch("/list-buckets", &[], None).await;
        lenient_list("list_buckets", &response, xml::parse_buckets)
    }

    async fn list_users(&self) -> Vec<AccountEntry> {
        let response = self.admin.patch("/list-users", &[], None).await;
        lenient_list("list_users", &response, xml::parse_accounts)
    }
}

/// Parse a list response, degrading every failure to an empty list
fn lenient_list<T>(
    operation: &'static str,
    response: &AdminResponse,
    parse: fn(&str) -> Result<Vec<T>, XmlError>,
) -> Vec<T> {
    if !response.is_success() {
        error!(
            provider = PROVIDER,
            operation = operation,
            status = response.status,
            body = %response.body,
            "Admin list request failed"
        );
        return Vec::new();
    }
    match parse(&response.body) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(
                provider = PROVIDER,
                operation = operation,
                error = %e,
                "Admin list response is not valid XML, treating as empty"
            );
            Vec::new()
        }
    }
}

/// Parse a list response, turning every failure into [`BackendError::Unavailable`]
fn strict_list<T>(
    operation: &'static str,
    response: &AdminResponse,
    parse: fn(&str) -> Result<Vec<T>, XmlError>,
) -> Result<Vec<T>, BackendError> {
    if !response.is_success() {
        return Err(BackendError::Unavailable(format!(
            "{operation} returned status {}: {}",
            response.status, response.body
        )));
    }
    parse(&response.body)
        .map_err(|e| BackendError::Unavailable(format!("{operation} returned malformed XML: {e}")))
}

/// Log a failed admin mutation; the call is not raised
fn check_mutation(operation: &'static str, response: &AdminResponse) {
    if response.is_success() {
        debug!(provider = PROVIDER, operation = operation, status = response.status, "Admin request succeeded");
    } else {
        error!(
            provider = PROVIDER,
            operation = operation,
            status = response.status,
            body = %response.body,
            "Admin request failed"
        );
    }
}

#[async_trait]
impl Backend for VersityGw {
    async fn bucket_exists(&self, name: &str) -> Result<bool, BackendError> {
        Ok(self.list_buckets().await.iter().any(|bucket| bucket.name == name))
    }

    async fn create_bucket(&self, name: &str, owner: Option<&str>) -> Result<(), BackendError> {
        let span = info_span!("versitygw.bucket.create", bucket = name, owner = owner);
        async move {
            if self.bucket_exists(name).await? {
                debug!(provider = PROVIDER, bucket = name, "Bucket already exists, nothing to create");
                return Ok(());
            }

            match self.s3.create_bucket().bucket(name).send().await {
                Ok(_) => {
                    info!(provider = PROVIDER, bucket = name, operation = "create_bucket", "Created bucket");
                }
                Err(err) => {
                    let service_error = err.into_service_error();
                    if service_error.is_bucket_already_owned_by_you() {
                        info!(
                            provider = PROVIDER,
                            bucket = name,
                            operation = "create_bucket",
                            "Bucket already owned by the root account"
                        );
                    } else if service_error.is_bucket_already_exists() {
                        warn!(
                            provider = PROVIDER,
                            bucket = name,
                            operation = "create_bucket",
                            "Bucket name is taken by another account, leaving it untouched"
                        );
                        return Ok(());
                    } else {
                        return Err(BackendError::operation_failed(
                            "create_bucket",
                            DisplayErrorContext(&service_error),
                        ));
                    }
                }
            }

            if let Some(owner) = owner {
                self.change_bucket_owner(name, owner).await?;
            }
            Ok(())
        }
        .instrument(span)
        .await
    }

    async fn delete_bucket(&self, name: &str) -> Result<(), BackendError> {
        self.s3
            .delete_bucket()
            .bucket(name)
            .send()
            .await
            .map_err(|e| BackendError::operation_failed("delete_bucket", DisplayErrorContext(&e)))?;
        info!(provider = PROVIDER, bucket = name, operation = "delete_bucket", "Deleted bucket");
        Ok(())
    }

    async fn get_bucket_owner(&self, name: &str) -> Result<Option<String>, BackendError> {
        Ok(self
            .list_buckets()
            .await
            .into_iter()
            .find(|bucket| bucket.name == name)
            .and_then(|bucket| bucket.owner))
    }

    async fn change_bucket_owner(&self, name: &str, owner: &str) -> Result<(), BackendError> {
        let response = self
            .admin
            .patch("/change-bucket-owner", &[("bucket", name), ("owner", owner)], None)
            .instrument(info_span!("versitygw.bucket.change_owner", bucket = name, owner = owner))
            .await;
        check_mutation("change_bucket_owner", &response);
        if response.is_success() {
            info!(provider = PROVIDER, bucket = name, owner = owner, "Changed bucket owner");
        }
        Ok(())
    }

    async fn user_exists(&self, access_key: &str) -> Result<bool, BackendError> {
        Ok(self.list_users().await.iter().any(|user| user.access == access_key))
    }

    async fn create_user(
        &self,
        access_key: &str,
        secret_key: &str,
        role: Option<&str>,
        user_id: Option<i64>,
        group_id: Option<i64>,
    ) -> Result<(), BackendError> {
        let span = info_span!("versitygw.user.create", access_key = access_key);
        async move {
            if self.user_exists(access_key).await? {
                debug!(provider = PROVIDER, access_key = access_key, "User already exists, nothing to create");
                return Ok(());
            }
            let body = xml::create_user_body(access_key, secret_key, role, user_id, group_id);
            let response = self.admin.patch("/create-user", &[], Some(body)).await;
            check_mutation("create_user", &response);
            if response.is_success() {
                info!(provider = PROVIDER, access_key = access_key, "Created user");
            }
            Ok(())
        }
        .instrument(span)
        .await
    }

    async fn update_user(
        &self,
        access_key: &str,
        secret_key: Option<&str>,
        user_id: Option<i64>,
        group_id: Option<i64>,
    ) -> Result<(), BackendError> {
        let body = xml::update_user_body(secret_key, user_id, group_id);
        let response = self
            .admin
            .patch("/update-user", &[("access", access_key)], Some(body))
            .instrument(info_span!("versitygw.user.update", access_key = access_key))
            .await;
        check_mutation("update_user", &response);
        Ok(())
    }

    async fn delete_user(&self, access_key: &str) -> Result<(), BackendError> {
        let response = self
            .admin
            .patch("/delete-user", &[("access", access_key)], None)
            .instrument(info_span!("versitygw.user.delete", access_key = access_key))
            .await;
        check_mutation("delete_user", &response);
        Ok(())
    }

    async fn test_connection(&self) -> Result<(), BackendError> {
        let buckets = strict_list(
            "list_buckets",
            &self.admin.patch("/list-buckets", &[], None).await,
            xml::parse_buckets,
        )?;
        let users = strict_list(
            "list_users",
            &self.admin.patch("/list-users", &[], None).await,
            xml::parse_accounts,
        )?;
        info!(
            provider = PROVIDER,
            endpoint = %self.endpoint_url,
            buckets = buckets.len(),
            users = users.len(),
            "Backend connection verified"
        );
        Ok(())
    }

    fn endpoint_url(&self) -> &str {
        &self.endpoint_url
    }

    fn name(&self) -> &'static str {
        PROVIDER
    }
}
