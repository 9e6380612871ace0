//! # Reconciler
//!
//! Converges the backend toward the intent expressed by one record.
//!
//! Order of operations:
//! 1. Resolve fields (fails on undecodable values or missing required fields)
//! 2. Skip the record if its endpoint pin names a different backend
//! 3. Ensure the principal: create it, or update it with the record's credentials
//! 4. Ensure the bucket: create it owned by the principal, or hand it over
//!
//! The principal always comes first so that ownership can be assigned to it.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::backend::{Backend, BackendError};
use crate::observability::Metrics;
use crate::record::{resolve, AnnotatedRecord, RecordError, ResolvedFields};

/// Reasons a reconciliation can fail
#[derive(Debug, thiserror::Error)]
pub enum ReconcilerError {
    #[error("invalid record: {0}")]
    Record(#[from] RecordError),

    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
}

/// Why a record was left alone
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The record pins a different endpoint than the configured backend
    EndpointMismatch {
        record_endpoint: String,
        backend_endpoint: String,
    },
}

/// What happened to the principal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserAction {
    Created,
    Updated,
}

/// What happened to the bucket
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BucketAction {
    Created,
    OwnerChanged { previous_owner: String },
    /// Bucket exists and is already owned by the record's principal
    Unchanged,
    /// Bucket exists but its owner could not be determined; left alone
    OwnerUnknown,
}

/// Actions taken for one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    pub bucket_name: String,
    pub access_key: String,
    pub user: UserAction,
    pub bucket: BucketAction,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Applied(ReconcileReport),
    Skipped(SkipReason),
}

/// Applies records to a backend and keeps the metrics
pub struct Reconciler {
    backend: Arc<dyn Backend>,
    metrics: Arc<Metrics>,
    enforce_endpoint_check: bool,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("backend", &self.backend.name())
            .field("endpoint", &self.backend.endpoint_url())
            .field("enforce_endpoint_check", &self.enforce_endpoint_check)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    pub fn new(backend: Arc<dyn Backend>, metrics: Arc<Metrics>, enforce_endpoint_check: bool) -> Self {
        Self {
            backend,
            metrics,
            enforce_endpoint_check,
        }
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Reconcile one record
    ///
    /// Counts the outcome exactly once: processed on success, skipped on an
    /// endpoint mismatch, error on failure. Duration is always observed.
    pub async fn reconcile(&self, record: &AnnotatedRecord) -> Result<ReconcileOutcome, ReconcilerError> {
        let span = info_span!(
            "reconcile",
            resource.namespace = %record.namespace,
            resource.name = %record.name,
            resource.version = record.resource_version.as_deref().unwrap_or("")
        );
        let start = Instant::now();

        let result = self.reconcile_inner(record).instrument(span.clone()).await;
        self.metrics
            .observe_handle_secret_duration(start.elapsed().as_secs_f64());

        span.in_scope(|| match &result {
            Ok(ReconcileOutcome::Applied(report)) => {
                self.metrics.increment_secrets_processed();
                info!(
                    bucket = %report.bucket_name,
                    access_key = %report.access_key,
                    user_action = ?report.user,
                    bucket_action = ?report.bucket,
                    duration_ms = %start.elapsed().as_millis(),
                    "Reconciled secret"
                );
            }
            Ok(ReconcileOutcome::Skipped(reason)) => {
                self.metrics.increment_secrets_skipped();
                debug!(reason = ?reason, "Secret skipped");
            }
            Err(e) => {
                self.metrics.increment_errors();
                error!(error = %e, "Failed to reconcile secret");
            }
        });
        result
    }

    async fn reconcile_inner(&self, record: &AnnotatedRecord) -> Result<ReconcileOutcome, ReconcilerError> {
        let fields = resolve(record)?;

        if let Some(reason) = self.endpoint_mismatch(&fields) {
            return Ok(ReconcileOutcome::Skipped(reason));
        }

        let user = self.ensure_user(&fields).await?;
        let bucket = self.ensure_bucket(&fields).await?;

        Ok(ReconcileOutcome::Applied(ReconcileReport {
            bucket_name: fields.bucket_name.clone(),
            access_key: fields.access_key.clone(),
            user,
            bucket,
        }))
    }

    fn endpoint_mismatch(&self, fields: &ResolvedFields) -> Option<SkipReason> {
        if !self.enforce_endpoint_check {
            return None;
        }
        let record_endpoint = fields.endpoint_url.as_deref()?;
        let backend_endpoint = self.backend.endpoint_url();
        if record_endpoint == backend_endpoint {
            return None;
        }
        warn!(
            record_endpoint = %record_endpoint,
            backend_endpoint = %backend_endpoint,
            "Skipping secret: endpoint URL does not match this controller's backend"
        );
        Some(SkipReason::EndpointMismatch {
            record_endpoint: record_endpoint.to_string(),
            backend_endpoint: backend_endpoint.to_string(),
        })
    }

    async fn ensure_user(&self, fields: &ResolvedFields) -> Result<UserAction, BackendError> {
        let access_key = fields.access_key.as_str();

        if self.backend.user_exists(access_key).await? {
            debug!(access_key = %access_key, operation = "update_user", "User exists, updating");
            self.backend
                .update_user(
                    access_key,
                    Some(fields.secret_key.as_str()),
                    fields.user_id,
                    fields.group_id,
                )
                .await?;
            self.metrics.increment_users_updated();
            Ok(UserAction::Updated)
        } else {
            info!(access_key = %access_key, operation = "create_user", "Creating user");
            self.backend
                .create_user(
                    access_key,
                    &fields.secret_key,
                    fields.role.as_deref(),
                    fields.user_id,
                    fields.group_id,
                )
                .await?;
            self.metrics.increment_users_created();
            Ok(UserAction::Created)
        }
    }

    async fn ensure_bucket(&self, fields: &ResolvedFields) -> Result<BucketAction, BackendError> {
        let bucket = fields.bucket_name.as_str();
        let owner = fields.access_key.as_str();

        if !self.backend.bucket_exists(bucket).await? {
            info!(bucket = %bucket, owner = %owner, operation = "create_bucket", "Creating bucket");
            self.backend.create_bucket(bucket, Some(owner)).await?;
            self.metrics.increment_buckets_created();
            return Ok(BucketAction::Created);
        }

        match self.backend.get_bucket_owner(bucket).await? {
            None => {
                warn!(bucket = %bucket, "Could not determine bucket owner, leaving ownership unchanged");
                Ok(BucketAction::OwnerUnknown)
            }
            Some(current) if current == owner => {
                debug!(bucket = %bucket, owner = %owner, "Bucket already owned by the expected user");
                Ok(BucketAction::Unchanged)
            }
            Some(current) => {
                info!(
                    bucket = %bucket,
                    from = %current,
                    to = %owner,
                    operation = "change_bucket_owner",
                    "Changing bucket owner"
                );
                self.backend.change_bucket_owner(bucket, owner).await?;
                self.metrics.increment_bucket_owners_changed();
                Ok(BucketAction::OwnerChanged {
                    previous_owner: current,
                })
            }
        }
    }
}
