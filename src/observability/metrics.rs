//! # Metrics
//!
//! Prometheus metrics for monitoring the controller.
//!
//! ## Metrics Exposed
//!
//! - `s3_operator_secrets_processed_total` - Records reconciled successfully
//! - `s3_operator_errors_total` - Records whose reconciliation failed (plus listing failures)
//! - `s3_operator_users_created_total` - Principals created
//! - `s3_operator_users_updated_total` - Principals updated
//! - `s3_operator_buckets_created_total` - Buckets created
//! - `s3_operator_bucket_owners_changed_total` - Bucket ownership changes
//! - `s3_operator_secrets_skipped_total` - Records skipped because their endpoint pin did not match
//! - `s3_operator_sync_duration_seconds` - Duration of the bootstrap sync
//! - `s3_operator_handle_secret_duration_seconds` - Duration of a single reconciliation
//!
//! Metrics live in a registry owned by [`Metrics`]; one instance is shared by
//! `Arc` between the control loop and the HTTP server.

use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, Registry, TextEncoder};

#[derive(Debug, Clone)]
pub struct Metrics {
    registry: Registry,
    secrets_processed: IntCounter,
    errors: IntCounter,
    users_created: IntCounter,
    users_updated: IntCounter,
    buckets_created: IntCounter,
    bucket_owners_changed: IntCounter,
    secrets_skipped: IntCounter,
    sync_duration: Histogram,
    handle_secret_duration: Histogram,
}

impl Metrics {
    /// Create the metric set and register it in a fresh registry
    ///
    /// # Errors
    ///
    /// Fails only if a metric definition is invalid or registered twice.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let counter = |name: &str, help: &str| -> Result<IntCounter, prometheus::Error> {
            let counter = IntCounter::new(name, help)?;
            registry.register(Box::new(counter.clone()))?;
            Ok(counter)
        };
        let histogram = |name: &str, help: &str, buckets: Vec<f64>| -> Result<Histogram, prometheus::Error> {
            let histogram = Histogram::with_opts(HistogramOpts::new(name, help).buckets(buckets))?;
            registry.register(Box::new(histogram.clone()))?;
            Ok(histogram)
        };

        let secrets_processed = counter(
            "s3_operator_secrets_processed_total",
            "Total number of secrets reconciled successfully",
        )?;
        let errors = counter(
            "s3_operator_errors_total",
            "Total number of reconciliation errors",
        )?;
        let users_created = counter(
            "s3_operator_users_created_total",
            "Total number of users created",
        )?;
        let users_updated = counter(
            "s3_operator_users_updated_total",
            "Total number of users updated",
        )?;
        let buckets_created = counter(
            "s3_operator_buckets_created_total",
            "Total number of buckets created",
        )?;
        let bucket_owners_changed = counter(
            "s3_operator_bucket_owners_changed_total",
            "Total number of bucket ownership changes",
        )?;
        let secrets_skipped = counter(
            "s3_operator_secrets_skipped_total",
            "Total number of secrets skipped because their endpoint does not match this backend",
        )?;
        let sync_duration = histogram(
            "s3_operator_sync_duration_seconds",
            "Duration of the startup sync of existing secrets in seconds",
            vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0],
        )?;
        let handle_secret_duration = histogram(
            "s3_operator_handle_secret_duration_seconds",
            "Duration of reconciling a single secret in seconds",
            vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0],
        )?;

        Ok(Self {
            registry,
            secrets_processed,
            errors,
            users_created,
            users_updated,
            buckets_created,
            bucket_owners_changed,
            secrets_skipped,
            sync_duration,
            handle_secret_duration,
        })
    }

    pub fn increment_secrets_processed(&self) {
        self.secrets_processed.inc();
    }

    pub fn increment_errors(&self) {
        self.errors.inc();
    }

    pub fn increment_users_created(&self) {
        self.users_created.inc();
    }

    pub fn increment_users_updated(&self) {
        self.users_updated.inc();
    }

    pub fn increment_buckets_created(&self) {
        self.buckets_created.inc();
    }

    pub fn increment_bucket_owners_changed(&self) {
        self.bucket_owners_changed.inc();
    }

    pub fn increment_secrets_skipped(&self) {
        self.secrets_skipped.inc();
    }

    pub fn observe_sync_duration(&self, duration: f64) {
        self.sync_duration.observe(duration);
    }

    pub fn observe_handle_secret_duration(&self, duration: f64) {
        self.handle_secret_duration.observe(duration);
    }

    pub fn secrets_processed(&self) -> u64 {
        self.secrets_processed.get()
    }

    pub fn errors(&self) -> u64 {
        self.errors.get()
    }

    pub fn users_created(&self) -> u64 {
        self.users_created.get()
    }

    pub fn users_updated(&self) -> u64 {
        self.users_updated.get()
    }

    pub fn buckets_created(&self) -> u64 {
        self.buckets_created.get()
    }

    pub fn bucket_owners_changed(&self) -> u64 {
        self.bucket_owners_changed.get()
    }

    pub fn secrets_skipped(&self) -> u64 {
        self.secrets_skipped.get()
    }

    /// Number of reconciliations observed by the duration histogram
    pub fn handle_secret_count(&self) -> u64 {
        self.handle_secret_duration.get_sample_count()
    }

    /// Number of bootstrap syncs observed
    pub fn sync_count(&self) -> u64 {
        self.sync_duration.get_sample_count()
    }

    /// Render all metrics in the Prometheus text exposition format
    ///
    /// # Errors
    ///
    /// Fails if encoding fails (not expected for the metric types used here).
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
