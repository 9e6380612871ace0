//! # Record Source
//!
//! Where annotated records come from. The control loop only sees the
//! [`RecordSource`] trait; [`SecretSource`] is the Kubernetes implementation
//! that lists and watches `Secret`s across all namespaces.

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use k8s_openapi::api::core::v1::Secret;
use kube::api::{Api, ListParams, WatchEvent, WatchParams};
use kube::Client;
use tracing::{debug, info_span, Instrument};

use super::{AnnotatedRecord, EventKind, RecordEvent};

/// The API server rejects watch timeouts at or above this value
const MAX_WATCH_TIMEOUT_SECS: u32 = 290;

/// Errors raised by a record source
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Request to the API server failed (list, or opening/reading the watch)
    #[error("kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    /// The watch stream delivered an error event
    #[error("watch stream error: {0}")]
    Watch(String),
}

/// Stream of change notifications
pub type RecordEventStream = BoxStream<'static, Result<RecordEvent, SourceError>>;

/// Provider of annotated records
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// List every record that carries `annotation_key`
    async fn list_annotated(
        &self,
        annotation_key: &str,
    ) -> Result<Vec<AnnotatedRecord>, SourceError>;

    /// Open a change stream
    ///
    /// The stream ends on its own after roughly `idle_timeout`; the caller
    /// re-opens it. Dropping the stream closes the underlying connection.
    async fn watch(&self, idle_timeout: Duration) -> Result<RecordEventStream, SourceError>;
}

/// Kubernetes `Secret` source, cluster-wide
#[derive(Clone)]
pub struct SecretSource {
    api: Api<Secret>,
}

impl std::fmt::Debug for SecretSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretSource").finish_non_exhaustive()
    }
}

impl SecretSource {
    pub fn new(client: Client) -> Self {
        Self {
            api: Api::all(client),
        }
    }
}

#[async_trait]
impl RecordSource for SecretSource {
    async fn list_annotated(
        &self,
        annotation_key: &str,
    ) -> Result<Vec<AnnotatedRecord>, SourceError> {
        let span = info_span!(
            "source.list",
            resource.kind = "Secret",
            annotation_key = annotation_key
        );
        async move {
            let secrets = self.api.list(&ListParams::default()).await?;
            let total = secrets.items.len();
            let records: Vec<AnnotatedRecord> = secrets
                .items
                .into_iter()
                .map(AnnotatedRecord::from)
                .filter(|record| record.has_annotation(annotation_key))
                .collect();
            debug!(total, annotated = records.len(), "Listed secrets");
            Ok(records)
        }
        .instrument(span)
        .await
    }

    async fn watch(&self, idle_timeout: Duration) -> Result<RecordEventStream, SourceError> {
        let timeout_secs = u32::try_from(idle_timeout.as_secs())
            .unwrap_or(MAX_WATCH_TIMEOUT_SECS)
            .clamp(1, MAX_WATCH_TIMEOUT_SECS);
        let params = WatchParams::default().timeout(timeout_secs);

        let stream = self.api.watch(&params, "0").await?;
        let events = stream
            .map_err(SourceError::from)
            .try_filter_map(|event| async move { translate_event(event) });

        Ok(events.boxed())
    }
}

/// Map a raw watch event; bookmarks are dropped, error events end the cycle
fn translate_event(event: WatchEvent<Secret>) -> Result<Option<RecordEvent>, SourceError> {
    match event {
        WatchEvent::Added(secret) => Ok(Some(RecordEvent::new(EventKind::Added, secret.into()))),
        WatchEvent::Modified(secret) => {
            Ok(Some(RecordEvent::new(EventKind::Modified, secret.into())))
        }
        WatchEvent::Deleted(secret) => {
            Ok(Some(RecordEvent::new(EventKind::Deleted, secret.into())))
        }
        WatchEvent::Bookmark(_) => Ok(None),
        WatchEvent::Error(err) => Err(SourceError::Watch(format!("{err:?}"))),
    }
}
