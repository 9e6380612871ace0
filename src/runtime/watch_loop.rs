//! # Watch Loop
//!
//! The control loop: one bootstrap pass over every annotated record, then a
//! continuous watch that reconciles changes as they arrive.
//!
//! ```text
//! INIT -> BOOTSTRAP_SYNC -> WATCHING <-> RECONNECTING -> SHUTDOWN
//! ```
//!
//! The watch stream ends on its own after the server-side timeout, or early on
//! error. Either way it is dropped, the loop waits the fixed reconnect delay and
//! opens a new one. Shutdown is checked before every cycle, before every event,
//! and while waiting to reconnect. A reconciliation already in flight is
//! allowed to finish.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::StreamExt;
use tracing::{debug, error, info, info_span, Instrument};

use crate::config::ControllerConfig;
use crate::controller::{DedupCache, ReconcileOutcome, Reconciler};
use crate::record::{EventKind, RecordEvent, RecordSource, SourceError};
use crate::runtime::error_policy::handle_watch_stream_error;
use crate::runtime::shutdown::ShutdownSignal;

/// Result of the bootstrap pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub total: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// How a watch cycle ended without error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CycleEnd {
    StreamEnded,
    Shutdown,
}

/// Owns the dedup cache and drives reconciliation from a [`RecordSource`]
pub struct ControlLoop {
    source: Arc<dyn RecordSource>,
    reconciler: Arc<Reconciler>,
    shutdown: ShutdownSignal,
    annotation_key: String,
    watch_timeout: Duration,
    reconnect_delay: Duration,
    dedup: DedupCache,
}

impl std::fmt::Debug for ControlLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlLoop")
            .field("annotation_key", &self.annotation_key)
            .field("watch_timeout", &self.watch_timeout)
            .field("reconnect_delay", &self.reconnect_delay)
            .field("dedup_entries", &self.dedup.len())
            .finish_non_exhaustive()
    }
}

impl ControlLoop {
    pub fn new(
        source: Arc<dyn RecordSource>,
        reconciler: Arc<Reconciler>,
        shutdown: ShutdownSignal,
        config: &ControllerConfig,
    ) -> Self {
        Self {
            source,
            reconciler,
            shutdown,
            annotation_key: config.annotation_key.clone(),
            watch_timeout: config.watch_timeout_duration(),
            reconnect_delay: config.watch_reconnect_delay_duration(),
            dedup: DedupCache::new(),
        }
    }

    pub fn dedup(&self) -> &DedupCache {
        &self.dedup
    }

    /// Bootstrap, then watch until shutdown is requested
    pub async fn run(&mut self) -> SyncSummary {
        let summary = self.bootstrap_sync().await;
        self.watch_until_shutdown().await;
        summary
    }

    /// Reconcile every annotated record once
    ///
    /// Records are handled one at a time; a failure is logged and counted and
    /// the pass moves on. A failed listing is logged and counted too, and
    /// yields an empty summary.
    pub async fn bootstrap_sync(&self) -> SyncSummary {
        let span = info_span!(
            "controller.startup.reconcile_existing",
            operation = "bootstrap_sync",
            annotation_key = %self.annotation_key
        );
        let start = Instant::now();
        let summary = self.bootstrap_sync_inner().instrument(span).await;
        self.reconciler
            .metrics()
            .observe_sync_duration(start.elapsed().as_secs_f64());
        summary
    }

    async fn bootstrap_sync_inner(&self) -> SyncSummary {
        let mut summary = SyncSummary::default();

        let records = match self.source.list_annotated(&self.annotation_key).await {
            Ok(records) => records,
            Err(e) => {
                error!(error = %e, "Failed to list annotated secrets, continuing with watch");
                self.reconciler.metrics().increment_errors();
                return summary;
            }
        };

        summary.total = records.len();
        info!("Reconciling {} existing annotated secrets before starting watch...", records.len());

        for record in &records {
            if self.shutdown.is_triggered() {
                info!("Shutdown requested, stopping startup sync");
                break;
            }
            match self.reconciler.reconcile(record).await {
                Ok(ReconcileOutcome::Applied(_)) => summary.succeeded += 1,
                Ok(ReconcileOutcome::Skipped(_)) => summary.skipped += 1,
                // Logged and counted by the reconciler
                Err(_) => summary.failed += 1,
            }
        }

        info!(
            total = summary.total,
            succeeded = summary.succeeded,
            skipped = summary.skipped,
            failed = summary.failed,
            "Completed startup sync"
        );
        summary
    }

    /// Watch and reconnect until shutdown is requested
    pub async fn watch_until_shutdown(&mut self) {
        info!("Starting controller watch loop...");
        loop {
            if self.shutdown.is_triggered() {
                info!("Shutdown requested, exiting watch loop");
                break;
            }

            let watch_span = info_span!("controller.watch", operation = "watch_loop");
            match self.watch_cycle().instrument(watch_span).await {
                Ok(CycleEnd::Shutdown) => {
                    info!("Shutdown requested, exiting watch loop");
                    break;
                }
                Ok(CycleEnd::StreamEnded) => {
                    debug!("Watch stream ended, reconnecting");
                }
                Err(e) => {
                    handle_watch_stream_error(&e.to_string(), self.reconnect_delay);
                }
            }

            tokio::select! {
                biased;
                () = self.shutdown.wait() => {
                    info!("Shutdown requested while waiting to reconnect");
                    break;
                }
                () = tokio::time::sleep(self.reconnect_delay) => {}
            }
        }
        info!("Watch loop stopped");
    }

    /// One watch stream from open to end; the stream is dropped on return
    async fn watch_cycle(&mut self) -> Result<CycleEnd, SourceError> {
        let mut stream = tokio::select! {
            biased;
            () = self.shutdown.wait() => return Ok(CycleEnd::Shutdown),
            opened = self.source.watch(self.watch_timeout) => opened?,
        };
        debug!(timeout_secs = self.watch_timeout.as_secs(), "Watch stream opened");

        loop {
            if self.shutdown.is_triggered() {
                return Ok(CycleEnd::Shutdown);
            }
            let next = tokio::select! {
                biased;
                () = self.shutdown.wait() => return Ok(CycleEnd::Shutdown),
                next = stream.next() => next,
            };
            match next {
                Some(Ok(event)) => self.handle_event(event).await,
                Some(Err(e)) => return Err(e),
                None => return Ok(CycleEnd::StreamEnded),
            }
        }
    }

    async fn handle_event(&mut self, event: RecordEvent) {
        let RecordEvent { kind, record } = event;
        if !record.has_annotation(&self.annotation_key) {
            return;
        }

        let key = record.key();
        let span = info_span!(
            "controller.watch.event",
            event = %kind,
            resource.namespace = %record.namespace,
            resource.name = %record.name
        );

        if let Some(version) = record.resource_version.as_deref() {
            if self.dedup.is_applied(&key, version) {
                span.in_scope(|| debug!(resource.version = version, "Already applied this version, skipping"));
                return;
            }
        }

        match kind {
            EventKind::Deleted => {
                span.in_scope(|| info!("Secret deleted, backend resources are left in place"));
            }
            EventKind::Added | EventKind::Modified => {
                let result = self.reconciler.reconcile(&record).instrument(span).await;
                if result.is_ok() {
                    if let Some(version) = record.resource_version {
                        self.dedup.record(key, version);
                    }
                }
            }
        }
    }
}
