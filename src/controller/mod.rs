//! # Controller
//!
//! Per-record reconciliation and the watch-path dedup cache.

pub mod dedup;
pub mod reconciler;

pub use dedup::DedupCache;
pub use reconciler::{
    BucketAction, ReconcileOutcome, ReconcileReport, Reconciler, ReconcilerError, SkipReason,
    UserAction,
};
