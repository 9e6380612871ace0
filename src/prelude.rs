//! # Prelude
//!
//! Re-exports commonly used types and traits for convenience.
//!
//! ```rust
//! use s3_resource_controller::prelude::*;
//! ```

// Backend trait and adapters
pub use crate::backend::{create_backend, Backend, BackendError, BackendKind, StubBackend, VersityGw};

// Records and their source
pub use crate::record::{
    AnnotatedRecord, EventKind, RecordError, RecordEvent, RecordSource, ResolvedFields,
    SecretSource, SourceError,
};

// Reconciler types - core controller functionality
pub use crate::controller::{
    DedupCache, ReconcileOutcome, ReconcileReport, Reconciler, ReconcilerError, SkipReason,
};

// Config types - for configuration management
pub use crate::config::{BackendConfig, ConfigError, ControllerConfig, ServerConfig};

// Runtime
pub use crate::observability::Metrics;
pub use crate::runtime::{ControlLoop, ShutdownSignal, SyncSummary};
