//! # Constants
//!
//! Shared constants used throughout the controller.
//!
//! These values represent reasonable defaults and can be overridden via
//! configuration or environment variables where applicable.

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 8000;

/// Default HTTP server startup timeout (how long to wait for server to be ready)
pub const DEFAULT_SERVER_STARTUP_TIMEOUT_SECS: u64 = 10;

/// Default HTTP server readiness poll interval
pub const DEFAULT_SERVER_POLL_INTERVAL_MS: u64 = 50;

/// Annotation that opts a Secret into reconciliation
pub const DEFAULT_ANNOTATION_KEY: &str = "s3-resource-operator.io/enabled";

/// Backend used when none is configured
pub const DEFAULT_BACKEND_NAME: &str = "versitygw";

/// Server-side watch timeout (seconds); the stream ends after this much idle time
/// and the loop re-polls
pub const DEFAULT_WATCH_TIMEOUT_SECS: u32 = 10;

/// Fixed delay before re-establishing the watch stream (seconds)
pub const DEFAULT_WATCH_RECONNECT_DELAY_SECS: u64 = 1;

/// Region bound into the credential scope of admin API signatures
pub const SIGNING_REGION: &str = "us-east-1";

/// Service bound into the credential scope of admin API signatures
pub const SIGNING_SERVICE: &str = "s3";

/// Timeout for a single admin API request (seconds)
pub const ADMIN_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Role assigned to new principals when the record does not name one
pub const DEFAULT_USER_ROLE: &str = "user";
