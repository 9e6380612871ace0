//! # Error Policy
//!
//! Classification of watch stream errors. The class only shapes what gets
//! logged; the reconnect delay is the same for every class.

use std::time::Duration;

use tracing::{error, warn};

/// Broad category of a watch failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchErrorKind {
    /// Resource version too old (410 Gone); routine after long idle periods
    Expired,
    /// Credentials rejected (401/403); RBAC revoked or token expired
    Unauthorized,
    /// API server is shedding load (429)
    Throttled,
    Other,
}

/// Classify a watch error from its rendered text
pub fn classify_watch_error(error_string: &str) -> WatchErrorKind {
    let is_410 = error_string.contains("410")
        || error_string.contains("too old resource version")
        || error_string.contains("Expired")
        || error_string.contains("Gone");
    let is_401 = error_string.contains("401")
        || error_string.contains("403")
        || error_string.contains("Unauthorized")
        || error_string.contains("Forbidden");
    let is_429 = error_string.contains("429")
        || error_string.contains("storage is (re)initializing")
        || error_string.contains("TooManyRequests");

    if is_410 {
        WatchErrorKind::Expired
    } else if is_401 {
        WatchErrorKind::Unauthorized
    } else if is_429 {
        WatchErrorKind::Throttled
    } else {
        WatchErrorKind::Other
    }
}

/// Log a watch error according to its class and return the class
pub fn handle_watch_stream_error(error_string: &str, reconnect_delay: Duration) -> WatchErrorKind {
    let error_span = tracing::span!(
        tracing::Level::WARN,
        "controller.watch.error",
        error = %error_string
    );
    let _error_guard = error_span.enter();

    let kind = classify_watch_error(error_string);
    match kind {
        WatchErrorKind::Expired => {
            warn!(
                "Watch resource version expired (410 Gone), reconnecting in {}s",
                reconnect_delay.as_secs()
            );
        }
        WatchErrorKind::Unauthorized => {
            error!("Watch authentication failed - RBAC may have been revoked or token expired");
            error!("Verify the service account can list and watch secrets in all namespaces:");
            error!("  kubectl auth can-i watch secrets --all-namespaces --as=system:serviceaccount:<namespace>:<service-account>");
            warn!("Retrying watch in {}s", reconnect_delay.as_secs());
        }
        WatchErrorKind::Throttled => {
            warn!(
                "API server is throttling watch requests (429), reconnecting in {}s",
                reconnect_delay.as_secs()
            );
        }
        WatchErrorKind::Other => {
            warn!(
                "Watch stream error: {}, reconnecting in {}s",
                error_string,
                reconnect_delay.as_secs()
            );
        }
    }
    kind
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_watch_error() {
        assert_eq!(
            classify_watch_error("ErrorResponse { code: 410, reason: \"Expired\" }"),
            WatchErrorKind::Expired
        );
        assert_eq!(
            classify_watch_error("too old resource version: 123 (456)"),
            WatchErrorKind::Expired
        );
        assert_eq!(
            classify_watch_error("ApiError: Unauthorized: 401"),
            WatchErrorKind::Unauthorized
        );
        assert_eq!(
            classify_watch_error("429 TooManyRequests"),
            WatchErrorKind::Throttled
        );
        assert_eq!(
            classify_watch_error("connection reset by peer"),
            WatchErrorKind::Other
        );
    }
}
