//! # Shutdown Signal
//!
//! Process-wide stop flag. Set once, never reset, observed cooperatively by
//! the control loop.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

/// Cloneable handle to the shared stop flag
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    sender: Arc<watch::Sender<bool>>,
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Request shutdown; later calls are no-ops
    pub fn trigger(&self) {
        let was_triggered = self.sender.send_replace(true);
        if !was_triggered {
            info!("Shutdown requested");
        }
    }

    pub fn is_triggered(&self) -> bool {
        *self.sender.borrow()
    }

    /// Resolve once shutdown has been requested (immediately if it already was)
    pub async fn wait(&self) {
        let mut receiver = self.sender.subscribe();
        // The sender lives as long as `self`, so the channel cannot close here
        let _ = receiver.wait_for(|triggered| *triggered).await;
    }

    /// Trigger on SIGINT or SIGTERM
    ///
    /// The SIGTERM handler is registered before this returns, so a signal
    /// arriving right after the call is not lost to the default handler.
    pub fn listen_for_os_signals(&self) {
        let signal = self.clone();
        let os_signal = os_signal();
        tokio::spawn(async move {
            os_signal.await;
            info!("Received shutdown signal (SIGINT/SIGTERM), initiating graceful shutdown...");
            signal.trigger();
        });
    }
}

#[cfg(unix)]
fn os_signal() -> impl std::future::Future<Output = ()> + Send + 'static {
    use tokio::signal::unix::{signal, SignalKind};

    let sigterm = signal(SignalKind::terminate());
    async move {
        match sigterm {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler, listening for SIGINT only");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
}

#[cfg(not(unix))]
fn os_signal() -> impl std::future::Future<Output = ()> + Send + 'static {
    async {
        let _ = tokio::signal::ctrl_c().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_trigger_is_sticky_and_shared() {
        let signal = ShutdownSignal::new();
        let clone = signal.clone();
        assert!(!clone.is_triggered());

        signal.trigger();
        signal.trigger();
        assert!(clone.is_triggered());
        assert!(signal.is_triggered());
    }

    #[tokio::test]
    async fn test_wait_resolves_after_trigger() {
        let signal = ShutdownSignal::new();
        let waiter = {
            let signal = signal.clone();
            tokio::spawn(async move { signal.wait().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        signal.trigger();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("wait() should resolve after trigger")
            .unwrap();
    }

    #[tokio::test]
    async fn test_wait_returns_immediately_when_already_triggered() {
        let signal = ShutdownSignal::new();
        signal.trigger();
        tokio::time::timeout(Duration::from_millis(100), signal.wait())
            .await
            .expect("already-triggered signal should not block");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_sigterm_triggers_signal() {
        let signal = ShutdownSignal::new();
        signal.listen_for_os_signals();

        let status = std::process::Command::new("kill")
            .args(["-TERM", &std::process::id().to_string()])
            .status()
            .unwrap();
        assert!(status.success());

        tokio::time::timeout(Duration::from_secs(5), signal.wait())
            .await
            .expect("SIGTERM should trigger shutdown");
        assert!(signal.is_triggered());
    }
}
