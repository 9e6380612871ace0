//! # Initialization
//!
//! Controller initialization logic including rustls setup, tracing, metrics,
//! server startup, backend verification and Kubernetes client setup.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::backend::{create_backend, Backend};
use crate::cli::Args;
use crate::config::{ControllerConfig, ServerConfig};
use crate::controller::Reconciler;
use crate::observability::server::start_server;
use crate::observability::{Metrics, ServerState};
use crate::record::SecretSource;
use crate::runtime::shutdown::ShutdownSignal;
use crate::runtime::watch_loop::ControlLoop;

/// Everything the binary needs after startup verification passed
pub struct InitializationResult {
    pub args: Args,
    pub controller_config: ControllerConfig,
    pub backend: Arc<dyn Backend>,
    pub reconciler: Arc<Reconciler>,
    pub server_state: Arc<ServerState>,
    pub server_handle: JoinHandle<()>,
    pub shutdown: ShutdownSignal,
}

impl std::fmt::Debug for InitializationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializationResult")
            .field("backend", &self.backend.name())
            .field("server_ready", &self.server_state.is_ready())
            .finish_non_exhaustive()
    }
}

/// Initialize the controller runtime
///
/// This function handles:
/// - rustls crypto provider setup
/// - Tracing subscriber setup
/// - OS signal handling
/// - Configuration validation
/// - Metrics registration
/// - HTTP server startup
/// - Backend creation and connection check
///
/// Any failure here is fatal.
pub async fn initialize(args: Args) -> Result<InitializationResult> {
    install_crypto_provider();

    let controller_config = args.controller_config();
    let server_config = args.server_config();
    init_tracing(&controller_config);

    // Installed before backend verification so startup can be interrupted
    let shutdown = ShutdownSignal::new();
    shutdown.listen_for_os_signals();

    info!("Starting S3 Resource Controller");
    info!(
        "Build info: timestamp={}, datetime={}, git_hash={}",
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_DATETIME"),
        env!("BUILD_GIT_HASH")
    );

    let backend_config = args
        .backend_config()
        .context("Invalid backend configuration")?;
    info!(
        backend = %backend_config.kind,
        endpoint = %backend_config.endpoint_url,
        annotation_key = %controller_config.annotation_key,
        enforce_endpoint_check = controller_config.enforce_endpoint_check,
        "Configuration loaded"
    );

    let metrics = Arc::new(Metrics::new().context("Failed to register metrics")?);
    let server_state = Arc::new(ServerState::new(Arc::clone(&metrics)));

    // Start HTTP server for metrics and probes
    let server_state_clone = Arc::clone(&server_state);
    let port = server_config.metrics_port;
    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(port, server_state_clone).await {
            error!("HTTP server error: {}", e);
        }
    });
    wait_for_server_ready(&server_state, &server_handle, &server_config).await?;

    let backend = create_backend(&backend_config).context("Failed to create backend")?;
    backend.test_connection().await.with_context(|| {
        format!(
            "Backend connection check failed for {} at {}",
            backend.name(),
            backend.endpoint_url()
        )
    })?;

    let reconciler = Arc::new(Reconciler::new(
        Arc::clone(&backend),
        metrics,
        controller_config.enforce_endpoint_check,
    ));

    Ok(InitializationResult {
        args,
        controller_config,
        backend,
        reconciler,
        server_state,
        server_handle,
        shutdown,
    })
}

/// Build the control loop against the Kubernetes API
pub async fn build_control_loop(init: &InitializationResult) -> Result<ControlLoop> {
    let client = kube_client(&init.args).await?;
    let source = Arc::new(SecretSource::new(client));
    Ok(ControlLoop::new(
        source,
        Arc::clone(&init.reconciler),
        init.shutdown.clone(),
        &init.controller_config,
    ))
}

/// Configure rustls crypto provider before anything opens a TLS connection
fn install_crypto_provider() {
    // Fails only when a provider is already installed, which is fine
    let _ = rustls::crypto::ring::default_provider().install_default();
}

/// Install the global tracing subscriber
///
/// `RUST_LOG` wins; otherwise `LOG_LEVEL` applies to this crate.
fn init_tracing(config: &ControllerConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "s3_resource_controller={}",
            config.log_level.to_lowercase()
        )
        .into()
    });

    let result = if config.log_format.eq_ignore_ascii_case("json") {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .try_init()
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).try_init()
    };
    if let Err(e) = result {
        warn!("Tracing subscriber init returned error (may already be initialized): {}", e);
    }
}

async fn kube_client(args: &Args) -> Result<Client> {
    let config = match &args.kubeconfig {
        Some(path) => {
            let kubeconfig = Kubeconfig::read_from(path)
                .with_context(|| format!("Failed to read kubeconfig {}", path.display()))?;
            Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                .await
                .context("Failed to load kubeconfig")?
        }
        None => Config::infer()
            .await
            .context("Failed to infer Kubernetes configuration")?,
    };
    Client::try_from(config).context("Failed to create Kubernetes client")
}

/// Wait for the HTTP server to bind
async fn wait_for_server_ready(
    server_state: &Arc<ServerState>,
    server_handle: &JoinHandle<()>,
    server_config: &ServerConfig,
) -> Result<()> {
    let startup_timeout = Duration::from_secs(server_config.startup_timeout_secs);
    let poll_interval = Duration::from_millis(server_config.poll_interval_ms);
    let start_time = Instant::now();

    loop {
        // Check if server task crashed
        if server_handle.is_finished() {
            return Err(anyhow::anyhow!("HTTP server failed to start"));
        }

        if server_state.is_serving() {
            debug!("HTTP server is accepting connections");
            return Ok(());
        }

        if start_time.elapsed() > startup_timeout {
            return Err(anyhow::anyhow!(
                "HTTP server failed to become ready within {} seconds",
                startup_timeout.as_secs()
            ));
        }

        tokio::time::sleep(poll_interval).await;
    }
}
