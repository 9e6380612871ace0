//! # S3 Resource Controller
//!
//! A Kubernetes controller that provisions S3 buckets and users on an
//! S3-compatible gateway from annotated Secrets.
//!
//! ## Overview
//!
//! 1. **Startup** - Validates configuration, starts the metrics server and verifies the backend
//! 2. **Bootstrap sync** - Reconciles every annotated Secret that already exists
//! 3. **Watch** - Reconciles Secrets as they are added or modified, reconnecting as needed
//!
//! Exit status is 0 on a clean shutdown and non-zero on misconfiguration,
//! backend verification failure, or an unhandled runtime error.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use s3_resource_controller::cli::Args;
use s3_resource_controller::runtime::initialization::{build_control_loop, initialize};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let init = initialize(args).await?;

    if init.shutdown.is_triggered() {
        info!("Shutdown requested during startup, exiting");
        return Ok(());
    }

    if init.args.check_connection {
        info!("Backend connection check passed, exiting");
        return Ok(());
    }

    let mut control_loop = build_control_loop(&init).await?;

    // Mark server as not ready as soon as shutdown is requested
    let shutdown = init.shutdown.clone();
    let server_state = Arc::clone(&init.server_state);
    tokio::spawn(async move {
        shutdown.wait().await;
        server_state.set_ready(false);
        info!("Marked server as not ready, waiting for in-flight reconciliation to complete...");
    });

    init.server_state.set_ready(true);
    info!("Controller initialized");

    if init.args.sync_once {
        let summary = control_loop.bootstrap_sync().await;
        init.server_handle.abort();
        if summary.failed > 0 {
            anyhow::bail!(
                "{} of {} secrets failed to reconcile",
                summary.failed,
                summary.total
            );
        }
        return Ok(());
    }

    control_loop.run().await;
    init.server_handle.abort();
    info!("Controller stopped");
    Ok(())
}
