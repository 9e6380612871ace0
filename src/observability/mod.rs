//! # Observability
//!
//! - `metrics`: Prometheus counters and histograms owned by [`Metrics`]
//! - `server`: axum server exposing `/metrics`, `/healthz` and `/readyz`

pub mod metrics;
pub mod server;

pub use metrics::Metrics;
pub use server::ServerState;
