//! # Runtime
//!
//! Process bootstrap and the long-running control loop.

pub mod error_policy;
pub mod initialization;
pub mod shutdown;
pub mod watch_loop;

pub use shutdown::ShutdownSignal;
pub use watch_loop::{ControlLoop, SyncSummary};
