//! psiwatch Daemon
//!
//! Wires configuration, trigger registration, the multiplexed wait and the
//! shutdown drain into a long-running pressure monitor.

pub mod config;
pub mod monitor;

pub use config::Config;
pub use monitor::{PressureMonitor, RunSummary};
