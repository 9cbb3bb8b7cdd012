//! Telemetry: logging and packet-path metrics

mod logging;
mod metrics;

pub use logging::{init_logging, LogConfig};
pub use metrics::{Counter, Metrics, PortStats};
