//! vnetd - Userspace virtual network device
//!
//! A software data plane that runs as either an IPv4 router or an
//! Ethernet learning switch over raw packet sockets. The routing and
//! address-resolution tables are static, loaded from files at startup.

pub mod capture;
pub mod config;
pub mod dataplane;
pub mod error;
pub mod protocol;
pub mod telemetry;

pub use error::{Error, Result};
