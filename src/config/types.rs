use crate::telemetry::LogConfig;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Top-level configuration file
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub mode: Mode,
    /// Interfaces keyed by kernel interface name. Port ids are assigned
    /// in key order, so they are stable across restarts.
    #[serde(default)]
    pub interfaces: BTreeMap<String, InterfaceConfig>,
    pub router: Option<RouterConfig>,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Router,
    Switch,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InterfaceConfig {
    /// Override the MAC read from /sys/class/net/<name>/address
    pub mac: Option<String>,
    /// Interface IPv4 address, required in router mode
    pub address: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouterConfig {
    pub route_table: PathBuf,
    pub arp_cache: PathBuf,
}
