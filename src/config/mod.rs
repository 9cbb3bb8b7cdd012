//! Configuration
//!
//! A single TOML file selects the device mode, names the interfaces, and
//! (in router mode) points at the route-table and ARP-cache files.

mod types;

pub use types::*;

use crate::{Error, Result};
use std::path::Path;

/// Load and validate a configuration file
pub fn load<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(Error::Io)?;
    let config: Config = toml::from_str(&content).map_err(|e| Error::Config(e.to_string()))?;
    validate(&config)?;
    Ok(config)
}

/// Startup-fatal consistency checks
pub fn validate(config: &Config) -> Result<()> {
    if config.interfaces.is_empty() {
        return Err(Error::Config("no interfaces configured".into()));
    }

    match config.mode {
        Mode::Router => {
            let router = config
                .router
                .as_ref()
                .ok_or_else(|| Error::Config("router mode requires a [router] section".into()))?;
            if router.route_table.as_os_str().is_empty() {
                return Err(Error::Config("router.route_table must be set".into()));
            }
            if router.arp_cache.as_os_str().is_empty() {
                return Err(Error::Config("router.arp_cache must be set".into()));
            }
            for (name, iface) in &config.interfaces {
                if iface.address.is_none() {
                    return Err(Error::Config(format!(
                        "router mode requires an address on interface {}",
                        name
                    )));
                }
            }
        }
        Mode::Switch => {
            if config.interfaces.len() < 2 {
                return Err(Error::Config(
                    "switch mode needs at least 2 interfaces".into(),
                ));
            }
        }
    }

    Ok(())
}
