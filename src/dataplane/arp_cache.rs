//! Static ARP cache (next-hop IP to MAC)
//!
//! Exact-match only. Entries come from a file at startup, one per line:
//!
//! ```text
//! # ip         mac
//! 10.0.1.2     00:00:00:00:01:02
//! ```
//!
//! No aging and no dynamic resolution: a next hop missing from the cache
//! means the packet is dropped.

use crate::protocol::MacAddr;
use crate::{Error, Result};
use std::collections::HashMap;
use std::io::BufRead;
use std::net::Ipv4Addr;
use std::path::Path;

/// Immutable IP-to-MAC cache
#[derive(Debug, Default)]
pub struct ArpCache {
    entries: HashMap<Ipv4Addr, MacAddr>,
}

impl ArpCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, ip: Ipv4Addr, mac: MacAddr) {
        self.entries.insert(ip, mac);
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut cache = Self::new();

        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let lineno = idx + 1;
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() != 2 {
                return Err(Error::Table {
                    table: "arp",
                    line: lineno,
                    reason: format!("expected 2 fields, got {}", fields.len()),
                });
            }

            let ip: Ipv4Addr = fields[0].parse().map_err(|_| Error::Table {
                table: "arp",
                line: lineno,
                reason: format!("invalid IP address: {}", fields[0]),
            })?;
            let mac: MacAddr = fields[1].parse().map_err(|_| Error::Table {
                table: "arp",
                line: lineno,
                reason: format!("invalid MAC address: {}", fields[1]),
            })?;

            cache.insert(ip, mac);
        }

        Ok(cache)
    }

    /// Exact-match lookup of a next-hop address
    pub fn lookup(&self, next_hop: Ipv4Addr) -> Option<MacAddr> {
        self.entries.get(&next_hop).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_exact_lookup() {
        let mut cache = ArpCache::new();
        let mac = MacAddr([0, 0, 0, 0, 1, 2]);
        cache.insert(Ipv4Addr::new(10, 0, 1, 2), mac);

        assert_eq!(cache.lookup(Ipv4Addr::new(10, 0, 1, 2)), Some(mac));
        // Exact match only: a neighbor on the same subnet is a miss
        assert_eq!(cache.lookup(Ipv4Addr::new(10, 0, 1, 3)), None);
    }

    #[test]
    fn load_from_reader() {
        let input = "\
# static arp entries
10.0.1.2   00:00:00:00:01:02
10.0.2.2   00:00:00:00:02:02
";
        let cache = ArpCache::from_reader(input.as_bytes()).unwrap();
        assert_eq!(cache.len(), 2);
        assert_eq!(
            cache.lookup(Ipv4Addr::new(10, 0, 2, 2)),
            Some(MacAddr([0, 0, 0, 0, 2, 2]))
        );
    }

    #[test]
    fn load_rejects_bad_lines() {
        assert!(ArpCache::from_reader("10.0.1.2\n".as_bytes()).is_err());
        assert!(ArpCache::from_reader("10.0.1.2 nonsense\n".as_bytes()).is_err());
        assert!(ArpCache::from_reader("10.0.1 00:00:00:00:01:02\n".as_bytes()).is_err());
    }

    #[test]
    fn last_entry_wins_on_duplicate_ip() {
        let input = "\
10.0.1.2 00:00:00:00:00:01
10.0.1.2 00:00:00:00:00:02
";
        let cache = ArpCache::from_reader(input.as_bytes()).unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(
            cache.lookup(Ipv4Addr::new(10, 0, 1, 2)),
            Some(MacAddr([0, 0, 0, 0, 0, 2]))
        );
    }
}
