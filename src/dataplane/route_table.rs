//! Static route table with longest-prefix-match lookup
//!
//! Loaded once at startup from a line-oriented file, one route per line:
//!
//! ```text
//! # destination  gateway   mask             interface
//! 10.0.1.0       0.0.0.0   255.255.255.0    eth1
//! 0.0.0.0        10.0.1.1  0.0.0.0          eth1
//! ```
//!
//! A gateway of 0.0.0.0 marks a directly connected network. Entries are
//! immutable after load; lookups take `&self` and are safe under concurrent
//! forwarding invocations.

use crate::dataplane::{PortId, PortTable};
use crate::{Error, Result};
use std::io::BufRead;
use std::net::Ipv4Addr;
use std::path::Path;

/// One destination-prefix entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEntry {
    pub destination: Ipv4Addr,
    pub mask: Ipv4Addr,
    /// 0.0.0.0 means directly connected: the next hop is the
    /// destination address itself
    pub gateway: Ipv4Addr,
    pub port: PortId,
}

impl RouteEntry {
    fn matches(&self, addr: Ipv4Addr) -> bool {
        let mask = u32::from(self.mask);
        (u32::from(addr) & mask) == (u32::from(self.destination) & mask)
    }

    fn mask_len(&self) -> u32 {
        u32::from(self.mask).count_ones()
    }
}

/// Route table using longest-prefix match
#[derive(Debug, Default)]
pub struct RouteTable {
    entries: Vec<RouteEntry>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a route, keeping entries sorted longest mask first so lookup can
    /// return the first match. The sort is stable: equal-length masks keep
    /// insertion order.
    pub fn add(&mut self, entry: RouteEntry) {
        self.entries.push(entry);
        self.entries.sort_by(|a, b| b.mask_len().cmp(&a.mask_len()));
    }

    /// Load routes from a file, resolving interface names against `ports`.
    /// Any malformed line is an error: a partially loaded table must never
    /// see traffic.
    pub fn load<P: AsRef<Path>>(path: P, ports: &PortTable) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(std::io::BufReader::new(file), ports)
    }

    pub fn from_reader<R: BufRead>(reader: R, ports: &PortTable) -> Result<Self> {
        let mut table = Self::new();

        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            table.add(parse_line(line, idx + 1, ports)?);
        }

        Ok(table)
    }

    /// Longest-prefix match: the matching entry with the most mask bits set.
    /// Equal-length ties resolve to load order.
    pub fn lookup(&self, addr: Ipv4Addr) -> Option<&RouteEntry> {
        self.entries.iter().find(|e| e.matches(addr))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn parse_line(line: &str, lineno: usize, ports: &PortTable) -> Result<RouteEntry> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != 4 {
        return Err(Error::Table {
            table: "route",
            line: lineno,
            reason: format!("expected 4 fields, got {}", fields.len()),
        });
    }

    let addr = |s: &str, what: &str| -> Result<Ipv4Addr> {
        s.parse().map_err(|_| Error::Table {
            table: "route",
            line: lineno,
            reason: format!("invalid {}: {}", what, s),
        })
    };

    let destination = addr(fields[0], "destination")?;
    let gateway = addr(fields[1], "gateway")?;
    let mask = addr(fields[2], "mask")?;

    let port = ports
        .get_by_name(fields[3])
        .ok_or_else(|| Error::Table {
            table: "route",
            line: lineno,
            reason: format!("unknown interface: {}", fields[3]),
        })?
        .id;

    Ok(RouteEntry {
        destination,
        mask,
        gateway,
        port,
    })
}
