//! Port registry
//!
//! Ports are fixed at startup: one per configured interface, with its MAC
//! and, in router mode, its IP address. Both pipelines share a read-only
//! `PortTable`.

use crate::protocol::MacAddr;
use std::collections::HashMap;
use std::net::Ipv4Addr;

/// Port identifier
pub type PortId = u32;

/// A physical ingress/egress point
#[derive(Debug, Clone)]
pub struct Port {
    pub id: PortId,
    pub name: String,
    pub mac: MacAddr,
    /// Set only in router mode
    pub ip: Option<Ipv4Addr>,
}

/// Immutable registry of the device's ports
#[derive(Debug, Default)]
pub struct PortTable {
    ports: Vec<Port>,
    by_name: HashMap<String, PortId>,
}

impl PortTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a port; IDs are assigned in insertion order
    pub fn add(&mut self, name: &str, mac: MacAddr, ip: Option<Ipv4Addr>) -> PortId {
        let id = self.ports.len() as PortId;
        self.by_name.insert(name.to_string(), id);
        self.ports.push(Port {
            id,
            name: name.to_string(),
            mac,
            ip,
        });
        id
    }

    pub fn get(&self, id: PortId) -> Option<&Port> {
        self.ports.get(id as usize)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&Port> {
        self.by_name.get(name).map(|&id| &self.ports[id as usize])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Port> {
        self.ports.iter()
    }

    /// Every port ID except `ingress`, for flooding
    pub fn flood_targets(&self, ingress: PortId) -> Vec<PortId> {
        self.ports
            .iter()
            .map(|p| p.id)
            .filter(|&id| id != ingress)
            .collect()
    }

    /// True when `addr` is the IP of any configured port
    pub fn owns_ip(&self, addr: Ipv4Addr) -> bool {
        self.ports.iter().any(|p| p.ip == Some(addr))
    }

    pub fn len(&self) -> usize {
        self.ports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> PortTable {
        let mut t = PortTable::new();
        t.add("eth0", MacAddr([0, 0, 0, 0, 0, 1]), Some(Ipv4Addr::new(10, 0, 1, 1)));
        t.add("eth1", MacAddr([0, 0, 0, 0, 0, 2]), Some(Ipv4Addr::new(10, 0, 2, 1)));
        t.add("eth2", MacAddr([0, 0, 0, 0, 0, 3]), None);
        t
    }

    #[test]
    fn lookup_by_id_and_name() {
        let t = table();
        assert_eq!(t.len(), 3);
        assert_eq!(t.get(1).unwrap().name, "eth1");
        assert_eq!(t.get_by_name("eth2").unwrap().id, 2);
        assert!(t.get(3).is_none());
        assert!(t.get_by_name("eth9").is_none());
    }

    #[test]
    fn flood_targets_exclude_ingress() {
        let t = table();
        let targets = t.flood_targets(0);
        assert_eq!(targets, vec![1, 2]);
    }

    #[test]
    fn owns_ip_matches_configured_addresses() {
        let t = table();
        assert!(t.owns_ip(Ipv4Addr::new(10, 0, 1, 1)));
        assert!(t.owns_ip(Ipv4Addr::new(10, 0, 2, 1)));
        assert!(!t.owns_ip(Ipv4Addr::new(10, 0, 3, 1)));
    }
}
