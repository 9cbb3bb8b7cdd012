//! Packet-path metrics
//!
//! Thread-safe counters shared between the pipelines and the per-port
//! worker tasks. Counting must never perturb forwarding, so everything is
//! relaxed atomics behind `&self`.

use crate::dataplane::{DropReason, PortId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::RwLock;

/// Atomic event counter
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(&self, val: u64) {
        self.0.fetch_add(val, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Per-port traffic counters
#[derive(Debug, Default)]
pub struct PortStats {
    pub rx_frames: Counter,
    pub rx_bytes: Counter,
    pub tx_frames: Counter,
    pub tx_bytes: Counter,
}

/// Registry of everything the data plane counts
#[derive(Debug, Default)]
pub struct Metrics {
    ports: RwLock<HashMap<PortId, PortStats>>,

    /// IPv4 packets rewritten and emitted by the router
    pub forwarded: Counter,
    /// Frames sent to a single learned port by the switch
    pub switched: Counter,
    /// Unknown-destination floods by the switch
    pub floods: Counter,

    // Router drop reasons
    pub drop_not_ipv4: Counter,
    pub drop_malformed: Counter,
    pub drop_bad_checksum: Counter,
    pub drop_ttl_expired: Counter,
    pub drop_local_delivery: Counter,
    pub drop_no_route: Counter,
    pub drop_no_arp_entry: Counter,

    mac_table_size: AtomicUsize,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_port(&self, port: PortId) {
        self.ports.write().unwrap().entry(port).or_default();
    }

    pub fn record_rx(&self, port: PortId, bytes: usize) {
        if let Some(stats) = self.ports.read().unwrap().get(&port) {
            stats.rx_frames.inc();
            stats.rx_bytes.add(bytes as u64);
        }
    }

    pub fn record_tx(&self, port: PortId, bytes: usize) {
        if let Some(stats) = self.ports.read().unwrap().get(&port) {
            stats.tx_frames.inc();
            stats.tx_bytes.add(bytes as u64);
        }
    }

    pub fn record_forward(&self) {
        self.forwarded.inc();
    }

    pub fn record_switch(&self) {
        self.switched.inc();
    }

    pub fn record_flood(&self) {
        self.floods.inc();
    }

    pub fn record_drop(&self, reason: DropReason) {
        match reason {
            DropReason::NotIpv4 => self.drop_not_ipv4.inc(),
            DropReason::Malformed => self.drop_malformed.inc(),
            DropReason::BadChecksum => self.drop_bad_checksum.inc(),
            DropReason::TtlExpired => self.drop_ttl_expired.inc(),
            DropReason::LocalDelivery => self.drop_local_delivery.inc(),
            DropReason::NoRoute => self.drop_no_route.inc(),
            DropReason::NoArpEntry => self.drop_no_arp_entry.inc(),
        }
    }

    pub fn dropped_total(&self) -> u64 {
        self.drop_not_ipv4.get()
            + self.drop_malformed.get()
            + self.drop_bad_checksum.get()
            + self.drop_ttl_expired.get()
            + self.drop_local_delivery.get()
            + self.drop_no_route.get()
            + self.drop_no_arp_entry.get()
    }

    pub fn set_mac_table_size(&self, size: usize) {
        self.mac_table_size.store(size, Ordering::Relaxed);
    }

    pub fn mac_table_size(&self) -> usize {
        self.mac_table_size.load(Ordering::Relaxed)
    }

    pub fn with_port_stats<T>(&self, port: PortId, f: impl FnOnce(&PortStats) -> T) -> Option<T> {
        self.ports.read().unwrap().get(&port).map(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_increments() {
        let c = Counter::new();
        c.inc();
        c.inc();
        c.add(5);
        assert_eq!(c.get(), 7);
    }

    #[test]
    fn port_stats_require_registration() {
        let m = Metrics::new();
        m.record_rx(0, 100); // unregistered: silently ignored
        assert!(m.with_port_stats(0, |s| s.rx_frames.get()).is_none());

        m.register_port(0);
        m.record_rx(0, 100);
        m.record_tx(0, 60);
        assert_eq!(m.with_port_stats(0, |s| s.rx_frames.get()), Some(1));
        assert_eq!(m.with_port_stats(0, |s| s.rx_bytes.get()), Some(100));
        assert_eq!(m.with_port_stats(0, |s| s.tx_bytes.get()), Some(60));
    }

    #[test]
    fn drop_reasons_are_tallied_separately() {
        let m = Metrics::new();
        m.record_drop(DropReason::BadChecksum);
        m.record_drop(DropReason::BadChecksum);
        m.record_drop(DropReason::NoRoute);

        assert_eq!(m.drop_bad_checksum.get(), 2);
        assert_eq!(m.drop_no_route.get(), 1);
        assert_eq!(m.drop_ttl_expired.get(), 0);
        assert_eq!(m.dropped_total(), 3);
    }

    #[test]
    fn mac_table_gauge() {
        let m = Metrics::new();
        assert_eq!(m.mac_table_size(), 0);
        m.set_mac_table_size(12);
        assert_eq!(m.mac_table_size(), 12);
    }
}
