//! IPv4 forwarding engine
//!
//! One invocation per received frame: validate, decrement TTL, longest-
//! prefix route lookup, static ARP resolution, Ethernet rewrite, emit on
//! the matched egress port. Every failure is a silent drop — IP is
//! best-effort and this device never synthesizes ICMP or any other reply.
//!
//! All tables are read-only here, so `handle_frame` takes `&self` and is
//! safe to call concurrently from one worker per port.

use crate::dataplane::{ArpCache, FrameHandler, PortId, PortTable, RouteTable};
use crate::protocol::ethernet::{Frame, FrameBuilder};
use crate::protocol::ipv4::Ipv4Packet;
use crate::protocol::EtherType;
use crate::telemetry::Metrics;
use std::sync::Arc;
use tracing::{debug, trace};

/// Why a frame was discarded, for accounting only; no reason ever
/// propagates to the sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// EtherType is not IPv4
    NotIpv4,
    /// Frame or IPv4 header failed to parse
    Malformed,
    /// Carried header checksum does not match
    BadChecksum,
    /// TTL reached zero after decrement
    TtlExpired,
    /// Destination is one of this device's own addresses
    LocalDelivery,
    /// No route matched the destination
    NoRoute,
    /// Next hop missing from the static ARP cache
    NoArpEntry,
}

enum Verdict {
    Emit { port: PortId, frame: Vec<u8> },
    Drop(DropReason),
}

/// The router pipeline and the tables it consults
pub struct Router {
    ports: Arc<PortTable>,
    routes: RouteTable,
    arp: ArpCache,
    metrics: Arc<Metrics>,
}

impl Router {
    pub fn new(
        ports: Arc<PortTable>,
        routes: RouteTable,
        arp: ArpCache,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            ports,
            routes,
            arp,
            metrics,
        }
    }

    fn process(&self, frame: &[u8]) -> Verdict {
        let eth = match Frame::parse(frame) {
            Ok(f) => f,
            Err(_) => return Verdict::Drop(DropReason::Malformed),
        };

        if eth.ethertype() != EtherType::Ipv4 as u16 {
            return Verdict::Drop(DropReason::NotIpv4);
        }

        let mut packet = match Ipv4Packet::from_bytes(eth.payload()) {
            Ok(p) => p,
            Err(_) => return Verdict::Drop(DropReason::Malformed),
        };

        if !packet.verify_checksum() {
            return Verdict::Drop(DropReason::BadChecksum);
        }

        if !packet.decrement_ttl() {
            return Verdict::Drop(DropReason::TtlExpired);
        }

        let dst = packet.dst_addr();

        // No local IP stack: destined-for-self traffic is dropped
        if self.ports.owns_ip(dst) {
            return Verdict::Drop(DropReason::LocalDelivery);
        }

        let route = match self.routes.lookup(dst) {
            Some(r) => r,
            None => return Verdict::Drop(DropReason::NoRoute),
        };

        // Directly connected: the destination itself is the next hop
        let next_hop = if route.gateway.is_unspecified() {
            dst
        } else {
            route.gateway
        };

        let next_hop_mac = match self.arp.lookup(next_hop) {
            Some(mac) => mac,
            None => return Verdict::Drop(DropReason::NoArpEntry),
        };

        let egress = match self.ports.get(route.port) {
            Some(p) => p,
            None => return Verdict::Drop(DropReason::NoRoute),
        };

        // The header changed (TTL); the emitted checksum must match it
        packet.update_checksum();

        let out = FrameBuilder::new()
            .dst_mac(next_hop_mac)
            .src_mac(egress.mac)
            .ethertype(EtherType::Ipv4 as u16)
            .payload(packet.as_bytes())
            .build();

        Verdict::Emit {
            port: egress.id,
            frame: out,
        }
    }
}

impl FrameHandler for Router {
    fn handle_frame(&self, frame: &[u8], ingress: PortId) -> Vec<(PortId, Vec<u8>)> {
        self.metrics.record_rx(ingress, frame.len());

        match self.process(frame) {
            Verdict::Emit { port, frame } => {
                trace!(ingress, egress = port, "forwarding IPv4 packet");
                self.metrics.record_forward();
                self.metrics.record_tx(port, frame.len());
                vec![(port, frame)]
            }
            Verdict::Drop(reason) => {
                debug!(ingress, ?reason, "dropping frame");
                self.metrics.record_drop(reason);
                Vec::new()
            }
        }
    }
}
