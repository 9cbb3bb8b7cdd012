//! Ethernet learning switch
//!
//! Per frame: sweep expired MAC-table entries, learn the source address,
//! then forward to the learned destination port or flood everywhere except
//! the ingress port. The MAC table is internally synchronized, so
//! `handle_frame` takes `&self` and runs concurrently from one worker per
//! port.

use crate::dataplane::{FrameHandler, MacTable, PortId, PortTable};
use crate::protocol::ethernet::Frame;
use crate::telemetry::Metrics;
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

pub struct Switch {
    ports: Arc<PortTable>,
    mac_table: MacTable,
    metrics: Arc<Metrics>,
}

impl Switch {
    pub fn new(ports: Arc<PortTable>, metrics: Arc<Metrics>) -> Self {
        Self {
            ports,
            mac_table: MacTable::default(),
            metrics,
        }
    }

    /// Switch with a shortened aging timeout, for tests
    pub fn with_timeout(ports: Arc<PortTable>, metrics: Arc<Metrics>, timeout: Duration) -> Self {
        Self {
            ports,
            mac_table: MacTable::new(timeout),
            metrics,
        }
    }

    pub fn mac_table(&self) -> &MacTable {
        &self.mac_table
    }
}

impl FrameHandler for Switch {
    fn handle_frame(&self, frame: &[u8], ingress: PortId) -> Vec<(PortId, Vec<u8>)> {
        self.metrics.record_rx(ingress, frame.len());

        // Guard: an unparsable frame is dropped without touching the table
        let eth = match Frame::parse(frame) {
            Ok(f) => f,
            Err(_) => return Vec::new(),
        };

        self.mac_table.sweep();
        self.mac_table.learn(eth.src_mac(), ingress);
        self.metrics.set_mac_table_size(self.mac_table.len());

        match self.mac_table.lookup(eth.dst_mac()) {
            Some(port) if port != ingress => {
                trace!(ingress, egress = port, "switching frame");
                self.metrics.record_switch();
                self.metrics.record_tx(port, frame.len());
                vec![(port, frame.to_vec())]
            }
            Some(_) => {
                // Destination lives on the ingress port; never loop a frame
                // back out where it came from
                trace!(ingress, "filtering frame to its own segment");
                Vec::new()
            }
            None => {
                let targets = self.ports.flood_targets(ingress);
                trace!(ingress, n = targets.len(), "flooding unknown destination");
                self.metrics.record_flood();
                targets
                    .into_iter()
                    .map(|port| {
                        self.metrics.record_tx(port, frame.len());
                        (port, frame.to_vec())
                    })
                    .collect()
            }
        }
    }
}
