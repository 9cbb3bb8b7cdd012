//! Data plane components
//!
//! The two frame-handling pipelines (IPv4 router, learning switch) and the
//! tables they consult. Each pipeline is a pure function of
//! (frame, ingress port, table state) that returns the frames to emit.

mod arp_cache;
mod mac_table;
mod port;
mod route_table;
mod router;
mod switch;

pub use arp_cache::ArpCache;
pub use mac_table::{MacTable, MAC_TIMEOUT};
pub use port::{Port, PortId, PortTable};
pub use route_table::{RouteEntry, RouteTable};
pub use router::{DropReason, Router};
pub use switch::Switch;

/// Contract between the frame-delivery collaborator and a pipeline.
///
/// One invocation per received frame. The return value lists the frames to
/// hand to the transmission collaborator; an empty list means the frame was
/// silently dropped (or filtered), which is never an error.
pub trait FrameHandler: Send + Sync {
    fn handle_frame(&self, frame: &[u8], ingress: PortId) -> Vec<(PortId, Vec<u8>)>;
}
