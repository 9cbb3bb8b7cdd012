//! Frame capture and injection
//!
//! The data plane itself never touches a socket; it consumes frames
//! delivered by this layer and hands back frames to transmit. One
//! `PacketSocket` per configured interface, in promiscuous mode.

mod af_packet;

pub use af_packet::PacketSocket;

use crate::Result;
use std::future::Future;

/// Frame I/O backend for one interface.
pub trait Capture: Send {
    /// Receive one frame into `buf`, returning its length
    fn recv(&mut self, buf: &mut [u8]) -> impl Future<Output = Result<usize>> + Send;

    /// Transmit one frame
    fn send(&mut self, buf: &[u8]) -> impl Future<Output = Result<usize>> + Send;
}
