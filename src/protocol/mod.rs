//! Wire formats
//!
//! Only the two formats the data plane manipulates: Ethernet II frames
//! and IPv4 headers.

pub mod ethernet;
pub mod ipv4;
pub mod types;

pub use types::{EtherType, MacAddr};
