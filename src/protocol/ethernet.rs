//! Ethernet II frame parsing and construction

use super::MacAddr;
use crate::{Error, Result};

/// Header size of an untagged Ethernet II frame
pub const HEADER_SIZE: usize = 14;
/// Maximum frame size accepted from the wire (without FCS)
pub const MAX_FRAME_SIZE: usize = 1518;

/// Parsed Ethernet frame (zero-copy reference)
#[derive(Debug)]
pub struct Frame<'a> {
    buffer: &'a [u8],
}

impl<'a> Frame<'a> {
    pub fn parse(buffer: &'a [u8]) -> Result<Self> {
        if buffer.len() < HEADER_SIZE {
            return Err(Error::Parse("Ethernet frame too short".into()));
        }
        Ok(Self { buffer })
    }

    pub fn dst_mac(&self) -> MacAddr {
        MacAddr(self.buffer[0..6].try_into().unwrap())
    }

    pub fn src_mac(&self) -> MacAddr {
        MacAddr(self.buffer[6..12].try_into().unwrap())
    }

    pub fn ethertype(&self) -> u16 {
        u16::from_be_bytes([self.buffer[12], self.buffer[13]])
    }

    pub fn payload(&self) -> &[u8] {
        &self.buffer[HEADER_SIZE..]
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.buffer
    }
}

/// Builder for constructing Ethernet frames
pub struct FrameBuilder {
    buffer: Vec<u8>,
}

impl FrameBuilder {
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(MAX_FRAME_SIZE),
        }
    }

    pub fn dst_mac(mut self, mac: MacAddr) -> Self {
        self.buffer.extend_from_slice(&mac.0);
        self
    }

    pub fn src_mac(mut self, mac: MacAddr) -> Self {
        self.buffer.extend_from_slice(&mac.0);
        self
    }

    pub fn ethertype(mut self, ethertype: u16) -> Self {
        self.buffer.extend_from_slice(&ethertype.to_be_bytes());
        self
    }

    pub fn payload(mut self, payload: &[u8]) -> Self {
        self.buffer.extend_from_slice(payload);
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.buffer
    }
}

impl Default for FrameBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::EtherType;

    fn sample_frame() -> Vec<u8> {
        FrameBuilder::new()
            .dst_mac(MacAddr([0x00, 0x11, 0x22, 0x33, 0x44, 0x55]))
            .src_mac(MacAddr([0x66, 0x77, 0x88, 0x99, 0xaa, 0xbb]))
            .ethertype(EtherType::Ipv4 as u16)
            .payload(&[0xde, 0xad, 0xbe, 0xef])
            .build()
    }

    #[test]
    fn parse_header_fields() {
        let data = sample_frame();
        let frame = Frame::parse(&data).unwrap();

        assert_eq!(frame.dst_mac(), MacAddr([0x00, 0x11, 0x22, 0x33, 0x44, 0x55]));
        assert_eq!(frame.src_mac(), MacAddr([0x66, 0x77, 0x88, 0x99, 0xaa, 0xbb]));
        assert_eq!(frame.ethertype(), 0x0800);
        assert_eq!(frame.payload(), &[0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(frame.as_bytes(), &data[..]);
    }

    #[test]
    fn parse_rejects_runt() {
        let runt = vec![0u8; HEADER_SIZE - 1];
        assert!(Frame::parse(&runt).is_err());
    }

    #[test]
    fn parse_accepts_empty_payload() {
        let frame = Frame::parse(&[0u8; HEADER_SIZE]).unwrap();
        assert!(frame.payload().is_empty());
    }

    #[test]
    fn rewrite_preserves_payload() {
        let data = sample_frame();
        let frame = Frame::parse(&data).unwrap();

        // A forwarding rewrite: new MACs, same ethertype and payload
        let new_src = MacAddr([1, 2, 3, 4, 5, 6]);
        let new_dst = MacAddr([6, 5, 4, 3, 2, 1]);
        let rewritten = FrameBuilder::new()
            .dst_mac(new_dst)
            .src_mac(new_src)
            .ethertype(frame.ethertype())
            .payload(frame.payload())
            .build();

        let out = Frame::parse(&rewritten).unwrap();
        assert_eq!(out.dst_mac(), new_dst);
        assert_eq!(out.src_mac(), new_src);
        assert_eq!(out.payload(), frame.payload());
    }
}
