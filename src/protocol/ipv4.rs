//! IPv4 header handling - RFC 791
//!
//! The forwarding path needs exactly three things from IPv4: carried-checksum
//! verification, TTL decrement with checksum recompute, and the destination
//! address. Options are carried opaquely; the checksum span always covers the
//! full `ihl * 4` bytes.

use crate::{Error, Result};
use std::net::Ipv4Addr;

/// Minimum IPv4 header size (IHL = 5, no options)
pub const MIN_HEADER_SIZE: usize = 20;

/// RFC 1071 one's-complement checksum over a header byte span.
///
/// Sums 16-bit big-endian words, folds carries from bits 16+ back into the
/// low 16 bits until none remain, and complements the result. A trailing odd
/// byte is padded with zero.
pub fn checksum(header: &[u8]) -> u16 {
    let mut sum: u32 = 0;

    for chunk in header.chunks(2) {
        let word = if chunk.len() == 2 {
            u16::from_be_bytes([chunk[0], chunk[1]])
        } else {
            u16::from_be_bytes([chunk[0], 0])
        };
        sum += word as u32;
    }

    while sum >> 16 != 0 {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }

    !(sum as u16)
}

/// Parsed IPv4 header (zero-copy reference)
#[derive(Debug)]
pub struct Ipv4Header<'a> {
    buffer: &'a [u8],
    header_len: usize,
}

impl<'a> Ipv4Header<'a> {
    pub fn parse(buffer: &'a [u8]) -> Result<Self> {
        let header_len = validate(buffer)?;
        Ok(Self { buffer, header_len })
    }

    pub fn ihl(&self) -> u8 {
        self.buffer[0] & 0x0F
    }

    pub fn ttl(&self) -> u8 {
        self.buffer[8]
    }

    pub fn protocol(&self) -> u8 {
        self.buffer[9]
    }

    pub fn carried_checksum(&self) -> u16 {
        u16::from_be_bytes([self.buffer[10], self.buffer[11]])
    }

    pub fn src_addr(&self) -> Ipv4Addr {
        Ipv4Addr::from(<[u8; 4]>::try_from(&self.buffer[12..16]).unwrap())
    }

    pub fn dst_addr(&self) -> Ipv4Addr {
        Ipv4Addr::from(<[u8; 4]>::try_from(&self.buffer[16..20]).unwrap())
    }

    pub fn header_len(&self) -> usize {
        self.header_len
    }

    pub fn payload(&self) -> &[u8] {
        &self.buffer[self.header_len..]
    }
}

fn validate(data: &[u8]) -> Result<usize> {
    if data.len() < MIN_HEADER_SIZE {
        return Err(Error::Parse("IPv4 header too short".into()));
    }
    if data[0] >> 4 != 4 {
        return Err(Error::Parse("not an IPv4 packet".into()));
    }
    let header_len = ((data[0] & 0x0F) as usize) * 4;
    if header_len < MIN_HEADER_SIZE || data.len() < header_len {
        return Err(Error::Parse("IPv4 header truncated".into()));
    }
    Ok(header_len)
}

/// Owned, mutable IPv4 packet for the forwarding path
#[derive(Debug, Clone)]
pub struct Ipv4Packet {
    buffer: Vec<u8>,
    header_len: usize,
}

impl Ipv4Packet {
    /// Copy a packet out of a frame payload
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let header_len = validate(data)?;
        Ok(Self {
            buffer: data.to_vec(),
            header_len,
        })
    }

    pub fn ttl(&self) -> u8 {
        self.buffer[8]
    }

    pub fn dst_addr(&self) -> Ipv4Addr {
        Ipv4Addr::from(<[u8; 4]>::try_from(&self.buffer[16..20]).unwrap())
    }

    pub fn src_addr(&self) -> Ipv4Addr {
        Ipv4Addr::from(<[u8; 4]>::try_from(&self.buffer[12..16]).unwrap())
    }

    /// Recompute the header checksum with the field zeroed and compare
    /// against the carried value. The carried bytes are left untouched.
    pub fn verify_checksum(&self) -> bool {
        let carried = u16::from_be_bytes([self.buffer[10], self.buffer[11]]);

        let mut header = self.buffer[..self.header_len].to_vec();
        header[10] = 0;
        header[11] = 0;

        checksum(&header) == carried
    }

    /// Decrement TTL by one. Returns false when the decremented value is
    /// zero, in which case the packet must be dropped and the buffer is
    /// left unchanged. The checksum is not touched here; callers recompute
    /// it via `update_checksum` before transmission.
    pub fn decrement_ttl(&mut self) -> bool {
        if self.buffer[8] <= 1 {
            return false;
        }
        self.buffer[8] -= 1;
        true
    }

    /// Recompute the header checksum in place
    pub fn update_checksum(&mut self) {
        self.buffer[10] = 0;
        self.buffer[11] = 0;
        let sum = checksum(&self.buffer[..self.header_len]);
        self.buffer[10..12].copy_from_slice(&sum.to_be_bytes());
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }
}

/// Builder for constructing IPv4 packets (tests and tooling)
#[derive(Debug, Clone)]
pub struct Ipv4Builder {
    ttl: u8,
    protocol: u8,
    identification: u16,
    src_addr: Ipv4Addr,
    dst_addr: Ipv4Addr,
    payload: Vec<u8>,
}

impl Ipv4Builder {
    pub fn new() -> Self {
        Self {
            ttl: 64,
            protocol: 0,
            identification: 0,
            src_addr: Ipv4Addr::UNSPECIFIED,
            dst_addr: Ipv4Addr::UNSPECIFIED,
            payload: Vec::new(),
        }
    }

    pub fn ttl(mut self, ttl: u8) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn protocol(mut self, protocol: u8) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn identification(mut self, id: u16) -> Self {
        self.identification = id;
        self
    }

    pub fn src_addr(mut self, addr: Ipv4Addr) -> Self {
        self.src_addr = addr;
        self
    }

    pub fn dst_addr(mut self, addr: Ipv4Addr) -> Self {
        self.dst_addr = addr;
        self
    }

    pub fn payload(mut self, payload: &[u8]) -> Self {
        self.payload = payload.to_vec();
        self
    }

    pub fn build(self) -> Vec<u8> {
        let total_length = (MIN_HEADER_SIZE + self.payload.len()) as u16;
        let mut buffer = vec![0u8; MIN_HEADER_SIZE + self.payload.len()];

        buffer[0] = 0x45; // version 4, IHL 5
        buffer[2..4].copy_from_slice(&total_length.to_be_bytes());
        buffer[4..6].copy_from_slice(&self.identification.to_be_bytes());
        buffer[6] = 0x40; // DF
        buffer[8] = self.ttl;
        buffer[9] = self.protocol;
        buffer[12..16].copy_from_slice(&self.src_addr.octets());
        buffer[16..20].copy_from_slice(&self.dst_addr.octets());
        buffer[MIN_HEADER_SIZE..].copy_from_slice(&self.payload);

        let sum = checksum(&buffer[..MIN_HEADER_SIZE]);
        buffer[10..12].copy_from_slice(&sum.to_be_bytes());

        buffer
    }
}

impl Default for Ipv4Builder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_packet(ttl: u8) -> Vec<u8> {
        Ipv4Builder::new()
            .src_addr(Ipv4Addr::new(10, 0, 1, 2))
            .dst_addr(Ipv4Addr::new(10, 0, 2, 2))
            .ttl(ttl)
            .protocol(17)
            .payload(&[1, 2, 3, 4])
            .build()
    }

    #[test]
    fn header_parse() {
        let data = sample_packet(64);
        let hdr = Ipv4Header::parse(&data).unwrap();

        assert_eq!(hdr.ihl(), 5);
        assert_eq!(hdr.header_len(), 20);
        assert_eq!(hdr.ttl(), 64);
        assert_eq!(hdr.protocol(), 17);
        assert_eq!(hdr.src_addr(), Ipv4Addr::new(10, 0, 1, 2));
        assert_eq!(hdr.dst_addr(), Ipv4Addr::new(10, 0, 2, 2));
        assert_eq!(hdr.payload(), &[1, 2, 3, 4]);

        // The carried checksum equals the sum over the header with the
        // checksum field zeroed
        let mut zeroed = data[..20].to_vec();
        zeroed[10] = 0;
        zeroed[11] = 0;
        assert_eq!(hdr.carried_checksum(), checksum(&zeroed));
    }

    #[test]
    fn parse_rejects_short_and_wrong_version() {
        assert!(Ipv4Header::parse(&[0u8; 19]).is_err());

        let mut v6 = sample_packet(64);
        v6[0] = 0x65;
        assert!(Ipv4Header::parse(&v6).is_err());
    }

    #[test]
    fn parse_rejects_bogus_ihl() {
        let mut data = sample_packet(64);
        data[0] = 0x44; // IHL 4 = 16 bytes, below the minimum
        assert!(Ipv4Header::parse(&data).is_err());

        data[0] = 0x4F; // IHL 15 = 60 bytes, longer than the buffer
        assert!(Ipv4Header::parse(&data).is_err());
    }

    #[test]
    fn checksum_folds_carries() {
        // Words that overflow 16 bits more than once during folding
        let data = [0xFF, 0xFF, 0xFF, 0xFF, 0x00, 0x02];
        // 0xFFFF + 0xFFFF + 0x0002 = 0x20000 -> fold -> 0x0002 -> complement
        assert_eq!(checksum(&data), !0x0002u16);
    }

    #[test]
    fn checksum_pads_odd_length() {
        let even = [0x12, 0x34, 0x56, 0x00];
        let odd = [0x12, 0x34, 0x56];
        assert_eq!(checksum(&even), checksum(&odd));
    }

    #[test]
    fn verify_checksum_good_and_corrupted() {
        let data = sample_packet(64);
        let pkt = Ipv4Packet::from_bytes(&data).unwrap();
        assert!(pkt.verify_checksum());

        let mut bad = data.clone();
        bad[10] ^= 0xFF;
        let pkt = Ipv4Packet::from_bytes(&bad).unwrap();
        assert!(!pkt.verify_checksum());
    }

    #[test]
    fn verify_checksum_detects_payload_independent_corruption() {
        // Flipping a header byte (not the checksum field) breaks verification
        let mut data = sample_packet(64);
        data[8] = data[8].wrapping_add(1); // TTL changed without recompute
        let pkt = Ipv4Packet::from_bytes(&data).unwrap();
        assert!(!pkt.verify_checksum());
    }

    #[test]
    fn decrement_ttl_and_recompute() {
        let data = sample_packet(64);
        let mut pkt = Ipv4Packet::from_bytes(&data).unwrap();

        assert!(pkt.decrement_ttl());
        assert_eq!(pkt.ttl(), 63);

        pkt.update_checksum();
        assert!(pkt.verify_checksum());
    }

    #[test]
    fn decrement_ttl_refuses_expiry() {
        let mut pkt = Ipv4Packet::from_bytes(&sample_packet(1)).unwrap();
        assert!(!pkt.decrement_ttl());
        assert_eq!(pkt.ttl(), 1);

        let mut pkt = Ipv4Packet::from_bytes(&sample_packet(0)).unwrap();
        assert!(!pkt.decrement_ttl());
    }

    #[test]
    fn builder_emits_valid_checksum() {
        let data = sample_packet(128);
        let pkt = Ipv4Packet::from_bytes(&data).unwrap();
        assert!(pkt.verify_checksum());
        assert_eq!(pkt.ttl(), 128);
    }
}
