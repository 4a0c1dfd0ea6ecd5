use byteorder::{BigEndian, ByteOrder};
use tracing::{trace, warn};

use crate::layer::Packet;

use super::NetworkLayer;

const INDEX_LEN: usize = 4;

/// Network layer that emits numbered packets and checks that the peer's
/// numbered packets arrive in order, exactly once and intact.
pub struct CountingNetwork {
    packet_len: usize,
    to_send: u32,
    to_receive: u32,
    sent: u32,
    received: u32,
    errors: u32,
}

impl CountingNetwork {
    #[must_use]
    pub fn new(packet_len: usize, to_send: u32, to_receive: u32) -> Self {
        assert!(packet_len >= INDEX_LEN);
        CountingNetwork {
            packet_len,
            to_send,
            to_receive,
            sent: 0,
            received: 0,
            errors: 0,
        }
    }

    #[must_use]
    #[inline]
    pub fn sent(&self) -> u32 {
        self.sent
    }

    #[must_use]
    #[inline]
    pub fn received(&self) -> u32 {
        self.received
    }

    #[must_use]
    #[inline]
    pub fn errors(&self) -> u32 {
        self.errors
    }

    /// All packets handed out and all expected packets delivered.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.sent == self.to_send && self.received >= self.to_receive
    }

    fn packet(&self, index: u32) -> Packet {
        let mut packet = vec![0; self.packet_len];
        BigEndian::write_u32(&mut packet[..INDEX_LEN], index);
        for (i, byte) in packet[INDEX_LEN..].iter_mut().enumerate() {
            *byte = (index as usize).wrapping_add(i) as u8;
        }
        packet
    }
}

impl NetworkLayer for CountingNetwork {
    fn get_packet(&mut self) -> Option<Packet> {
        if self.sent == self.to_send {
            return None;
        }
        let packet = self.packet(self.sent);
        self.sent += 1;
        Some(packet)
    }

    fn deliver(&mut self, packet: Packet) {
        let expected = self.packet(self.received);
        if packet != expected {
            self.errors += 1;
            let index = match packet.len() >= INDEX_LEN {
                true => Some(BigEndian::read_u32(&packet[..INDEX_LEN])),
                false => None,
            };
            warn!(expected = self.received, ?index, len = packet.len(), "unexpected packet");
        } else {
            trace!(index = self.received, "packet delivered");
        }
        self.received += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loopback() {
        let mut a = CountingNetwork::new(8, 3, 0);
        let mut b = CountingNetwork::new(8, 0, 3);
        while let Some(packet) = a.get_packet() {
            assert_eq!(packet.len(), 8);
            b.deliver(packet);
        }
        assert_eq!(a.sent(), 3);
        assert!(a.is_complete());
        assert_eq!(b.received(), 3);
        assert_eq!(b.errors(), 0);
        assert!(b.is_complete());
    }

    #[test]
    fn test_packet_index() {
        let mut a = CountingNetwork::new(4, 2, 0);
        assert_eq!(a.get_packet(), Some(vec![0, 0, 0, 0]));
        assert_eq!(a.get_packet(), Some(vec![0, 0, 0, 1]));
        assert_eq!(a.get_packet(), None);
    }

    #[test]
    fn test_out_of_order() {
        let mut a = CountingNetwork::new(6, 2, 0);
        let mut b = CountingNetwork::new(6, 0, 2);
        let first = a.get_packet().unwrap();
        let second = a.get_packet().unwrap();
        b.deliver(second);
        b.deliver(first);
        assert_eq!(b.errors(), 2);
    }

    #[test]
    fn test_damaged() {
        let mut a = CountingNetwork::new(6, 1, 0);
        let mut b = CountingNetwork::new(6, 0, 1);
        let mut packet = a.get_packet().unwrap();
        packet[5] ^= 1;
        b.deliver(packet);
        assert_eq!(b.errors(), 1);
    }
}
