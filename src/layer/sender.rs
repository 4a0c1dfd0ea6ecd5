use tracing::debug;

use crate::utils::{between, Seq, SeqSpace, SlotBuf};

use super::Packet;

/// Sending half of the sliding window.
///
/// Outstanding frames live in `[ack_expected, next_frame_to_send)` and their
/// payloads stay in `out_buf` until acknowledged.
pub struct Sender {
    space: SeqSpace,
    ack_expected: Seq,
    next_frame_to_send: Seq,
    nbuffered: usize,
    out_buf: SlotBuf<Packet>,

    // stat
    stat: LocalStat,
}

impl Sender {
    fn check_rep(&self) {
        assert!(self.nbuffered <= self.out_buf.len());
        assert_eq!(
            self.space.distance(self.ack_expected, self.next_frame_to_send),
            self.nbuffered
        );
        assert_eq!(self.out_buf.occupied(), self.nbuffered);
    }

    #[must_use]
    pub fn new(space: SeqSpace) -> Self {
        let this = Sender {
            space,
            ack_expected: Seq::from_u8(0),
            next_frame_to_send: Seq::from_u8(0),
            nbuffered: 0,
            out_buf: SlotBuf::new(space.window_size()),
            stat: LocalStat {
                pushes: 0,
                retransmissions: 0,
                timeouts: 0,
                nak_retransmissions: 0,
                acked: 0,
            },
        };
        this.check_rep();
        this
    }

    #[must_use]
    pub fn stat(&self) -> Stat {
        Stat {
            pushes: self.stat.pushes,
            retransmissions: self.stat.retransmissions,
            timeouts: self.stat.timeouts,
            nak_retransmissions: self.stat.nak_retransmissions,
            acked: self.stat.acked,
            next_frame_to_send: self.next_frame_to_send,
        }
    }

    #[must_use]
    #[inline]
    pub fn ack_expected(&self) -> Seq {
        self.ack_expected
    }

    #[must_use]
    #[inline]
    pub fn next_frame_to_send(&self) -> Seq {
        self.next_frame_to_send
    }

    #[must_use]
    #[inline]
    pub fn nbuffered(&self) -> usize {
        self.nbuffered
    }

    #[must_use]
    #[inline]
    pub fn is_full(&self) -> bool {
        self.nbuffered >= self.out_buf.len()
    }

    #[must_use]
    #[inline]
    pub fn slot(&self, seq: Seq) -> usize {
        self.out_buf.slot(seq)
    }

    #[must_use]
    #[inline]
    pub fn is_outstanding(&self, seq: Seq) -> bool {
        between(self.ack_expected, seq, self.next_frame_to_send)
    }

    /// Payload of an outstanding frame.
    #[must_use]
    pub fn packet(&self, seq: Seq) -> Option<&Packet> {
        if !self.is_outstanding(seq) {
            return None;
        }
        self.out_buf.get(seq)
    }

    /// Buffers `packet` under the next sequence number and returns that number.
    ///
    /// The window must not be full.
    pub fn push(&mut self, packet: Packet) -> Seq {
        assert!(!self.is_full());
        let seq = self.next_frame_to_send;
        self.out_buf.insert(seq, packet);
        self.next_frame_to_send = self.space.inc(seq);
        self.nbuffered += 1;
        self.stat.pushes += 1;
        self.check_rep();
        seq
    }

    /// Drains every frame up to and including `ack`.
    ///
    /// Returns the timer slots of the drained frames. An `ack` outside the
    /// outstanding range drains nothing.
    pub fn ack(&mut self, ack: Seq) -> Vec<usize> {
        let mut slots = Vec::new();
        while between(self.ack_expected, ack, self.next_frame_to_send) {
            self.out_buf.take(self.ack_expected);
            slots.push(self.out_buf.slot(self.ack_expected));
            self.nbuffered -= 1;
            self.ack_expected = self.space.inc(self.ack_expected);
            self.stat.acked += 1;
        }
        self.check_rep();
        slots
    }

    /// Frame the peer is missing according to a NAK carrying `nak_ack`.
    #[must_use]
    pub fn on_nak(&mut self, nak_ack: Seq) -> Option<Seq> {
        let missing = self.space.inc(nak_ack);
        if !self.is_outstanding(missing) {
            return None;
        }
        self.stat.nak_retransmissions += 1;
        self.stat.retransmissions += 1;
        Some(missing)
    }

    /// Maps a timer slot back to the outstanding sequence number it guards.
    ///
    /// Slot `s` stands for either `s` or `s + W`; only one of them can be
    /// outstanding at a time.
    #[must_use]
    pub fn on_timeout(&mut self, slot: usize) -> Option<Seq> {
        let window_size = self.out_buf.len();
        if slot >= window_size {
            debug!(slot, "timer slot out of range");
            return None;
        }
        let mut seq = Seq::from_u8(slot as u8);
        if !self.is_outstanding(seq) {
            seq = self.space.add(seq, window_size);
        }
        if !self.is_outstanding(seq) {
            debug!(slot, "stale data timer");
            return None;
        }
        self.stat.timeouts += 1;
        self.stat.retransmissions += 1;
        Some(seq)
    }
}

struct LocalStat {
    pushes: u64,
    retransmissions: u64,
    timeouts: u64,
    nak_retransmissions: u64,
    acked: u64,
}

#[derive(Debug, PartialEq, Clone)]
pub struct Stat {
    pub pushes: u64,
    pub retransmissions: u64,
    pub timeouts: u64,
    pub nak_retransmissions: u64,
    pub acked: u64,
    pub next_frame_to_send: Seq,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(n: u8) -> Seq {
        Seq::from_u8(n)
    }

    #[test]
    fn test_fill_window() {
        let mut sender = Sender::new(SeqSpace::new(15));
        for i in 0..8 {
            assert!(!sender.is_full());
            assert_eq!(sender.push(vec![i]), s(i));
        }
        assert!(sender.is_full());
        assert_eq!(sender.nbuffered(), 8);
        assert_eq!(sender.packet(s(3)), Some(&vec![3]));
    }

    #[test]
    #[should_panic]
    fn test_push_when_full() {
        let mut sender = Sender::new(SeqSpace::new(7));
        for i in 0..5 {
            sender.push(vec![i]);
        }
    }

    #[test]
    fn test_cumulative_ack() {
        let mut sender = Sender::new(SeqSpace::new(15));
        for i in 0..5 {
            sender.push(vec![i]);
        }
        assert_eq!(sender.ack(s(2)), vec![0, 1, 2]);
        assert_eq!(sender.ack_expected(), s(3));
        assert_eq!(sender.nbuffered(), 2);
        assert_eq!(sender.packet(s(2)), None);
        assert_eq!(sender.packet(s(3)), Some(&vec![3]));
    }

    #[test]
    fn test_duplicate_ack() {
        let mut sender = Sender::new(SeqSpace::new(15));
        for i in 0..3 {
            sender.push(vec![i]);
        }
        assert_eq!(sender.ack(s(0)), vec![0]);
        assert!(sender.ack(s(0)).is_empty());
        assert_eq!(sender.nbuffered(), 2);
        assert_eq!(sender.stat().acked, 1);
    }

    #[test]
    fn test_stale_ack() {
        let mut sender = Sender::new(SeqSpace::new(15));
        for i in 0..3 {
            sender.push(vec![i]);
        }
        // beyond `next_frame_to_send`
        assert!(sender.ack(s(9)).is_empty());
        // initial "nothing received" ack
        assert!(sender.ack(s(15)).is_empty());
        assert_eq!(sender.nbuffered(), 3);
    }

    #[test]
    fn test_ack_wraparound() {
        let space = SeqSpace::new(7);
        let mut sender = Sender::new(space);
        for round in 0..3u8 {
            for i in 0..4 {
                sender.push(vec![round, i]);
            }
            let last = space.dec(sender.next_frame_to_send());
            assert_eq!(sender.ack(last).len(), 4);
            assert_eq!(sender.nbuffered(), 0);
        }
        assert_eq!(sender.next_frame_to_send(), s(4));
    }

    #[test]
    fn test_nak() {
        let mut sender = Sender::new(SeqSpace::new(15));
        for i in 0..4 {
            sender.push(vec![i]);
        }
        sender.ack(s(0));
        // peer has 1 in order and misses 2
        assert_eq!(sender.on_nak(s(1)), Some(s(2)));
        // peer misses 0 which is already acknowledged
        assert_eq!(sender.on_nak(s(15)), None);
        // peer misses 4 which was never sent
        assert_eq!(sender.on_nak(s(3)), None);
        assert_eq!(sender.stat().nak_retransmissions, 1);
    }

    #[test]
    fn test_timeout_slot() {
        let mut sender = Sender::new(SeqSpace::new(15));
        for i in 0..6 {
            sender.push(vec![i]);
        }
        assert_eq!(sender.on_timeout(5), Some(s(5)));
        assert_eq!(sender.on_timeout(6), None);
        assert_eq!(sender.next_frame_to_send(), s(6));
        assert_eq!(sender.nbuffered(), 6);
    }

    #[test]
    fn test_timeout_slot_wraparound() {
        let mut sender = Sender::new(SeqSpace::new(7));
        for i in 0..4 {
            sender.push(vec![i]);
        }
        sender.ack(s(3));
        for i in 4..8 {
            sender.push(vec![i]);
        }
        // window is [4, 0); slot 1 now guards seq 5
        assert_eq!(sender.on_timeout(1), Some(s(5)));
        assert_eq!(sender.packet(s(5)), Some(&vec![5]));
        assert_eq!(sender.on_timeout(0), Some(s(4)));
    }

    #[test]
    fn test_stale_timeout() {
        let mut sender = Sender::new(SeqSpace::new(7));
        sender.push(vec![0]);
        sender.ack(s(0));
        assert_eq!(sender.on_timeout(0), None);
        assert_eq!(sender.on_timeout(9), None);
        assert_eq!(sender.stat().timeouts, 0);
    }
}
