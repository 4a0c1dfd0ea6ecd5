use crate::utils::{between, Seq, SeqSpace, SlotBuf};

use super::Packet;

/// Receiving half of the sliding window.
///
/// Frames in `[frame_expected, too_far)` are buffered out of order; an
/// occupied slot of `in_buf` is the arrival bit for that sequence number.
pub struct Receiver {
    space: SeqSpace,
    frame_expected: Seq,
    too_far: Seq, // exclusive
    in_buf: SlotBuf<Packet>,
    no_nak: bool,

    // stat
    stat: LocalStat,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum SeqLocationToRwnd {
    InRecvWindow,
    Duplicate,
    OutOfWindow,
}

impl Receiver {
    fn check_rep(&self) {
        assert_eq!(
            self.space.add(self.frame_expected, self.in_buf.len()),
            self.too_far
        );
        assert!(self.in_buf.occupied() <= self.in_buf.len());
    }

    #[must_use]
    pub fn new(space: SeqSpace) -> Self {
        let window_size = space.window_size();
        let this = Receiver {
            space,
            frame_expected: Seq::from_u8(0),
            too_far: space.add(Seq::from_u8(0), window_size),
            in_buf: SlotBuf::new(window_size),
            no_nak: true,
            stat: LocalStat {
                frames: 0,
                corrupted: 0,
                out_of_window: 0,
                duplicates: 0,
                delivered: 0,
                naks: 0,
                acks: 0,
            },
        };
        this.check_rep();
        this
    }

    #[must_use]
    pub fn stat(&self) -> Stat {
        Stat {
            frames: self.stat.frames,
            corrupted: self.stat.corrupted,
            out_of_window: self.stat.out_of_window,
            duplicates: self.stat.duplicates,
            delivered: self.stat.delivered,
            naks: self.stat.naks,
            acks: self.stat.acks,
            frame_expected: self.frame_expected,
        }
    }

    #[must_use]
    #[inline]
    pub fn frame_expected(&self) -> Seq {
        self.frame_expected
    }

    #[must_use]
    #[inline]
    pub fn too_far(&self) -> Seq {
        self.too_far
    }

    /// Piggybacked acknowledgment: the last sequence number received in order.
    #[must_use]
    #[inline]
    pub fn ack_value(&self) -> Seq {
        self.space.dec(self.frame_expected)
    }

    #[must_use]
    #[inline]
    pub fn no_nak(&self) -> bool {
        self.no_nak
    }

    #[must_use]
    #[inline]
    pub fn arrived(&self, seq: Seq) -> bool {
        self.in_buf.is_occupied(seq)
    }

    #[must_use]
    pub fn buffered(&self) -> usize {
        self.in_buf.occupied()
    }

    /// Whether a DATA frame carrying `seq` reveals a gap nobody reported yet.
    #[must_use]
    #[inline]
    pub fn should_nak(&self, seq: Seq) -> bool {
        seq != self.frame_expected && self.no_nak
    }

    pub fn record_frame(&mut self) {
        self.stat.frames += 1;
    }

    pub fn record_corrupted(&mut self) {
        self.stat.corrupted += 1;
    }

    pub fn record_ack_sent(&mut self) {
        self.stat.acks += 1;
    }

    /// A NAK is now outstanding; no further NAK until a gap closes.
    pub fn nak_sent(&mut self) {
        self.no_nak = false;
        self.stat.naks += 1;
    }

    /// Buffers `payload` if `seq` is acceptable and not yet arrived.
    pub fn insert(&mut self, seq: Seq, payload: Packet) -> SeqLocationToRwnd {
        let location = if !between(self.frame_expected, seq, self.too_far) {
            self.stat.out_of_window += 1;
            SeqLocationToRwnd::OutOfWindow
        } else if self.in_buf.is_occupied(seq) {
            self.stat.duplicates += 1;
            SeqLocationToRwnd::Duplicate
        } else {
            self.in_buf.insert(seq, payload);
            SeqLocationToRwnd::InRecvWindow
        };
        self.check_rep();
        location
    }

    /// Takes the next in-order payload and slides the window past it.
    #[must_use]
    pub fn pop_next(&mut self) -> Option<Packet> {
        let packet = self.in_buf.take(self.frame_expected)?;
        self.no_nak = true;
        self.frame_expected = self.space.inc(self.frame_expected);
        self.too_far = self.space.inc(self.too_far);
        self.stat.delivered += 1;
        self.check_rep();
        Some(packet)
    }
}

struct LocalStat {
    frames: u64,
    corrupted: u64,
    out_of_window: u64,
    duplicates: u64,
    delivered: u64,
    naks: u64,
    acks: u64,
}

#[derive(Debug, PartialEq, Clone)]
pub struct Stat {
    pub frames: u64,
    pub corrupted: u64,
    pub out_of_window: u64,
    pub duplicates: u64,
    pub delivered: u64,
    pub naks: u64,
    pub acks: u64,
    pub frame_expected: Seq,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(n: u8) -> Seq {
        Seq::from_u8(n)
    }

    #[test]
    fn test1() {
        let mut rwnd = Receiver::new(SeqSpace::new(7));

        //         0  1  2  3  4
        // rwnd   [           ]

        assert!(rwnd.pop_next().is_none());
        assert_eq!(rwnd.ack_value(), s(7));

        assert_eq!(rwnd.insert(s(4), vec![4]), SeqLocationToRwnd::OutOfWindow);
        assert_eq!(rwnd.insert(s(1), vec![1]), SeqLocationToRwnd::InRecvWindow);

        //         0  1  2  3  4
        // rwnd   [   1       ]

        assert!(rwnd.arrived(s(1)));
        assert!(rwnd.pop_next().is_none());
        assert_eq!(rwnd.insert(s(1), vec![1]), SeqLocationToRwnd::Duplicate);
        assert_eq!(rwnd.insert(s(0), vec![0]), SeqLocationToRwnd::InRecvWindow);

        assert_eq!(rwnd.pop_next(), Some(vec![0]));
        assert_eq!(rwnd.pop_next(), Some(vec![1]));
        assert!(rwnd.pop_next().is_none());

        //         0  1  2  3  4  5  6
        // rwnd         [           ]

        assert_eq!(rwnd.frame_expected(), s(2));
        assert_eq!(rwnd.too_far(), s(6));
        assert_eq!(rwnd.insert(s(1), vec![1]), SeqLocationToRwnd::OutOfWindow);
        assert_eq!(rwnd.insert(s(5), vec![5]), SeqLocationToRwnd::InRecvWindow);
        assert_eq!(rwnd.buffered(), 1);
    }

    #[test]
    fn test_window_wraparound() {
        let space = SeqSpace::new(7);
        let mut rwnd = Receiver::new(space);
        for i in 0..6 {
            assert_eq!(rwnd.insert(s(i), vec![i]), SeqLocationToRwnd::InRecvWindow);
            assert_eq!(rwnd.pop_next(), Some(vec![i]));
        }

        // window is [6, 2)
        assert_eq!(rwnd.insert(s(1), vec![1]), SeqLocationToRwnd::InRecvWindow);
        assert_eq!(rwnd.insert(s(0), vec![0]), SeqLocationToRwnd::InRecvWindow);
        assert_eq!(rwnd.insert(s(2), vec![2]), SeqLocationToRwnd::OutOfWindow);
        assert_eq!(rwnd.insert(s(7), vec![7]), SeqLocationToRwnd::InRecvWindow);
        assert_eq!(rwnd.insert(s(6), vec![6]), SeqLocationToRwnd::InRecvWindow);
        let delivered: Vec<_> = std::iter::from_fn(|| rwnd.pop_next()).collect();
        assert_eq!(delivered, vec![vec![6], vec![7], vec![0], vec![1]]);
        assert_eq!(rwnd.frame_expected(), s(2));
    }

    #[test]
    fn test_nak_suppression() {
        let mut rwnd = Receiver::new(SeqSpace::new(15));
        assert!(rwnd.should_nak(s(2)));
        assert!(!rwnd.should_nak(s(0)));
        rwnd.nak_sent();
        assert!(!rwnd.should_nak(s(2)));
        assert!(!rwnd.should_nak(s(3)));

        let _ = rwnd.insert(s(0), vec![0]);
        assert_eq!(rwnd.pop_next(), Some(vec![0]));
        assert!(rwnd.no_nak());
        assert!(rwnd.should_nak(s(2)));
    }
}
