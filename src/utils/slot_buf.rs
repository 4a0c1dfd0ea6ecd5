use crate::utils::Seq;

/// Fixed-capacity circular buffer addressed by `seq mod len`.
///
/// An occupied slot doubles as the "arrived" bit of a receive window.
pub struct SlotBuf<T> {
    slots: Box<[Option<T>]>,
}

impl<T> SlotBuf<T> {
    fn check_rep(&self) {
        assert!(!self.slots.is_empty());
    }

    #[must_use]
    pub fn new(len: usize) -> Self {
        let this = SlotBuf {
            slots: (0..len).map(|_| None).collect(),
        };
        this.check_rep();
        this
    }

    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    #[inline]
    pub fn slot(&self, seq: Seq) -> usize {
        seq.to_u8() as usize % self.slots.len()
    }

    #[must_use]
    #[inline]
    pub fn is_occupied(&self, seq: Seq) -> bool {
        self.slots[self.slot(seq)].is_some()
    }

    #[must_use]
    #[inline]
    pub fn get(&self, seq: Seq) -> Option<&T> {
        self.slots[self.slot(seq)].as_ref()
    }

    /// Returns the value previously held by the slot.
    pub fn insert(&mut self, seq: Seq, v: T) -> Option<T> {
        let slot = self.slot(seq);
        self.slots[slot].replace(v)
    }

    pub fn take(&mut self, seq: Seq) -> Option<T> {
        let slot = self.slot(seq);
        self.slots[slot].take()
    }

    #[must_use]
    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|x| x.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_wraps() {
        let buf: SlotBuf<()> = SlotBuf::new(16);
        assert_eq!(buf.slot(Seq::from_u8(5)), 5);
        assert_eq!(buf.slot(Seq::from_u8(21)), 5);
        assert_eq!(buf.slot(Seq::from_u8(31)), 15);
    }

    #[test]
    fn insert_take() {
        let mut buf = SlotBuf::new(4);
        assert!(!buf.is_occupied(Seq::from_u8(1)));
        assert!(buf.insert(Seq::from_u8(1), "a").is_none());
        assert!(buf.is_occupied(Seq::from_u8(5)));
        assert_eq!(buf.get(Seq::from_u8(1)), Some(&"a"));
        assert_eq!(buf.insert(Seq::from_u8(5), "b"), Some("a"));
        assert_eq!(buf.occupied(), 1);
        assert_eq!(buf.take(Seq::from_u8(1)), Some("b"));
        assert_eq!(buf.take(Seq::from_u8(1)), None);
        assert_eq!(buf.occupied(), 0);
    }
}
