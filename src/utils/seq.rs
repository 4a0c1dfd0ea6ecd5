use std::fmt;

/// A sequence number in a cyclic space of `max_seq + 1` values.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub struct Seq {
    n: u8,
}

impl Seq {
    pub fn from_u8(n: u8) -> Self {
        Seq { n }
    }

    pub fn to_u8(&self) -> u8 {
        self.n
    }
}

impl fmt::Display for Seq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.n)
    }
}

/// Reports whether `b` lies in the cyclic half-open interval `[a, c)`.
#[must_use]
#[inline]
pub fn between(a: Seq, b: Seq, c: Seq) -> bool {
    let (a, b, c) = (a.n, b.n, c.n);
    (a <= b && b < c) || (c < a && a <= b) || (b < c && c < a)
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct SeqSpace {
    max_seq: u8,
}

impl SeqSpace {
    fn check_rep(&self) {
        assert!(self.max_seq % 2 == 1);
    }

    /// `max_seq` must be odd so the space splits into two equal windows.
    #[must_use]
    pub fn new(max_seq: u8) -> Self {
        let this = SeqSpace { max_seq };
        this.check_rep();
        this
    }

    #[must_use]
    #[inline]
    pub fn max_seq(&self) -> u8 {
        self.max_seq
    }

    #[must_use]
    #[inline]
    pub fn modulus(&self) -> usize {
        self.max_seq as usize + 1
    }

    #[must_use]
    #[inline]
    pub fn window_size(&self) -> usize {
        self.modulus() / 2
    }

    #[must_use]
    #[inline]
    pub fn contains(&self, seq: Seq) -> bool {
        seq.n <= self.max_seq
    }

    #[must_use]
    pub fn add(&self, seq: Seq, n: usize) -> Seq {
        let s = (seq.n as usize + n % self.modulus()) % self.modulus();
        Seq { n: s as u8 }
    }

    #[must_use]
    #[inline]
    pub fn inc(&self, seq: Seq) -> Seq {
        self.add(seq, 1)
    }

    #[must_use]
    #[inline]
    pub fn dec(&self, seq: Seq) -> Seq {
        self.add(seq, self.max_seq as usize)
    }

    /// Forward distance from `from` to `to`.
    #[must_use]
    pub fn distance(&self, from: Seq, to: Seq) -> usize {
        (to.n as usize + self.modulus() - from.n as usize) % self.modulus()
    }
}
