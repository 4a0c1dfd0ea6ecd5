//! # Frame
//!
//! ```text
//! 0      1      2      3                   n-4      n (BYTE)
//! +------+------+------+-------------------+--------+
//! | kind | ack  | seq  |  payload (Data)   | crc32  |
//! +------+------+------+-------------------+--------+
//! ```
//!
//! `Ack` and `Nak` frames stop after `ack`:
//!
//! ```text
//! 0      1      2        6 (BYTE)
//! +------+------+--------+
//! | kind | ack  | crc32  |
//! +------+------+--------+
//! ```
//!
//! # Invariants
//!
//! - `crc32` covers every byte before it and is big-endian
//! - `ack` is the last sequence number received in order by the sender of the frame
//! - `ack` and `seq` lie in the sequence space of the session

use thiserror::Error;

pub mod frame;

/// Every variant means the same thing to the receiver: the frame is corrupted.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodingError {
    #[error("frame of {len} bytes is too short")]
    TooShort { len: usize },
    #[error("frame of {len} bytes exceeds {max} bytes")]
    TooLong { len: usize, max: usize },
    #[error("checksum mismatch")]
    ChecksumMismatch,
    #[error("invalid field `{field}`")]
    InvalidField { field: &'static str },
}
