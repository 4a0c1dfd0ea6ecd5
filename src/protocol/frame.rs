use std::io::Cursor;

use byteorder::{BigEndian, ByteOrder, ReadBytesExt};
use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::utils::{Seq, SeqSpace};

use super::DecodingError;

pub const CRC_LEN: usize = 4;
pub const CTRL_HDR_LEN: usize = 2;
pub const DATA_HDR_LEN: usize = 3;
pub const MIN_FRAME_LEN: usize = CTRL_HDR_LEN + CRC_LEN;

/// Longest frame that can carry a packet of `max_packet_len` bytes.
#[must_use]
pub const fn max_frame_len(max_packet_len: usize) -> usize {
    DATA_HDR_LEN + max_packet_len + CRC_LEN
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Frame {
    ack: Seq,
    cmd: FrameCommand,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum FrameCommand {
    Data { seq: Seq, payload: Vec<u8> },
    Ack,
    Nak,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum FrameKind {
    Data = 1,
    Ack = 2,
    Nak = 3,
}

pub fn checksum(data: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

impl Frame {
    #[must_use]
    pub fn new(ack: Seq, cmd: FrameCommand) -> Self {
        Frame { ack, cmd }
    }

    /// Verifies length and checksum before looking at any field.
    pub fn from_bytes(bytes: &[u8], space: &SeqSpace) -> Result<Self, DecodingError> {
        if bytes.len() < MIN_FRAME_LEN {
            return Err(DecodingError::TooShort { len: bytes.len() });
        }
        let (body, crc) = bytes.split_at(bytes.len() - CRC_LEN);
        if checksum(body) != BigEndian::read_u32(crc) {
            return Err(DecodingError::ChecksumMismatch);
        }

        let mut rdr = Cursor::new(body);
        let kind = rdr
            .read_u8()
            .map_err(|_e| DecodingError::InvalidField { field: "kind" })?;
        let kind =
            FrameKind::try_from(kind).map_err(|_e| DecodingError::InvalidField { field: "kind" })?;
        let ack = read_seq(&mut rdr, space, "ack")?;
        let cmd = match kind {
            FrameKind::Data => {
                if body.len() < DATA_HDR_LEN {
                    return Err(DecodingError::TooShort { len: bytes.len() });
                }
                let seq = read_seq(&mut rdr, space, "seq")?;
                let payload = body[DATA_HDR_LEN..].to_vec();
                FrameCommand::Data { seq, payload }
            }
            FrameKind::Ack => FrameCommand::Ack,
            FrameKind::Nak => FrameCommand::Nak,
        };
        Ok(Frame { ack, cmd })
    }

    /// Appends the encoded frame followed by its checksum.
    pub fn append_to(&self, buf: &mut Vec<u8>) {
        let start = buf.len();
        buf.push(self.kind().into());
        buf.push(self.ack.to_u8());
        if let FrameCommand::Data { seq, payload } = &self.cmd {
            buf.push(seq.to_u8());
            buf.extend_from_slice(payload);
        }
        let mut crc = [0; CRC_LEN];
        BigEndian::write_u32(&mut crc, checksum(&buf[start..]));
        buf.extend_from_slice(&crc);
    }

    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.len());
        self.append_to(&mut buf);
        buf
    }

    #[must_use]
    pub fn kind(&self) -> FrameKind {
        match self.cmd {
            FrameCommand::Data { .. } => FrameKind::Data,
            FrameCommand::Ack => FrameKind::Ack,
            FrameCommand::Nak => FrameKind::Nak,
        }
    }

    #[must_use]
    #[inline]
    pub fn ack(&self) -> Seq {
        self.ack
    }

    #[must_use]
    #[inline]
    pub fn cmd(&self) -> &FrameCommand {
        &self.cmd
    }

    #[must_use]
    pub fn into_cmd(self) -> FrameCommand {
        self.cmd
    }

    /// Encoded length including the checksum.
    #[must_use]
    pub fn len(&self) -> usize {
        match &self.cmd {
            FrameCommand::Data { payload, .. } => DATA_HDR_LEN + payload.len() + CRC_LEN,
            FrameCommand::Ack | FrameCommand::Nak => MIN_FRAME_LEN,
        }
    }
}

fn read_seq(
    rdr: &mut Cursor<&[u8]>,
    space: &SeqSpace,
    field: &'static str,
) -> Result<Seq, DecodingError> {
    let seq = rdr
        .read_u8()
        .map_err(|_e| DecodingError::InvalidField { field })?;
    let seq = Seq::from_u8(seq);
    if !space.contains(seq) {
        return Err(DecodingError::InvalidField { field });
    }
    Ok(seq)
}
