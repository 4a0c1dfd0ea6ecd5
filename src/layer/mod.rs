mod receiver;
mod sender;
mod session;

use std::time::Duration;

use thiserror::Error;

pub use receiver::{Receiver, SeqLocationToRwnd, Stat as ReceiverStat};
pub use sender::{Sender, Stat as SenderStat};
pub use session::*;

use crate::utils::SeqSpace;

/// A network-layer packet; opaque to the link.
pub type Packet = Vec<u8>;

pub struct Builder {
    pub max_seq: u8,
    pub max_packet_len: usize,
    pub data_timeout: Duration,
    pub ack_timeout: Duration,
}

impl Builder {
    pub fn build(self) -> Result<Session, BuildError> {
        if self.max_seq % 2 == 0 {
            return Err(BuildError::EvenMaxSeq(self.max_seq));
        }
        if self.max_packet_len == 0 {
            return Err(BuildError::ZeroPacketLen);
        }
        Ok(Session::new(
            SeqSpace::new(self.max_seq),
            self.max_packet_len,
            self.data_timeout,
            self.ack_timeout,
        ))
    }
}

impl Default for Builder {
    fn default() -> Self {
        Builder {
            max_seq: 31,
            max_packet_len: 256,
            data_timeout: Duration::from_millis(5000),
            ack_timeout: Duration::from_millis(300),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("max_seq {0} must be odd")]
    EvenMaxSeq(u8),
    #[error("max_packet_len must be positive")]
    ZeroPacketLen,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmitError {
    #[error("sending window is full")]
    WindowFull(Packet),
    #[error("packet of {} bytes exceeds the maximum packet length", .0.len())]
    TooLong(Packet),
}

impl SubmitError {
    #[must_use]
    pub fn into_packet(self) -> Packet {
        match self {
            SubmitError::WindowFull(x) => x,
            SubmitError::TooLong(x) => x,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Event {
    /// The network layer handed over a packet while submission was enabled.
    NetworkLayerReady(Packet),
    PhysicalLayerReady,
    FrameReceived(Vec<u8>),
    /// The retransmission timer of a sender slot fired.
    DataTimeout(usize),
    AckTimeout,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Output {
    Transmit(Vec<u8>),
    /// Arms (or re-arms) the retransmission timer of a sender slot.
    StartDataTimer { slot: usize, timeout: Duration },
    StopDataTimer(usize),
    /// Arms (or re-arms) the shared deferred acknowledgment timer.
    StartAckTimer(Duration),
    StopAckTimer,
    Deliver(Packet),
    EnableNetworkLayer,
    DisableNetworkLayer,
}
