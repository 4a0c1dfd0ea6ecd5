//! Concrete collaborators around a [`Session`] and the driver that wires
//! them together.

mod channel;
mod network;
mod timer;

use std::{collections::VecDeque, io, time::Instant};

use thiserror::Error;
use tracing::{trace, warn};

pub use channel::{ChannelConfig, ChannelError, NoisyChannel, Stat as ChannelStat};
pub use network::CountingNetwork;
pub use timer::{TimerId, TimerQueue};

use crate::layer::{Event, Output, Packet, Session, SubmitError};

pub trait NetworkLayer {
    /// Produces the next packet to send, if any.
    fn get_packet(&mut self) -> Option<Packet>;
    fn deliver(&mut self, packet: Packet);
}

pub trait PhysicalLayer {
    /// Puts one frame on the medium. The medium is ready again on return.
    ///
    /// A failed transmission counts as a lost frame.
    fn transmit(&mut self, frame: &[u8]) -> io::Result<()>;
}

#[derive(Debug, Error)]
pub enum StationError {
    #[error("network layer: {0}")]
    Submit(#[from] SubmitError),
}

/// A [`Session`] plus the timers it asked for.
pub struct Station {
    session: Session,
    timers: TimerQueue,
    pending: VecDeque<Event>,
    transmit_errors: u64,
}

impl Station {
    #[must_use]
    pub fn new(session: Session) -> Self {
        Station {
            session,
            timers: TimerQueue::new(),
            pending: VecDeque::new(),
            transmit_errors: 0,
        }
    }

    #[must_use]
    #[inline]
    pub fn session(&self) -> &Session {
        &self.session
    }

    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    /// Frames the physical layer failed to put on the medium.
    #[must_use]
    #[inline]
    pub fn transmit_errors(&self) -> u64 {
        self.transmit_errors
    }

    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Feeds one event to the session and carries out everything it asks for.
    pub fn handle<N, P>(
        &mut self,
        event: Event,
        now: Instant,
        net: &mut N,
        phy: &mut P,
    ) -> Result<(), StationError>
    where
        N: NetworkLayer,
        P: PhysicalLayer,
    {
        self.session.handle(event)?;
        while let Some(output) = self.session.pop_output() {
            match output {
                Output::Transmit(frame) => {
                    if let Err(e) = phy.transmit(&frame) {
                        warn!(error = %e, len = frame.len(), "frame lost in transmission");
                        self.transmit_errors += 1;
                    }
                    self.pending.push_back(Event::PhysicalLayerReady);
                }
                Output::StartDataTimer { slot, timeout } => {
                    self.timers.arm(TimerId::Data(slot), now + timeout);
                }
                Output::StopDataTimer(slot) => self.timers.cancel(TimerId::Data(slot)),
                Output::StartAckTimer(timeout) => self.timers.arm(TimerId::Ack, now + timeout),
                Output::StopAckTimer => self.timers.cancel(TimerId::Ack),
                Output::Deliver(packet) => net.deliver(packet),
                Output::EnableNetworkLayer => trace!("network layer enabled"),
                Output::DisableNetworkLayer => trace!("network layer disabled"),
            }
        }
        Ok(())
    }

    /// Handles at most one event that does not come from the medium.
    ///
    /// Readiness of the physical layer goes first, then due timers, then a
    /// new packet if the network layer is enabled. Returns whether anything
    /// was handled.
    pub fn poll<N, P>(&mut self, now: Instant, net: &mut N, phy: &mut P) -> Result<bool, StationError>
    where
        N: NetworkLayer,
        P: PhysicalLayer,
    {
        if let Some(event) = self.pending.pop_front() {
            self.handle(event, now, net, phy)?;
            return Ok(true);
        }
        if let Some(id) = self.timers.pop_expired(now) {
            let event = match id {
                TimerId::Data(slot) => Event::DataTimeout(slot),
                TimerId::Ack => Event::AckTimeout,
            };
            self.handle(event, now, net, phy)?;
            return Ok(true);
        }
        if self.session.is_network_layer_enabled() {
            if let Some(packet) = net.get_packet() {
                self.handle(Event::NetworkLayerReady(packet), now, net, phy)?;
                return Ok(true);
            }
        }
        Ok(false)
    }
}
