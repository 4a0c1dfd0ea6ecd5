use std::{collections::VecDeque, time::Duration};

use tracing::{debug, trace};

use crate::{
    protocol::{
        frame::{max_frame_len, Frame, FrameCommand},
        DecodingError,
    },
    utils::{Seq, SeqSpace},
};

use super::{
    receiver::{Receiver, SeqLocationToRwnd},
    sender::Sender,
    Event, Output, Packet, SubmitError,
};

/// The whole protocol state of one end of the link.
///
/// Events go in through [`Session::handle`], one at a time and each to
/// completion; commands for the collaborators come out of
/// [`Session::pop_output`].
pub struct Session {
    space: SeqSpace,
    sender: Sender,
    receiver: Receiver,
    phl_ready: bool,
    network_enabled: bool,
    outputs: VecDeque<Output>,

    // const
    max_packet_len: usize,
    data_timeout: Duration,
    ack_timeout: Duration,
}

impl Session {
    #[must_use]
    pub(super) fn new(
        space: SeqSpace,
        max_packet_len: usize,
        data_timeout: Duration,
        ack_timeout: Duration,
    ) -> Self {
        Session {
            space,
            sender: Sender::new(space),
            receiver: Receiver::new(space),
            phl_ready: true,
            network_enabled: true,
            outputs: VecDeque::new(),
            max_packet_len,
            data_timeout,
            ack_timeout,
        }
    }

    #[must_use]
    #[inline]
    pub fn space(&self) -> SeqSpace {
        self.space
    }

    #[must_use]
    #[inline]
    pub fn sender(&self) -> &Sender {
        &self.sender
    }

    #[must_use]
    #[inline]
    pub fn receiver(&self) -> &Receiver {
        &self.receiver
    }

    #[must_use]
    #[inline]
    pub fn max_packet_len(&self) -> usize {
        self.max_packet_len
    }

    #[must_use]
    #[inline]
    pub fn is_network_layer_enabled(&self) -> bool {
        self.network_enabled
    }

    #[must_use]
    #[inline]
    pub fn is_physical_layer_ready(&self) -> bool {
        self.phl_ready
    }

    #[must_use]
    pub fn pop_output(&mut self) -> Option<Output> {
        self.outputs.pop_front()
    }

    /// Handles one event, then re-evaluates whether the network layer may
    /// submit more packets.
    ///
    /// Only `NetworkLayerReady` can fail; the packet is handed back.
    pub fn handle(&mut self, event: Event) -> Result<(), SubmitError> {
        let result = match event {
            Event::NetworkLayerReady(packet) => self.submit(packet),
            Event::PhysicalLayerReady => {
                self.phl_ready = true;
                Ok(())
            }
            Event::FrameReceived(bytes) => {
                self.on_frame(&bytes);
                Ok(())
            }
            Event::DataTimeout(slot) => {
                self.on_data_timeout(slot);
                Ok(())
            }
            Event::AckTimeout => {
                self.on_ack_timeout();
                Ok(())
            }
        };
        self.update_gate();
        result
    }

    fn update_gate(&mut self) {
        let enable = !self.sender.is_full() && self.phl_ready;
        if enable == self.network_enabled {
            return;
        }
        self.network_enabled = enable;
        self.outputs.push_back(match enable {
            true => Output::EnableNetworkLayer,
            false => Output::DisableNetworkLayer,
        });
    }

    fn submit(&mut self, packet: Packet) -> Result<(), SubmitError> {
        if packet.len() > self.max_packet_len {
            return Err(SubmitError::TooLong(packet));
        }
        if self.sender.is_full() {
            return Err(SubmitError::WindowFull(packet));
        }
        let seq = self.sender.push(packet);
        self.send_data(seq);
        Ok(())
    }

    fn on_frame(&mut self, bytes: &[u8]) {
        let frame = match self.decode(bytes) {
            Ok(x) => x,
            Err(e) => {
                debug!(error = %e, "receiver error");
                self.receiver.record_corrupted();
                if self.receiver.no_nak() {
                    self.send_nak();
                }
                return;
            }
        };
        self.receiver.record_frame();

        let ack = frame.ack();
        match frame.into_cmd() {
            FrameCommand::Data { seq, payload } => {
                trace!(%seq, %ack, "recv DATA");
                self.on_data(seq, payload);
            }
            FrameCommand::Nak => {
                trace!(%ack, "recv NAK");
                if let Some(seq) = self.sender.on_nak(ack) {
                    self.send_data(seq);
                }
            }
            FrameCommand::Ack => {
                trace!(%ack, "recv ACK");
            }
        }
        self.on_ack(ack);
    }

    /// Frames too long to carry a packet of `max_packet_len` bytes are corrupted too.
    fn decode(&self, bytes: &[u8]) -> Result<Frame, DecodingError> {
        let max = max_frame_len(self.max_packet_len);
        if bytes.len() > max {
            return Err(DecodingError::TooLong {
                len: bytes.len(),
                max,
            });
        }
        Frame::from_bytes(bytes, &self.space)
    }

    fn on_data(&mut self, seq: Seq, payload: Packet) {
        if self.receiver.should_nak(seq) {
            self.send_nak();
        } else {
            self.start_ack_timer();
        }

        match self.receiver.insert(seq, payload) {
            SeqLocationToRwnd::InRecvWindow => (),
            SeqLocationToRwnd::Duplicate => trace!(%seq, "duplicate DATA"),
            SeqLocationToRwnd::OutOfWindow => trace!(%seq, "DATA out of window"),
        }

        while let Some(packet) = self.receiver.pop_next() {
            self.outputs.push_back(Output::Deliver(packet));
            self.start_ack_timer();
        }
    }

    fn on_ack(&mut self, ack: Seq) {
        for slot in self.sender.ack(ack) {
            self.outputs.push_back(Output::StopDataTimer(slot));
        }
    }

    fn on_data_timeout(&mut self, slot: usize) {
        debug!(slot, "DATA timeout");
        if let Some(seq) = self.sender.on_timeout(slot) {
            self.send_data(seq);
        }
    }

    fn on_ack_timeout(&mut self) {
        debug!("ACK timeout");
        let ack = self.receiver.ack_value();
        trace!(%ack, "send ACK");
        self.receiver.record_ack_sent();
        self.put_frame(&Frame::new(ack, FrameCommand::Ack));
    }

    fn send_data(&mut self, seq: Seq) {
        let payload = match self.sender.packet(seq) {
            Some(x) => x.clone(),
            None => {
                debug!(%seq, "no buffered packet to send");
                return;
            }
        };
        let ack = self.receiver.ack_value();
        trace!(%seq, %ack, "send DATA");
        self.put_frame(&Frame::new(ack, FrameCommand::Data { seq, payload }));
        self.outputs.push_back(Output::StartDataTimer {
            slot: self.sender.slot(seq),
            timeout: self.data_timeout,
        });
    }

    fn send_nak(&mut self) {
        let ack = self.receiver.ack_value();
        debug!(%ack, "send NAK");
        self.receiver.nak_sent();
        self.put_frame(&Frame::new(ack, FrameCommand::Nak));
    }

    /// Every frame carries an acknowledgment, so a pending ACK timer is moot.
    fn put_frame(&mut self, frame: &Frame) {
        self.outputs.push_back(Output::Transmit(frame.to_bytes()));
        self.phl_ready = false;
        self.outputs.push_back(Output::StopAckTimer);
    }

    fn start_ack_timer(&mut self) {
        self.outputs.push_back(Output::StartAckTimer(self.ack_timeout));
    }
}
