//! Outgoing queue entries and delivery failures

use minlink_protocol::{Frame, MAX_PAYLOAD_SIZE};
use heapless::Vec;

/// Why a reliable frame was given up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FailureReason {
    /// No ACK after the configured number of retransmissions
    RetriesExhausted,
    /// The transport was reset while the frame was in flight
    LinkReset,
}

/// A reliable frame that will not be delivered (or whose delivery is unknown)
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeliveryFailure {
    /// Application identifier
    pub id: u8,
    /// Sequence number it was sent under
    pub seq: u8,
    /// The original payload
    pub payload: Vec<u8, MAX_PAYLOAD_SIZE>,
    /// Why it was given up
    pub reason: FailureReason,
}

/// A reliable frame waiting for its ACK
#[derive(Debug, Clone)]
pub(crate) struct OutgoingEntry {
    /// Transport frame, carrying id, sequence number and payload
    pub frame: Frame,
    /// Time of the latest transmission; None until first sent
    pub last_sent: Option<u32>,
    /// Transmissions after the first one
    pub retransmits: u8,
}

impl OutgoingEntry {
    pub fn new(frame: Frame) -> Self {
        Self {
            frame,
            last_sent: None,
            retransmits: 0,
        }
    }

    pub fn is_sent(&self) -> bool {
        self.last_sent.is_some()
    }

    pub fn seq(&self) -> u8 {
        self.frame.seq
    }

    /// Record a transmission at `now`
    pub fn mark_sent(&mut self, now: u32) {
        if self.last_sent.is_some() {
            self.retransmits = self.retransmits.saturating_add(1);
        }
        self.last_sent = Some(now);
    }

    /// Forget transmissions and take a new sequence number
    pub fn renumber(&mut self, seq: u8) {
        self.frame.seq = seq;
        self.last_sent = None;
        self.retransmits = 0;
    }

    pub fn into_failure(self, reason: FailureReason) -> DeliveryFailure {
        DeliveryFailure {
            id: self.frame.id.app_id().unwrap_or_default(),
            seq: self.frame.seq,
            payload: self.frame.payload,
            reason,
        }
    }
}
