//! Link counters

pub use minlink_protocol::DecoderStats;

/// Counters kept by the transport layer
///
/// All counters wrap on overflow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TransportStats {
    /// Reliable frames sent for the first time
    pub frames_sent: u32,
    /// Reliable frames sent again after a timeout
    pub frames_retransmitted: u32,
    /// Reliable frames handed to the application
    pub frames_delivered: u32,
    /// Frames behind the expected sequence number (already delivered)
    pub duplicates: u32,
    /// Frames ahead of the expected sequence number (a gap)
    pub out_of_order: u32,
    /// ACKs acknowledging frames that were never sent
    pub spurious_acks: u32,
    /// RESET requests received from the peer
    pub resets_received: u32,
    /// Reliable frames reported as failed
    pub delivery_failures: u32,
    /// ACKs sent
    pub acks_sent: u32,
    /// Sends deferred because the sink was full
    pub tx_stalls: u32,
    /// Sends that failed in the sink
    pub tx_errors: u32,
    /// Largest number of frames queued at once
    pub queue_high_water: u8,
}

/// Everything a context counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LinkStats {
    /// Receive-side framing counters
    pub decoder: DecoderStats,
    /// Transport counters
    pub transport: TransportStats,
    /// Unreliable frames delivered to the application
    pub frames_received: u32,
    /// Sequenced frames dropped because transport is disabled
    pub transport_frames_dropped: u32,
}

pub(crate) fn bump(counter: &mut u32) {
    *counter = counter.wrapping_add(1);
}
