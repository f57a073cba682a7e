//! Events that trigger link state transitions

/// Events that can trigger link state transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkEvent {
    /// A reliable frame was queued locally
    Queued,
    /// A sequenced frame arrived from the peer
    FrameReceived,
    /// The peer acknowledged frames
    AckReceived,
    /// Queue and sequence numbers were cleared (locally or by the peer)
    Reset,
}
