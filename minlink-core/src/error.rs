//! Error types for sending on a link

use minlink_protocol::FrameError;

/// Errors returned by the send and reset operations
///
/// `E` is the error type of the byte sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// Invalid identifier or payload; nothing was sent or queued
    Frame(FrameError),
    /// The outgoing window is full; retry after acknowledgements arrive
    QueueFull,
    /// The sink cannot take the whole frame right now
    NoTxSpace { needed: usize, available: usize },
    /// The link was configured without the transport layer
    TransportDisabled,
    /// The sink accepted fewer bytes than it reported space for
    ShortWrite { written: usize, expected: usize },
    /// The sink failed
    Sink(E),
}

impl<E> From<FrameError> for Error<E> {
    fn from(e: FrameError) -> Self {
        Error::Frame(e)
    }
}
