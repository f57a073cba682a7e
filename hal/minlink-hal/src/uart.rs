//! Serial byte transport abstractions
//!
//! Provides non-blocking traits for the transmit and receive halves of a
//! UART (or anything else that moves bytes).

use core::convert::Infallible;

/// Byte transmitter
///
/// The protocol engine asks for [`available_for_write`](ByteSink::available_for_write)
/// before every frame and only writes a frame that fits completely, so an
/// implementation backed by a ring buffer never has to block.
pub trait ByteSink {
    /// Error type for transmit operations
    type Error;

    /// Number of bytes that can be written right now without blocking
    fn available_for_write(&self) -> usize;

    /// Write data to the transmitter
    ///
    /// Returns the number of bytes accepted.
    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error>;

    /// Called before the first byte of a frame
    fn begin_frame(&mut self) {}

    /// Called after the last byte of a frame
    fn end_frame(&mut self) {}
}

/// Byte receiver
pub trait ByteSource {
    /// Error type for receive operations
    type Error;

    /// Read whatever is available into `buf`
    ///
    /// Returns immediately with `Ok(0)` when no data is pending.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;
}

impl<T: ByteSink + ?Sized> ByteSink for &mut T {
    type Error = T::Error;

    fn available_for_write(&self) -> usize {
        (**self).available_for_write()
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error> {
        (**self).write(data)
    }

    fn begin_frame(&mut self) {
        (**self).begin_frame()
    }

    fn end_frame(&mut self) {
        (**self).end_frame()
    }
}

impl<T: ByteSource + ?Sized> ByteSource for &mut T {
    type Error = T::Error;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        (**self).read(buf)
    }
}

/// A fixed-capacity buffer acts as a transmit queue
///
/// Useful for loopback links and for capturing traffic in tests.
impl<const N: usize> ByteSink for heapless::Vec<u8, N> {
    type Error = Infallible;

    fn available_for_write(&self) -> usize {
        N - self.len()
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error> {
        let accepted = data.len().min(N - self.len());
        // Cannot fail: length was clamped to the remaining capacity
        let _ = self.extend_from_slice(&data[..accepted]);
        Ok(accepted)
    }
}
