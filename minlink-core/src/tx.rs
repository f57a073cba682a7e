//! Frame transmission
//!
//! Frames are encoded first and only written when the sink can take all of
//! them, so a partial frame never reaches the wire.

use minlink_hal::ByteSink;
use minlink_protocol::{Frame, MAX_ENCODED_SIZE};

use crate::error::Error;

/// Encode `frame` and write it to `sink` in one go
///
/// Returns the number of bytes written.
pub(crate) fn send_frame<S: ByteSink>(sink: &mut S, frame: &Frame) -> Result<usize, Error<S::Error>> {
    let mut buf = [0u8; MAX_ENCODED_SIZE];
    let len = frame.encode(&mut buf)?;

    let available = sink.available_for_write();
    if available < len {
        return Err(Error::NoTxSpace {
            needed: len,
            available,
        });
    }

    sink.begin_frame();
    let result = sink.write(&buf[..len]);
    sink.end_frame();

    match result {
        Ok(written) if written == len => {
            trace!("TX: {} bytes", len);
            Ok(len)
        }
        Ok(written) => Err(Error::ShortWrite {
            written,
            expected: len,
        }),
        Err(e) => Err(Error::Sink(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heapless::Vec;

    #[test]
    fn test_writes_whole_frame() {
        let frame = Frame::new(0x01, &[0xAA, 0xAA, 0xAA]).unwrap();
        let expected = frame.encode_to_vec().unwrap();

        let mut sink: Vec<u8, 64> = Vec::new();
        let len = send_frame(&mut sink, &frame).unwrap();

        assert_eq!(len, expected.len());
        assert_eq!(sink.as_slice(), expected.as_slice());
    }

    #[test]
    fn test_refuses_partial_frame() {
        let frame = Frame::new(0x01, &[0u8; 32]).unwrap();
        let mut sink: Vec<u8, 16> = Vec::new();

        let result = send_frame(&mut sink, &frame);
        assert!(matches!(
            result,
            Err(Error::NoTxSpace {
                available: 16,
                ..
            })
        ));
        assert!(sink.is_empty());
    }
}
