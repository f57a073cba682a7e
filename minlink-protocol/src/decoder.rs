//! Incremental frame decoding.
//!
//! [`StreamDecoder`] consumes bytes in whatever chunks the UART hands over
//! and reassembles frames. Malformed input never escapes as an error from
//! [`StreamDecoder::feed`]: the partial frame is dropped, counted in
//! [`DecoderStats`], and the decoder goes back to hunting for a header.

use heapless::Vec;

use crate::frame::{
    compute_checksum, Frame, FrameError, CHECKSUM_SIZE, EOF_BYTE, HEADER_BYTE, MAX_PAYLOAD_SIZE,
    STUFF_BYTE,
};
use crate::id::{FrameId, TRANSPORT_BIT};

/// Counters for everything the decoder has seen
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DecoderStats {
    /// Frames that passed validation
    pub frames: u32,
    /// Frames dropped on checksum mismatch
    pub checksum_errors: u32,
    /// Frames dropped for an oversized length
    pub length_errors: u32,
    /// Frames dropped on a stuffing violation
    pub framing_errors: u32,
    /// Frames dropped for a reserved ID/control byte
    pub id_errors: u32,
    /// Frames dropped for a bad end-of-frame byte
    pub eof_errors: u32,
    /// Partial frames abandoned because a new header arrived
    pub restarts: u32,
}

impl DecoderStats {
    /// Total number of discarded frames
    pub fn dropped(&self) -> u32 {
        self.checksum_errors
            .wrapping_add(self.length_errors)
            .wrapping_add(self.framing_errors)
            .wrapping_add(self.id_errors)
            .wrapping_add(self.eof_errors)
            .wrapping_add(self.restarts)
    }

    fn record(&mut self, error: FrameError) {
        let counter = match error {
            FrameError::InvalidChecksum => &mut self.checksum_errors,
            FrameError::PayloadTooLarge => &mut self.length_errors,
            FrameError::InvalidFrame => &mut self.framing_errors,
            FrameError::InvalidId => &mut self.id_errors,
            FrameError::MissingEof => &mut self.eof_errors,
            FrameError::Restarted => &mut self.restarts,
            FrameError::Incomplete | FrameError::BufferTooSmall => return,
        };
        *counter = counter.wrapping_add(1);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecodeState {
    /// Waiting for three header bytes
    SearchingForHeader,
    /// Got header, waiting for ID/CONTROL
    ReceivingId,
    /// Transport frame, waiting for SEQ
    ReceivingSeq,
    /// Waiting for LENGTH
    ReceivingLength,
    /// Reading payload bytes
    ReceivingPayload,
    /// Reading checksum byte n (0 = most significant)
    ReceivingChecksum(u8),
    /// Checksum verified, waiting for EOF
    ReceivingEof,
}

/// State machine for decoding an incoming byte stream
#[derive(Debug, Clone)]
pub struct StreamDecoder {
    state: DecodeState,
    /// Consecutive header bytes seen, drives unstuffing
    header_bytes_seen: u8,
    id_control: u8,
    seq: u8,
    remaining: u8,
    payload: Vec<u8, MAX_PAYLOAD_SIZE>,
    checksum: u32,
    stats: DecoderStats,
}

impl Default for StreamDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamDecoder {
    /// Create a new decoder
    pub fn new() -> Self {
        Self {
            state: DecodeState::SearchingForHeader,
            header_bytes_seen: 0,
            id_control: 0,
            seq: 0,
            remaining: 0,
            payload: Vec::new(),
            checksum: 0,
            stats: DecoderStats::default(),
        }
    }

    /// Drop any partial frame and go back to searching for a header
    ///
    /// Statistics are kept.
    pub fn reset(&mut self) {
        self.state = DecodeState::SearchingForHeader;
        self.header_bytes_seen = 0;
        self.payload.clear();
        self.remaining = 0;
        self.checksum = 0;
    }

    /// Counters accumulated since creation
    pub fn stats(&self) -> &DecoderStats {
        &self.stats
    }

    /// Returns true while a frame is partially received
    pub fn in_frame(&self) -> bool {
        self.state != DecodeState::SearchingForHeader
    }

    /// Feed a chunk of bytes, yielding each valid frame it completes
    ///
    /// The returned iterator is lazy: bytes after the last frame pulled from
    /// it are not consumed if it is dropped early.
    pub fn feed<'a>(&'a mut self, bytes: &'a [u8]) -> Frames<'a> {
        Frames {
            decoder: self,
            bytes: bytes.iter(),
        }
    }

    /// Feed a single byte to the decoder
    ///
    /// Returns `Ok(Some(frame))` when a complete valid frame is decoded,
    /// `Ok(None)` when more bytes are needed, or `Err` when a partial frame
    /// was discarded. After an error the decoder is already searching for
    /// the next header.
    pub fn push(&mut self, byte: u8) -> Result<Option<Frame>, FrameError> {
        let result = self.step(byte);
        match &result {
            Ok(Some(_)) => self.stats.frames = self.stats.frames.wrapping_add(1),
            Ok(None) => {}
            Err(e) => self.stats.record(*e),
        }
        result
    }

    fn step(&mut self, byte: u8) -> Result<Option<Frame>, FrameError> {
        // Three header bytes mean start-of-frame regardless of state; two
        // inside a frame mean a stuff byte follows.
        if self.header_bytes_seen == 2 {
            self.header_bytes_seen = 0;
            match byte {
                HEADER_BYTE => {
                    let abandoned = self.in_frame();
                    self.state = DecodeState::ReceivingId;
                    return if abandoned {
                        Err(FrameError::Restarted)
                    } else {
                        Ok(None)
                    };
                }
                STUFF_BYTE => return Ok(None),
                _ => {
                    if self.in_frame() {
                        self.reset();
                        return Err(FrameError::InvalidFrame);
                    }
                }
            }
        }

        if byte == HEADER_BYTE {
            self.header_bytes_seen += 1;
        } else {
            self.header_bytes_seen = 0;
        }

        match self.state {
            DecodeState::SearchingForHeader => Ok(None),
            DecodeState::ReceivingId => {
                if FrameId::from_byte(byte).is_none() {
                    self.abort();
                    return Err(FrameError::InvalidId);
                }
                self.id_control = byte;
                self.payload.clear();
                if byte & TRANSPORT_BIT != 0 {
                    self.state = DecodeState::ReceivingSeq;
                } else {
                    self.seq = 0;
                    self.state = DecodeState::ReceivingLength;
                }
                Ok(None)
            }
            DecodeState::ReceivingSeq => {
                self.seq = byte;
                self.state = DecodeState::ReceivingLength;
                Ok(None)
            }
            DecodeState::ReceivingLength => {
                if byte as usize > MAX_PAYLOAD_SIZE {
                    self.abort();
                    return Err(FrameError::PayloadTooLarge);
                }
                self.remaining = byte;
                self.state = if byte == 0 {
                    DecodeState::ReceivingChecksum(0)
                } else {
                    DecodeState::ReceivingPayload
                };
                Ok(None)
            }
            DecodeState::ReceivingPayload => {
                if self.payload.push(byte).is_err() {
                    self.abort();
                    return Err(FrameError::PayloadTooLarge);
                }
                self.remaining -= 1;
                if self.remaining == 0 {
                    self.state = DecodeState::ReceivingChecksum(0);
                }
                Ok(None)
            }
            DecodeState::ReceivingChecksum(n) => {
                self.checksum = if n == 0 {
                    byte as u32
                } else {
                    (self.checksum << 8) | byte as u32
                };
                if (n as usize) + 1 < CHECKSUM_SIZE {
                    self.state = DecodeState::ReceivingChecksum(n + 1);
                    return Ok(None);
                }

                let seq = (self.id_control & TRANSPORT_BIT != 0).then_some(self.seq);
                if compute_checksum(self.id_control, seq, &self.payload) != self.checksum {
                    self.abort();
                    return Err(FrameError::InvalidChecksum);
                }
                self.state = DecodeState::ReceivingEof;
                Ok(None)
            }
            DecodeState::ReceivingEof => {
                self.state = DecodeState::SearchingForHeader;
                if byte != EOF_BYTE {
                    return Err(FrameError::MissingEof);
                }
                // Validated in ReceivingId
                let id = FrameId::from_byte(self.id_control).ok_or(FrameError::InvalidId)?;
                Ok(Some(Frame {
                    id,
                    seq: self.seq,
                    payload: self.payload.clone(),
                }))
            }
        }
    }

    /// Leave the current frame without losing track of header bytes
    fn abort(&mut self) {
        self.state = DecodeState::SearchingForHeader;
        self.payload.clear();
    }
}

/// Iterator over the frames completed by one chunk of input
///
/// Created by [`StreamDecoder::feed`].
pub struct Frames<'a> {
    decoder: &'a mut StreamDecoder,
    bytes: core::slice::Iter<'a, u8>,
}

impl Iterator for Frames<'_> {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        for &byte in self.bytes.by_ref() {
            match self.decoder.push(byte) {
                Ok(Some(frame)) => return Some(frame),
                Ok(None) => {}
                Err(e) => {
                    debug!("Discarding frame: {}", e);
                }
            }
        }
        None
    }
}

/// Decode the first valid frame found in a byte window
///
/// Returns the reason the window held no valid frame otherwise: the last
/// discard reason, or [`FrameError::Incomplete`] if the window ended
/// mid-frame or never contained a header.
pub fn decode_frame(window: &[u8]) -> Result<Frame, FrameError> {
    let mut decoder = StreamDecoder::new();
    let mut last_error = FrameError::Incomplete;
    for &byte in window {
        match decoder.push(byte) {
            Ok(Some(frame)) => return Ok(frame),
            Ok(None) => {}
            Err(e) => last_error = e,
        }
    }
    if decoder.in_frame() {
        return Err(FrameError::Incomplete);
    }
    Err(last_error)
}
