//! Frame encoding for the minlink protocol.
//!
//! Frame format:
//! - HEADER (3 bytes): 0xAA 0xAA 0xAA start-of-frame marker
//! - ID/CONTROL (1 byte): see [`FrameId`]
//! - SEQ (1 byte): sequence number, transport and control frames only
//! - LENGTH (1 byte): payload length (0-255)
//! - PAYLOAD (0-255 bytes)
//! - CHECKSUM (4 bytes): CRC-32 of ID/CONTROL, SEQ, LENGTH and PAYLOAD, big-endian
//! - EOF (1 byte): 0x55
//!
//! Everything between the header and EOF is byte-stuffed: after two
//! consecutive 0xAA bytes a 0x55 is inserted, so three 0xAA in a row only
//! ever appear as a frame header. The checksum covers the unstuffed bytes.

use crc::{Crc, CRC_32_ISO_HDLC};
use heapless::Vec;

use crate::id::FrameId;

/// Start-of-frame byte, sent three times
pub const HEADER_BYTE: u8 = 0xAA;

/// Byte inserted after two consecutive header bytes inside a frame
pub const STUFF_BYTE: u8 = 0x55;

/// End-of-frame byte
pub const EOF_BYTE: u8 = 0x55;

/// Number of header bytes that start a frame
pub const HEADER_LEN: usize = 3;

/// Maximum payload size in bytes
pub const MAX_PAYLOAD_SIZE: usize = 255;

/// Checksum width in bytes
pub const CHECKSUM_SIZE: usize = 4;

/// Largest stuffable section (ID/CONTROL + SEQ + LENGTH + MAX_PAYLOAD + CHECKSUM)
const MAX_BODY_SIZE: usize = 1 + 1 + 1 + MAX_PAYLOAD_SIZE + CHECKSUM_SIZE;

/// Maximum encoded frame size, assuming worst-case stuffing
pub const MAX_ENCODED_SIZE: usize = HEADER_LEN + MAX_BODY_SIZE + MAX_BODY_SIZE / 2 + 1;

pub(crate) const CRC: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// Errors that can occur during frame encoding or decoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Payload exceeds maximum allowed size
    PayloadTooLarge,
    /// Identifier is reserved or out of range
    InvalidId,
    /// Checksum mismatch
    InvalidChecksum,
    /// Stuffing violation inside a frame
    InvalidFrame,
    /// Checksum matched but the end-of-frame byte was wrong
    MissingEof,
    /// A new header arrived before the current frame completed
    Restarted,
    /// Frame is incomplete (need more bytes)
    Incomplete,
    /// Buffer too small for encoding
    BufferTooSmall,
}

/// A parsed or constructed frame
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Frame {
    /// Identifier and frame kind
    pub id: FrameId,
    /// Sequence number (zero for application frames)
    pub seq: u8,
    /// Payload data
    pub payload: Vec<u8, MAX_PAYLOAD_SIZE>,
}

impl Frame {
    /// Create an unreliable application frame
    pub fn new(id: u8, payload: &[u8]) -> Result<Self, FrameError> {
        Self::with_id(FrameId::App(id), 0, payload)
    }

    /// Create a sequenced transport frame
    pub fn transport(id: u8, seq: u8, payload: &[u8]) -> Result<Self, FrameError> {
        Self::with_id(FrameId::Transport(id), seq, payload)
    }

    /// Create an acknowledgement
    ///
    /// `rn` is the next sequence number the sender expects, so it
    /// acknowledges every frame up to and including `rn - 1`.
    pub fn ack(rn: u8) -> Self {
        let mut payload = Vec::new();
        // Capacity is MAX_PAYLOAD_SIZE; one byte always fits
        let _ = payload.push(rn);
        Self {
            id: FrameId::Ack,
            seq: rn,
            payload,
        }
    }

    /// Create a transport reset request
    pub fn reset() -> Self {
        Self {
            id: FrameId::Reset,
            seq: 0,
            payload: Vec::new(),
        }
    }

    fn with_id(id: FrameId, seq: u8, payload: &[u8]) -> Result<Self, FrameError> {
        if !id.is_valid() {
            return Err(FrameError::InvalidId);
        }
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(FrameError::PayloadTooLarge);
        }

        let payload = Vec::from_slice(payload).map_err(|_| FrameError::PayloadTooLarge)?;
        Ok(Self { id, seq, payload })
    }

    /// CRC-32 over the unstuffed frame body
    pub fn checksum(&self) -> u32 {
        let seq = self.id.has_seq().then_some(self.seq);
        compute_checksum(self.id.to_byte(), seq, &self.payload)
    }

    /// Size on the wire before stuffing
    pub fn wire_size(&self) -> usize {
        let seq_len = usize::from(self.id.has_seq());
        HEADER_LEN + 1 + seq_len + 1 + self.payload.len() + CHECKSUM_SIZE + 1
    }

    /// Encode this frame into a byte buffer
    ///
    /// Returns the number of bytes written. Fails with
    /// [`FrameError::InvalidId`] if the identifier does not fit the
    /// ID/control byte.
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize, FrameError> {
        if !self.id.is_valid() {
            return Err(FrameError::InvalidId);
        }

        let mut out = Stuffer::new(buffer);

        for _ in 0..HEADER_LEN {
            out.raw(HEADER_BYTE)?;
        }

        out.stuffed(self.id.to_byte())?;
        if self.id.has_seq() {
            out.stuffed(self.seq)?;
        }
        out.stuffed(self.payload.len() as u8)?;
        for &byte in &self.payload {
            out.stuffed(byte)?;
        }
        for byte in self.checksum().to_be_bytes() {
            out.stuffed(byte)?;
        }

        // Unstuffed: the receiver only looks for it after the checksum
        out.raw(EOF_BYTE)?;

        Ok(out.len())
    }

    /// Encode this frame into a heapless Vec
    pub fn encode_to_vec(&self) -> Result<Vec<u8, MAX_ENCODED_SIZE>, FrameError> {
        let mut buffer = [0u8; MAX_ENCODED_SIZE];
        let len = self.encode(&mut buffer)?;
        Vec::from_slice(&buffer[..len]).map_err(|_| FrameError::BufferTooSmall)
    }
}

/// Encode an unreliable application frame in one step
pub fn encode_frame(id: u8, payload: &[u8]) -> Result<Vec<u8, MAX_ENCODED_SIZE>, FrameError> {
    Frame::new(id, payload)?.encode_to_vec()
}

pub(crate) fn compute_checksum(id_control: u8, seq: Option<u8>, payload: &[u8]) -> u32 {
    let mut digest = CRC.digest();
    digest.update(&[id_control]);
    if let Some(seq) = seq {
        digest.update(&[seq]);
    }
    digest.update(&[payload.len() as u8]);
    digest.update(payload);
    digest.finalize()
}

/// Output cursor applying byte stuffing
struct Stuffer<'a> {
    buffer: &'a mut [u8],
    pos: usize,
    header_run: u8,
}

impl<'a> Stuffer<'a> {
    fn new(buffer: &'a mut [u8]) -> Self {
        Self {
            buffer,
            pos: 0,
            header_run: 0,
        }
    }

    fn len(&self) -> usize {
        self.pos
    }

    fn raw(&mut self, byte: u8) -> Result<(), FrameError> {
        let slot = self
            .buffer
            .get_mut(self.pos)
            .ok_or(FrameError::BufferTooSmall)?;
        *slot = byte;
        self.pos += 1;
        Ok(())
    }

    fn stuffed(&mut self, byte: u8) -> Result<(), FrameError> {
        self.raw(byte)?;
        if byte == HEADER_BYTE {
            self.header_run += 1;
            if self.header_run == 2 {
                self.raw(STUFF_BYTE)?;
                self.header_run = 0;
            }
        } else {
            self.header_run = 0;
        }
        Ok(())
    }
}
