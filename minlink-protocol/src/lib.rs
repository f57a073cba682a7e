//! minlink framing
//!
//! This crate implements the link layer of the minlink serial protocol: a
//! point-to-point frame format for connecting a microcontroller to a host
//! (or to another microcontroller) over a plain UART. It is wire-compatible
//! with MIN.
//!
//! # Protocol Overview
//!
//! All frames use the same layout:
//! ```text
//! ┌──────────┬─────────┬───────┬────────┬─────────────┬──────────┬─────┐
//! │ HEADER   │ ID/CTRL │ SEQ   │ LENGTH │ PAYLOAD     │ CRC-32   │ EOF │
//! │ AA AA AA │ 1B      │ 0/1B  │ 1B     │ 0–255B      │ 4B BE    │ 55  │
//! └──────────┴─────────┴───────┴────────┴─────────────┴──────────┴─────┘
//! ```
//!
//! Everything between HEADER and EOF is byte-stuffed so the header can never
//! appear inside a frame. The decoder recovers from line noise on its own:
//! a corrupt frame is dropped and the next header resynchronizes it.
//!
//! Sequencing, acknowledgement and retransmission live one layer up, in
//! `minlink-core`.

#![no_std]
#![deny(unsafe_code)]

#[macro_use]
mod fmt;

pub mod decoder;
pub mod frame;
pub mod id;

pub use decoder::{decode_frame, DecoderStats, Frames, StreamDecoder};
pub use frame::{
    encode_frame, Frame, FrameError, EOF_BYTE, HEADER_BYTE, MAX_ENCODED_SIZE, MAX_PAYLOAD_SIZE,
    STUFF_BYTE,
};
pub use id::{FrameId, MAX_APP_ID};
