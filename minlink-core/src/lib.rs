//! Reliable transport for the minlink serial protocol
//!
//! This crate sits on top of `minlink-protocol` and turns a byte stream
//! into a link an application can use:
//!
//! - [`Context`]: one per serial port, owning decoder, transport, byte sink
//!   and the application's [`FrameHandler`]
//! - Transport layer: sequencing, cumulative ACKs, retransmission and
//!   duplicate suppression for reliable frames
//! - Link configuration, with postcard persistence behind the `serde`
//!   feature
//! - Link counters
//!
//! Everything runs synchronously inside [`Context::poll`] and the send
//! methods. There is no global state and no allocation; time is a `u32`
//! millisecond counter supplied by the caller.

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

#[macro_use]
mod fmt;

pub mod config;
pub mod context;
pub mod error;
pub mod state;
pub mod stats;
pub mod traits;
pub mod transport;
mod tx;

pub use config::{ConfigError, LinkConfig};
pub use context::Context;
pub use error::Error;
pub use state::LinkState;
pub use stats::{LinkStats, TransportStats};
pub use traits::FrameHandler;
pub use transport::{DeliveryFailure, FailureReason};
