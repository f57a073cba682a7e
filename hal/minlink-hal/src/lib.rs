//! minlink Hardware Abstraction Layer
//!
//! This crate defines the collaborators the protocol engine talks to. A
//! board support crate (or a host-side serial port wrapper) implements them,
//! and the engine stays free of any specific peripheral.
//!
//! # Layering
//!
//! ```text
//!   application  ──FrameHandler──┐
//!        │                       │
//!   minlink-core (Context) ◄─────┘
//!        │            │
//!    ByteSink     ByteSource      Clock
//!        │            │             │
//!   UART TX ring  UART RX ring   tick counter
//! ```
//!
//! # Traits
//!
//! - [`uart::ByteSink`], [`uart::ByteSource`] - Serial byte transport
//! - [`clock::Clock`] - Millisecond time source

#![no_std]
#![deny(unsafe_code)]

pub mod clock;
pub mod uart;

pub use clock::Clock;
pub use uart::{ByteSink, ByteSource};
