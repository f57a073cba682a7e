//! Application-facing traits
//!
//! These traits define the interface between the protocol engine and the
//! application consuming its frames.

pub mod handler;

pub use handler::FrameHandler;
