//! Configuration types
//!
//! Link parameters shared by the transport and the context. With the
//! `serde` feature they can be persisted as postcard binary data.

pub mod link;
#[cfg(feature = "serde")]
pub mod persist;

pub use link::*;
