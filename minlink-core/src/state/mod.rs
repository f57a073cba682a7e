//! Transport link state
//!
//! The transport starts out idle and moves to running on the first
//! sequenced traffic in either direction. Any reset returns it to idle.

pub mod events;
pub mod machine;

pub use events::LinkEvent;
pub use machine::LinkState;
