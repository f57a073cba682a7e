//! Millisecond time source

/// Monotonic millisecond counter
///
/// The counter is free-running and wraps at `u32::MAX` (roughly every 49
/// days). Consumers must compare timestamps with wrapping arithmetic.
pub trait Clock {
    /// Current time in milliseconds
    fn now_ms(&self) -> u32;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_ms(&self) -> u32 {
        (**self).now_ms()
    }
}
