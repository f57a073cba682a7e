//! Frame delivery trait

use crate::transport::DeliveryFailure;

/// Receiver of everything the link delivers to the application
///
/// Methods are called synchronously from inside
/// [`Context::poll`](crate::Context::poll) (and the send methods), in the
/// order the events happen. Implementations should return quickly; queue
/// work elsewhere if it is slow.
pub trait FrameHandler {
    /// A frame arrived for the application
    ///
    /// Called exactly once per unreliable frame received and exactly once
    /// per reliable sequence number, regardless of retransmissions.
    fn on_frame(&mut self, port: u8, id: u8, payload: &[u8]);

    /// A reliable frame was given up
    ///
    /// The payload is handed back so the application can decide whether to
    /// queue it again.
    fn on_delivery_failed(&mut self, port: u8, failure: &DeliveryFailure);
}

impl<H: FrameHandler + ?Sized> FrameHandler for &mut H {
    fn on_frame(&mut self, port: u8, id: u8, payload: &[u8]) {
        (**self).on_frame(port, id, payload)
    }

    fn on_delivery_failed(&mut self, port: u8, failure: &DeliveryFailure) {
        (**self).on_delivery_failed(port, failure)
    }
}
