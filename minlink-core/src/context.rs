//! Per-port link context
//!
//! A [`Context`] owns everything one serial link needs: the stream decoder,
//! the transport state, the byte sink and the application's frame handler.
//! Contexts share nothing, so several ports can run side by side.

use minlink_hal::{ByteSink, ByteSource, Clock};
use minlink_protocol::{Frame, FrameId, StreamDecoder};

use crate::config::{ConfigError, LinkConfig};
use crate::error::Error;
use crate::state::LinkState;
use crate::stats::{bump, LinkStats};
use crate::traits::FrameHandler;
use crate::transport::Transport;
use crate::tx::send_frame;

/// Bytes read from a source per [`Context::poll_io`] call
const RX_CHUNK_SIZE: usize = 64;

/// One end of a serial link
pub struct Context<S: ByteSink, H: FrameHandler> {
    port: u8,
    config: LinkConfig,
    decoder: StreamDecoder,
    transport: Transport,
    sink: S,
    handler: H,
    frames_received: u32,
    transport_frames_dropped: u32,
}

impl<S: ByteSink, H: FrameHandler> Context<S, H> {
    /// Create a context with the default configuration (transport enabled)
    pub fn new(port: u8, sink: S, handler: H) -> Self {
        let config = LinkConfig::default();
        Self {
            port,
            config,
            decoder: StreamDecoder::new(),
            transport: Transport::new(&config),
            sink,
            handler,
            frames_received: 0,
            transport_frames_dropped: 0,
        }
    }

    /// Create a context with a custom configuration
    pub fn with_config(
        port: u8,
        config: LinkConfig,
        sink: S,
        handler: H,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            transport: Transport::new(&config),
            ..Self::new(port, sink, handler)
        })
    }

    /// Process received bytes, then run the transport tick
    ///
    /// `bytes` may hold any part of the stream: partial frames are carried
    /// over to the next call. Delivered frames reach the handler before
    /// this returns. Call regularly, with an empty slice if nothing
    /// arrived, so retransmissions and ACKs go out on time.
    pub fn poll(&mut self, now: u32, bytes: &[u8]) {
        for &byte in bytes {
            match self.decoder.push(byte) {
                Ok(Some(frame)) => self.dispatch(now, frame),
                Ok(None) => {}
                Err(e) => {
                    debug!("Port {}: frame discarded: {}", self.port, e);
                }
            }
        }

        if self.config.transport {
            self.transport
                .service(now, self.port, &mut self.sink, &mut self.handler);
        }
    }

    /// Read one chunk from `source` and poll with the current time
    ///
    /// Returns the number of bytes read. A source reporting more than the
    /// chunk size is clamped to it.
    pub fn poll_io<R: ByteSource, C: Clock>(
        &mut self,
        source: &mut R,
        clock: &C,
    ) -> Result<usize, R::Error> {
        let mut buf = [0u8; RX_CHUNK_SIZE];
        let n = source.read(&mut buf)?.min(buf.len());
        if n > 0 {
            trace!("Port {}: RX {} bytes", self.port, n);
        }
        self.poll(clock.now_ms(), &buf[..n]);
        Ok(n)
    }

    /// Queue a payload for reliable delivery
    ///
    /// Returns the sequence number assigned. The frame goes out on the next
    /// [`poll`](Self::poll).
    pub fn send_reliable(&mut self, id: u8, payload: &[u8]) -> Result<u8, Error<S::Error>> {
        if !self.config.transport {
            return Err(Error::TransportDisabled);
        }
        self.transport.enqueue(id, payload)
    }

    /// Send a payload once, immediately, without acknowledgement
    pub fn send_unreliable(&mut self, id: u8, payload: &[u8]) -> Result<(), Error<S::Error>> {
        let frame = Frame::new(id, payload)?;
        send_frame(&mut self.sink, &frame)?;
        Ok(())
    }

    /// Clear all transport state
    ///
    /// Pending reliable frames are reported to the handler as failed. With
    /// `inform_peer`, a RESET frame asks the peer to do the same; if the
    /// sink is full it goes out on a later [`poll`](Self::poll), ahead of
    /// any new reliable frame.
    pub fn reset_transport(&mut self, inform_peer: bool) -> Result<(), Error<S::Error>> {
        if !self.config.transport {
            return Err(Error::TransportDisabled);
        }
        self.transport
            .reset(inform_peer, self.port, &mut self.sink, &mut self.handler)
    }

    fn dispatch(&mut self, now: u32, frame: Frame) {
        self.transport.note_received(now);

        match frame.id {
            FrameId::App(id) => {
                bump(&mut self.frames_received);
                self.handler.on_frame(self.port, id, &frame.payload);
            }
            _ if !self.config.transport => {
                debug!("Port {}: transport disabled, dropping {}", self.port, frame.id);
                bump(&mut self.transport_frames_dropped);
            }
            _ => self
                .transport
                .receive(now, self.port, &frame, &mut self.sink, &mut self.handler),
        }
    }

    pub fn port(&self) -> u8 {
        self.port
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Reliable frames waiting for an ACK
    pub fn pending(&self) -> usize {
        self.transport.pending()
    }

    pub fn link_state(&self) -> LinkState {
        self.transport.state()
    }

    /// Snapshot of all counters
    pub fn stats(&self) -> LinkStats {
        LinkStats {
            decoder: *self.decoder.stats(),
            transport: *self.transport.stats(),
            frames_received: self.frames_received,
            transport_frames_dropped: self.transport_frames_dropped,
        }
    }

    /// Returns true if any valid frame arrived within the idle timeout
    pub fn is_remote_connected(&self, now: u32) -> bool {
        self.transport.is_remote_connected(now)
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::DeliveryFailure;
    use heapless::Vec;

    type Sink = Vec<u8, 1024>;

    #[derive(Default)]
    struct Recorder {
        frames: std::vec::Vec<(u8, u8, std::vec::Vec<u8>)>,
        failures: usize,
    }

    impl FrameHandler for Recorder {
        fn on_frame(&mut self, port: u8, id: u8, payload: &[u8]) {
            self.frames.push((port, id, payload.to_vec()));
        }

        fn on_delivery_failed(&mut self, _port: u8, _failure: &DeliveryFailure) {
            self.failures += 1;
        }
    }

    struct FixedClock(u32);

    impl Clock for FixedClock {
        fn now_ms(&self) -> u32 {
            self.0
        }
    }

    struct Chunks<'a>(&'a [u8]);

    impl ByteSource for Chunks<'_> {
        type Error = ();

        fn read(&mut self, buf: &mut [u8]) -> Result<usize, ()> {
            let n = self.0.len().min(buf.len());
            buf[..n].copy_from_slice(&self.0[..n]);
            self.0 = &self.0[n..];
            Ok(n)
        }
    }

    fn context() -> Context<Sink, Recorder> {
        Context::new(3, Sink::new(), Recorder::default())
    }

    #[test]
    fn test_unreliable_roundtrip() {
        let mut tx = context();
        tx.send_unreliable(0x12, &[1, 2, 3]).unwrap();

        let mut rx = context();
        rx.poll(0, tx.sink());

        assert_eq!(rx.handler().frames, [(3, 0x12, std::vec![1, 2, 3])]);
        assert_eq!(rx.stats().frames_received, 1);
        // Unreliable frames are never acknowledged
        assert!(rx.sink().is_empty());
    }

    #[test]
    fn test_unreliable_rejects_invalid_id() {
        let mut ctx = context();
        assert_eq!(
            ctx.send_unreliable(0x40, &[]),
            Err(Error::Frame(minlink_protocol::FrameError::InvalidId))
        );
        assert!(ctx.sink().is_empty());
    }

    #[test]
    fn test_unreliable_without_space() {
        let mut ctx = Context::new(0, Vec::<u8, 8>::new(), Recorder::default());
        assert!(matches!(
            ctx.send_unreliable(1, &[0; 16]),
            Err(Error::NoTxSpace { .. })
        ));
    }

    #[test]
    fn test_with_config_validates() {
        let config = LinkConfig {
            window_size: 0,
            ..LinkConfig::default()
        };
        let result = Context::with_config(0, config, Sink::new(), Recorder::default());
        assert!(matches!(result, Err(ConfigError::InvalidWindow)));
    }

    #[test]
    fn test_reliable_goes_out_on_poll() {
        let mut ctx = context();
        assert_eq!(ctx.send_reliable(1, &[9]), Ok(0));
        assert!(ctx.sink().is_empty());
        assert_eq!(ctx.pending(), 1);
        assert!(ctx.link_state().is_running());

        ctx.poll(0, &[]);
        let expected = Frame::transport(1, 0, &[9]).unwrap().encode_to_vec().unwrap();
        assert_eq!(ctx.sink().as_slice(), expected.as_slice());
    }

    #[test]
    fn test_transport_disabled() {
        let mut ctx = Context::with_config(
            0,
            LinkConfig::unreliable(),
            Sink::new(),
            Recorder::default(),
        )
        .unwrap();

        assert_eq!(ctx.send_reliable(1, &[]), Err(Error::TransportDisabled));
        assert_eq!(ctx.reset_transport(true), Err(Error::TransportDisabled));

        let data = Frame::transport(1, 0, &[]).unwrap().encode_to_vec().unwrap();
        let ack = Frame::ack(1).encode_to_vec().unwrap();
        ctx.poll(0, &data);
        ctx.poll(0, &ack);

        assert!(ctx.handler().frames.is_empty());
        assert!(ctx.sink().is_empty());
        assert_eq!(ctx.stats().transport_frames_dropped, 2);
    }

    #[test]
    fn test_noise_is_counted_not_delivered() {
        let mut ctx = context();
        let mut bytes = std::vec![0xAA, 0xAA, 0xAA, 0x01, 0x02, 0x00];
        bytes.extend_from_slice(&[0xDE, 0xAD, 0xBE, 0xEF, 0x55]);
        ctx.poll(0, &bytes);

        assert!(ctx.handler().frames.is_empty());
        assert_eq!(ctx.stats().decoder.checksum_errors, 1);
    }

    #[test]
    fn test_poll_io_reads_source() {
        let frame = Frame::new(5, &[0x42; 100]).unwrap().encode_to_vec().unwrap();
        let mut source = Chunks(&frame);
        let clock = FixedClock(10);
        let mut ctx = context();

        let mut total = 0;
        loop {
            let n = ctx.poll_io(&mut source, &clock).unwrap();
            if n == 0 {
                break;
            }
            total += n;
        }

        assert_eq!(total, frame.len());
        assert_eq!(ctx.handler().frames.len(), 1);
        assert!(ctx.is_remote_connected(10));
    }

    #[test]
    fn test_poll_io_clamps_overlong_read() {
        struct Overreporting;

        impl ByteSource for Overreporting {
            type Error = ();

            fn read(&mut self, buf: &mut [u8]) -> Result<usize, ()> {
                buf.fill(0);
                Ok(buf.len() + 10)
            }
        }

        let mut ctx = context();
        let n = ctx.poll_io(&mut Overreporting, &FixedClock(0)).unwrap();
        assert_eq!(n, RX_CHUNK_SIZE);
        assert!(ctx.handler().frames.is_empty());
    }

    #[test]
    fn test_reset_transport_reports_pending() {
        let mut ctx = context();
        ctx.send_reliable(1, &[]).unwrap();
        ctx.poll(0, &[]);
        ctx.sink_mut().clear();

        ctx.reset_transport(true).unwrap();
        assert_eq!(ctx.handler().failures, 1);
        assert_eq!(ctx.pending(), 0);
        assert_eq!(ctx.link_state(), LinkState::Idle);
        let reset = Frame::reset().encode_to_vec().unwrap();
        assert_eq!(ctx.sink().as_slice(), reset.as_slice());
    }
}
