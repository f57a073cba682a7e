//! Reliable transport
//!
//! Go-back-N over the frame codec. Reliable frames are queued with a
//! sequence number, sent in order, and resent until the peer acknowledges
//! them with a cumulative ACK. The receiver only accepts the next expected
//! sequence number, so every payload reaches the application once and in
//! order.
//!
//! ```text
//!  enqueue ──► queue [sn_min .. next_seq) ──service──► sink
//!                 ▲                                     │
//!                 └──── ACK(rn) pops seq < rn ◄── peer ◄┘
//! ```
//!
//! When a frame runs out of retries the sequence can no longer be trusted,
//! so the transport sends RESET and both sides restart numbering from 0.

mod entry;
pub mod retransmit;

pub use entry::{DeliveryFailure, FailureReason};
pub use retransmit::{decide, Retransmit};

use heapless::Deque;
use minlink_hal::ByteSink;
use minlink_protocol::{Frame, FrameId};

use crate::config::{LinkConfig, RetransmitPolicy, MAX_WINDOW_SIZE};
use crate::error::Error;
use crate::state::{LinkEvent, LinkState};
use crate::stats::{bump, TransportStats};
use crate::traits::FrameHandler;
use crate::tx::send_frame;
use entry::OutgoingEntry;
use retransmit::elapsed_ms;

/// Sequence numbers behind `rn` by at most this much count as duplicates;
/// anything further is treated as ahead of `rn`
const DUPLICATE_HORIZON: u8 = 128;

/// Sender and receiver state for one link
pub struct Transport {
    queue: Deque<OutgoingEntry, MAX_WINDOW_SIZE>,
    window_size: usize,
    policy: RetransmitPolicy,
    ack_interval_ms: u32,
    idle_timeout_ms: u32,
    /// Sequence number for the next queued frame
    next_seq: u8,
    /// Next sequence number expected from the peer
    rn: u8,
    state: LinkState,
    /// RESET still has to reach the wire before any sequenced frame
    reset_pending: bool,
    last_ack_sent_ms: Option<u32>,
    last_frame_received_ms: Option<u32>,
    last_received_ms: Option<u32>,
    stats: TransportStats,
}

impl Transport {
    /// Create a transport from a validated configuration
    pub fn new(config: &LinkConfig) -> Self {
        Self {
            queue: Deque::new(),
            window_size: usize::from(config.window_size).clamp(1, MAX_WINDOW_SIZE),
            policy: config.retransmit_policy(),
            ack_interval_ms: config.ack_retransmit_timeout_ms,
            idle_timeout_ms: config.idle_timeout_ms,
            next_seq: 0,
            rn: 0,
            state: LinkState::Idle,
            reset_pending: false,
            last_ack_sent_ms: None,
            last_frame_received_ms: None,
            last_received_ms: None,
            stats: TransportStats::default(),
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn stats(&self) -> &TransportStats {
        &self.stats
    }

    /// Number of frames waiting for an ACK (sent or not)
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Oldest unacknowledged sequence number
    pub fn sn_min(&self) -> u8 {
        self.queue.front().map_or(self.next_seq, OutgoingEntry::seq)
    }

    /// Sequence number the next queued frame will get
    pub fn next_seq(&self) -> u8 {
        self.next_seq
    }

    /// Next sequence number expected from the peer
    pub fn rn(&self) -> u8 {
        self.rn
    }

    /// Returns true while a RESET is waiting for sink space
    pub fn reset_pending(&self) -> bool {
        self.reset_pending
    }

    /// Returns true if anything arrived from the peer within the idle timeout
    pub fn is_remote_connected(&self, now: u32) -> bool {
        self.last_received_ms
            .map_or(false, |t| elapsed_ms(now, t) < self.idle_timeout_ms)
    }

    /// Record that a valid frame of any kind arrived
    pub fn note_received(&mut self, now: u32) {
        self.last_received_ms = Some(now);
    }

    /// Queue a reliable frame
    ///
    /// Returns the sequence number it was assigned. Nothing is sent until
    /// the next [`service`](Self::service).
    pub fn enqueue<E>(&mut self, id: u8, payload: &[u8]) -> Result<u8, Error<E>> {
        if self.queue.len() >= self.window_size {
            debug!("Queue full ({} pending)", self.queue.len());
            return Err(Error::QueueFull);
        }

        let seq = self.next_seq;
        let frame = Frame::transport(id, seq, payload)?;
        self.queue
            .push_back(OutgoingEntry::new(frame))
            .map_err(|_| Error::QueueFull)?;
        self.next_seq = seq.wrapping_add(1);

        let depth = self.queue.len() as u8;
        if depth > self.stats.queue_high_water {
            self.stats.queue_high_water = depth;
        }
        self.state = self.state.transition(LinkEvent::Queued);

        debug!("Queued id={} seq={} len={}", id, seq, payload.len());
        Ok(seq)
    }

    /// Run one transport tick
    ///
    /// Sends new frames, resends timed-out ones, gives up on frames out of
    /// retries, and repeats the last ACK while the peer is active. Sink
    /// errors are logged and counted; the affected frame stays queued.
    pub fn service<S: ByteSink, H: FrameHandler>(
        &mut self,
        now: u32,
        port: u8,
        sink: &mut S,
        handler: &mut H,
    ) {
        // Frames numbered from 0 must not overtake the RESET
        if self.reset_pending && self.flush_reset(sink).is_err() {
            return;
        }

        let mut failed = None;

        for (index, entry) in self.queue.iter_mut().enumerate() {
            let action = decide(now, entry.last_sent, entry.retransmits, &self.policy);
            match action {
                Retransmit::Wait => continue,
                Retransmit::Fail => {
                    failed = Some(index);
                    break;
                }
                Retransmit::Send | Retransmit::Resend => {}
            }

            match send_frame(sink, &entry.frame) {
                Ok(_) => {
                    if action == Retransmit::Resend {
                        trace!("Resend seq={}", entry.seq());
                        bump(&mut self.stats.frames_retransmitted);
                    } else {
                        trace!("Send seq={}", entry.seq());
                        bump(&mut self.stats.frames_sent);
                    }
                    entry.mark_sent(now);
                }
                Err(Error::NoTxSpace { needed, available }) => {
                    trace!("TX stall: need {} have {}", needed, available);
                    bump(&mut self.stats.tx_stalls);
                    break;
                }
                Err(_) => {
                    warn!("TX failed for seq={}", entry.seq());
                    bump(&mut self.stats.tx_errors);
                    break;
                }
            }
        }

        if let Some(index) = failed {
            self.give_up(index, port, sink, handler);
        }

        if self.ack_due(now) {
            self.send_ack(now, sink);
        }
    }

    /// Handle a transport, ACK or RESET frame from the peer
    pub fn receive<S: ByteSink, H: FrameHandler>(
        &mut self,
        now: u32,
        port: u8,
        frame: &Frame,
        sink: &mut S,
        handler: &mut H,
    ) {
        match frame.id {
            FrameId::Ack => self.on_ack(frame.seq),
            FrameId::Reset => {
                debug!("RESET received");
                bump(&mut self.stats.resets_received);
                // The peer restarted numbering itself
                self.reset_pending = false;
                self.resync(None, port, handler);
            }
            FrameId::Transport(id) => self.on_data(now, port, id, frame, sink, handler),
            FrameId::App(_) => {}
        }
    }

    /// Drop all queue and window state
    ///
    /// Every pending frame is reported with [`FailureReason::LinkReset`].
    /// With `inform_peer`, a RESET frame is sent so the peer restarts its
    /// numbering too. If the sink has no room for it, the RESET is retried
    /// on every [`service`](Self::service) tick and no sequenced frame goes
    /// out before it.
    pub fn reset<S: ByteSink, H: FrameHandler>(
        &mut self,
        inform_peer: bool,
        port: u8,
        sink: &mut S,
        handler: &mut H,
    ) -> Result<(), Error<S::Error>> {
        while let Some(entry) = self.queue.pop_front() {
            report(&mut self.stats, port, entry.into_failure(FailureReason::LinkReset), handler);
        }
        self.next_seq = 0;
        self.rn = 0;
        self.last_ack_sent_ms = None;
        self.state = self.state.transition(LinkEvent::Reset);
        debug!("Transport reset (inform_peer={})", inform_peer);

        if inform_peer {
            self.reset_pending = true;
            return match self.flush_reset(sink) {
                Ok(()) | Err(Error::NoTxSpace { .. }) => Ok(()),
                Err(e) => Err(e),
            };
        }
        Ok(())
    }

    /// Try to send the pending RESET
    fn flush_reset<S: ByteSink>(&mut self, sink: &mut S) -> Result<(), Error<S::Error>> {
        match send_frame(sink, &Frame::reset()) {
            Ok(_) => {
                debug!("RESET sent");
                self.reset_pending = false;
                Ok(())
            }
            Err(e) => {
                match e {
                    Error::NoTxSpace { .. } => bump(&mut self.stats.tx_stalls),
                    _ => {
                        warn!("Failed to send RESET");
                        bump(&mut self.stats.tx_errors);
                    }
                }
                Err(e)
            }
        }
    }

    fn on_ack(&mut self, ack: u8) {
        // Anything acknowledged before our RESET left belongs to the old
        // numbering
        if self.reset_pending {
            debug!("Ignoring ACK {} while RESET is pending", ack);
            bump(&mut self.stats.spurious_acks);
            return;
        }

        let acked = usize::from(ack.wrapping_sub(self.sn_min()));
        // Sent entries always form a prefix of the queue
        let in_flight = self.queue.iter().take_while(|e| e.is_sent()).count();

        if acked > in_flight {
            warn!("Spurious ACK {} (sn_min={}, in flight {})", ack, self.sn_min(), in_flight);
            bump(&mut self.stats.spurious_acks);
            return;
        }

        for _ in 0..acked {
            self.queue.pop_front();
        }
        self.state = self.state.transition(LinkEvent::AckReceived);
        trace!("ACK {}: {} acked, {} pending", ack, acked, self.queue.len());
    }

    fn on_data<S: ByteSink, H: FrameHandler>(
        &mut self,
        now: u32,
        port: u8,
        id: u8,
        frame: &Frame,
        sink: &mut S,
        handler: &mut H,
    ) {
        self.last_frame_received_ms = Some(now);
        self.state = self.state.transition(LinkEvent::FrameReceived);

        if frame.seq == self.rn {
            self.rn = self.rn.wrapping_add(1);
            bump(&mut self.stats.frames_delivered);
            trace!("Deliver id={} seq={}", id, frame.seq);
            handler.on_frame(port, id, &frame.payload);
        } else {
            let behind = self.rn.wrapping_sub(frame.seq);
            if behind <= DUPLICATE_HORIZON {
                debug!("Duplicate seq={} (rn={})", frame.seq, self.rn);
                bump(&mut self.stats.duplicates);
            } else {
                debug!("Out of order seq={} (rn={})", frame.seq, self.rn);
                bump(&mut self.stats.out_of_order);
            }
        }

        self.send_ack(now, sink);
    }

    /// Give up on the entry at `index` and restart numbering with the peer
    fn give_up<S: ByteSink, H: FrameHandler>(
        &mut self,
        index: usize,
        port: u8,
        sink: &mut S,
        handler: &mut H,
    ) {
        self.resync(Some(index), port, handler);
        self.reset_pending = true;
        // Retried on later ticks if the sink is full
        let _ = self.flush_reset(sink);
    }

    /// Restart sequence numbering from 0
    ///
    /// The entry at `failed` is reported as out of retries, other sent
    /// entries as lost to the reset. Entries never sent are kept and
    /// renumbered.
    fn resync<H: FrameHandler>(&mut self, failed: Option<usize>, port: u8, handler: &mut H) {
        let mut kept: Deque<OutgoingEntry, MAX_WINDOW_SIZE> = Deque::new();
        let mut index = 0;

        while let Some(mut entry) = self.queue.pop_front() {
            if failed == Some(index) {
                report(&mut self.stats, port, entry.into_failure(FailureReason::RetriesExhausted), handler);
            } else if entry.is_sent() {
                report(&mut self.stats, port, entry.into_failure(FailureReason::LinkReset), handler);
            } else {
                entry.renumber(kept.len() as u8);
                // Same capacity as the queue it came from
                let _ = kept.push_back(entry);
            }
            index += 1;
        }

        self.queue = kept;
        self.next_seq = self.queue.len() as u8;
        self.rn = 0;
        self.last_ack_sent_ms = None;
        self.state = self.state.transition(LinkEvent::Reset);
        if !self.queue.is_empty() {
            self.state = self.state.transition(LinkEvent::Queued);
        }
    }

    fn ack_due(&self, now: u32) -> bool {
        let peer_active = self
            .last_frame_received_ms
            .map_or(false, |t| elapsed_ms(now, t) < self.idle_timeout_ms);
        let interval_passed = self
            .last_ack_sent_ms
            .map_or(true, |t| elapsed_ms(now, t) >= self.ack_interval_ms);
        peer_active && interval_passed
    }

    fn send_ack<S: ByteSink>(&mut self, now: u32, sink: &mut S) {
        match send_frame(sink, &Frame::ack(self.rn)) {
            Ok(_) => {
                bump(&mut self.stats.acks_sent);
                self.last_ack_sent_ms = Some(now);
            }
            Err(Error::NoTxSpace { .. }) => {
                trace!("ACK deferred, sink full");
                bump(&mut self.stats.tx_stalls);
            }
            Err(_) => {
                warn!("Failed to send ACK {}", self.rn);
                bump(&mut self.stats.tx_errors);
            }
        }
    }
}

fn report<H: FrameHandler>(
    stats: &mut TransportStats,
    port: u8,
    failure: DeliveryFailure,
    handler: &mut H,
) {
    warn!(
        "Delivery failed: id={} seq={} reason={}",
        failure.id, failure.seq, failure.reason
    );
    bump(&mut stats.delivery_failures);
    handler.on_delivery_failed(port, &failure);
}
