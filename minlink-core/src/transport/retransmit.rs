//! Retransmit scheduling
//!
//! Decides what to do with one outgoing frame given the current time, when
//! it was last sent and how often it has been repeated. Kept free of I/O so
//! the timing rules can be tested directly.

use crate::config::RetransmitPolicy;

/// What to do with an outgoing frame on this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Retransmit {
    /// Never sent; send now
    Send,
    /// Sent recently; keep waiting for the ACK
    Wait,
    /// Timed out; send again
    Resend,
    /// Timed out with the retry budget spent; give up
    Fail,
}

/// Milliseconds from `since` to `now` on a wrapping clock
pub fn elapsed_ms(now: u32, since: u32) -> u32 {
    now.wrapping_sub(since)
}

/// Decide the next action for an outgoing frame
///
/// # Arguments
/// - `now`: current time in ms
/// - `last_sent`: time of the latest transmission, or None if never sent
/// - `retransmits`: transmissions after the first one
/// - `policy`: timeout and retry budget
pub fn decide(
    now: u32,
    last_sent: Option<u32>,
    retransmits: u8,
    policy: &RetransmitPolicy,
) -> Retransmit {
    let Some(last_sent) = last_sent else {
        return Retransmit::Send;
    };

    if elapsed_ms(now, last_sent) < policy.timeout_ms {
        return Retransmit::Wait;
    }

    if retransmits >= policy.max_retransmits {
        Retransmit::Fail
    } else {
        Retransmit::Resend
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POLICY: RetransmitPolicy = RetransmitPolicy {
        timeout_ms: 1000,
        max_retransmits: 3,
    };

    #[test]
    fn test_unsent_frame_goes_out() {
        assert_eq!(decide(0, None, 0, &POLICY), Retransmit::Send);
        assert_eq!(decide(u32::MAX, None, 0, &POLICY), Retransmit::Send);
    }

    #[test]
    fn test_waits_until_timeout() {
        assert_eq!(decide(500, Some(0), 0, &POLICY), Retransmit::Wait);
        assert_eq!(decide(999, Some(0), 0, &POLICY), Retransmit::Wait);
        assert_eq!(decide(1000, Some(0), 0, &POLICY), Retransmit::Resend);
    }

    #[test]
    fn test_fails_when_budget_spent() {
        assert_eq!(decide(5000, Some(3000), 2, &POLICY), Retransmit::Resend);
        assert_eq!(decide(5000, Some(3000), 3, &POLICY), Retransmit::Fail);
        // Still waiting is not a failure, even with the budget spent
        assert_eq!(decide(3500, Some(3000), 3, &POLICY), Retransmit::Wait);
    }

    #[test]
    fn test_wraparound() {
        let sent = u32::MAX - 400;
        // 500 ms after sending, the clock has wrapped
        assert_eq!(decide(99, Some(sent), 0, &POLICY), Retransmit::Wait);
        // 1000 ms after sending
        assert_eq!(decide(599, Some(sent), 0, &POLICY), Retransmit::Resend);
        assert_eq!(elapsed_ms(599, sent), 1000);
    }

    #[test]
    fn test_zero_retry_budget() {
        let policy = RetransmitPolicy {
            timeout_ms: 10,
            max_retransmits: 0,
        };
        assert_eq!(decide(10, Some(0), 0, &policy), Retransmit::Fail);
    }
}
