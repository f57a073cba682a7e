//! State machine definition

use super::events::LinkEvent;

/// Transport link states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkState {
    /// No sequenced traffic since creation or the last reset
    #[default]
    Idle,
    /// Sequence numbers are in use
    Running,
}

impl LinkState {
    /// Check if sequence numbers are in use
    pub fn is_running(&self) -> bool {
        matches!(self, LinkState::Running)
    }

    /// Process an event and return the next state
    pub fn transition(self, event: LinkEvent) -> Self {
        use LinkEvent::*;
        use LinkState::*;

        match (self, event) {
            (_, Reset) => Idle,
            (Idle, Queued | FrameReceived | AckReceived) => Running,
            (Running, _) => Running,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_idle() {
        assert_eq!(LinkState::default(), LinkState::Idle);
        assert!(!LinkState::default().is_running());
    }

    #[test]
    fn test_traffic_starts_link() {
        for event in [
            LinkEvent::Queued,
            LinkEvent::FrameReceived,
            LinkEvent::AckReceived,
        ] {
            assert_eq!(LinkState::Idle.transition(event), LinkState::Running);
        }
    }

    #[test]
    fn test_reset_returns_to_idle() {
        assert_eq!(
            LinkState::Running.transition(LinkEvent::Reset),
            LinkState::Idle
        );
        assert_eq!(LinkState::Idle.transition(LinkEvent::Reset), LinkState::Idle);
    }

    #[test]
    fn test_running_stays_running() {
        let state = LinkState::Running
            .transition(LinkEvent::Queued)
            .transition(LinkEvent::AckReceived);
        assert_eq!(state, LinkState::Running);
    }
}
