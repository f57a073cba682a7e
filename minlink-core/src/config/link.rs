//! Link configuration

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Current configuration format version
pub const CONFIG_VERSION: u8 = 1;

/// Largest supported outgoing window (and queue capacity)
pub const MAX_WINDOW_SIZE: usize = 16;

/// Default retransmit interval for unacknowledged frames
pub const DEFAULT_RETRANSMIT_TIMEOUT_MS: u32 = 1000;

/// Default interval for repeating an ACK while the peer is active
pub const DEFAULT_ACK_RETRANSMIT_TIMEOUT_MS: u32 = 250;

/// Default time without traffic after which the peer counts as gone
pub const DEFAULT_IDLE_TIMEOUT_MS: u32 = 500;

/// Default number of retransmissions before a frame is given up
pub const DEFAULT_MAX_RETRANSMITS: u8 = 8;

/// Timeouts must stay below half the clock range to compare correctly
/// across wraparound
const MAX_TIMEOUT_MS: u32 = u32::MAX / 2;

/// Configuration validation and persistence errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Window size is zero or above [`MAX_WINDOW_SIZE`]
    InvalidWindow,
    /// A timeout is zero or too large for wrap-safe comparison
    InvalidTimeout,
    /// Serialization failed (buffer too small)
    Serialize,
    /// Deserialization failed
    Deserialize,
    /// Config version mismatch
    VersionMismatch,
}

/// Per-link protocol parameters
///
/// Both ends of a link must agree on whether transport mode is used; the
/// timing parameters only affect the local side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LinkConfig {
    /// Format version, for persisted configs
    pub version: u8,
    /// Enable the reliable transport layer
    pub transport: bool,
    /// Maximum number of unacknowledged reliable frames
    pub window_size: u8,
    /// Time before an unacknowledged frame is sent again
    pub retransmit_timeout_ms: u32,
    /// Retransmissions allowed before a frame is reported as failed
    pub max_retransmits: u8,
    /// Interval for repeating the last ACK while the peer is sending
    pub ack_retransmit_timeout_ms: u32,
    /// Silence after which the peer is considered disconnected
    pub idle_timeout_ms: u32,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            transport: true,
            window_size: MAX_WINDOW_SIZE as u8,
            retransmit_timeout_ms: DEFAULT_RETRANSMIT_TIMEOUT_MS,
            max_retransmits: DEFAULT_MAX_RETRANSMITS,
            ack_retransmit_timeout_ms: DEFAULT_ACK_RETRANSMIT_TIMEOUT_MS,
            idle_timeout_ms: DEFAULT_IDLE_TIMEOUT_MS,
        }
    }
}

impl LinkConfig {
    /// Configuration for a link without the transport layer
    pub fn unreliable() -> Self {
        Self {
            transport: false,
            ..Self::default()
        }
    }

    /// Check that all parameters are usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_size == 0 || self.window_size as usize > MAX_WINDOW_SIZE {
            return Err(ConfigError::InvalidWindow);
        }

        let timeouts = [
            self.retransmit_timeout_ms,
            self.ack_retransmit_timeout_ms,
            self.idle_timeout_ms,
        ];
        if timeouts.iter().any(|&t| t == 0 || t > MAX_TIMEOUT_MS) {
            return Err(ConfigError::InvalidTimeout);
        }

        Ok(())
    }

    /// Retry parameters for the retransmit decision
    pub fn retransmit_policy(&self) -> RetransmitPolicy {
        RetransmitPolicy {
            timeout_ms: self.retransmit_timeout_ms,
            max_retransmits: self.max_retransmits,
        }
    }
}

/// Retry parameters for one outgoing frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RetransmitPolicy {
    /// Time before an unacknowledged frame is sent again
    pub timeout_ms: u32,
    /// Retransmissions allowed before giving up
    pub max_retransmits: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = LinkConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert!(config.transport);
        assert_eq!(config.window_size as usize, MAX_WINDOW_SIZE);
    }

    #[test]
    fn test_unreliable_disables_transport() {
        let config = LinkConfig::unreliable();
        assert!(!config.transport);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_window_bounds() {
        let mut config = LinkConfig::default();
        config.window_size = 0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidWindow));

        config.window_size = MAX_WINDOW_SIZE as u8 + 1;
        assert_eq!(config.validate(), Err(ConfigError::InvalidWindow));

        config.window_size = 1;
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_timeout_bounds() {
        let mut config = LinkConfig::default();
        config.retransmit_timeout_ms = 0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidTimeout));

        let mut config = LinkConfig::default();
        config.idle_timeout_ms = u32::MAX;
        assert_eq!(config.validate(), Err(ConfigError::InvalidTimeout));
    }

    #[test]
    fn test_retransmit_policy() {
        let config = LinkConfig {
            retransmit_timeout_ms: 40,
            max_retransmits: 2,
            ..LinkConfig::default()
        };
        let policy = config.retransmit_policy();
        assert_eq!(policy.timeout_ms, 40);
        assert_eq!(policy.max_retransmits, 2);
    }
}
