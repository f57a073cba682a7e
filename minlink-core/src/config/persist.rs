//! Configuration persistence
//!
//! Stores a [`LinkConfig`] as postcard binary data, e.g. in a flash
//! key-value slot, and validates it on load.

use super::link::{ConfigError, LinkConfig, CONFIG_VERSION};

/// Upper bound on the serialized size of a [`LinkConfig`]
pub const MAX_SERIALIZED_SIZE: usize = 32;

impl LinkConfig {
    /// Serialize into `buffer`, returning the used prefix
    pub fn to_postcard<'a>(&self, buffer: &'a mut [u8]) -> Result<&'a mut [u8], ConfigError> {
        postcard::to_slice(self, buffer).map_err(|_| ConfigError::Serialize)
    }

    /// Deserialize and validate a stored configuration
    pub fn from_postcard(bytes: &[u8]) -> Result<Self, ConfigError> {
        let config: LinkConfig =
            postcard::from_bytes(bytes).map_err(|_| ConfigError::Deserialize)?;

        if config.version != CONFIG_VERSION {
            warn!(
                "Config version mismatch: found {}, expected {}",
                config.version, CONFIG_VERSION
            );
            return Err(ConfigError::VersionMismatch);
        }

        config.validate()?;
        debug!(
            "Loaded link config: window={}, retransmit={}ms",
            config.window_size, config.retransmit_timeout_ms
        );
        Ok(config)
    }
}
