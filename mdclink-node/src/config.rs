//! Configuration loading
//!
//! Parses the node's TOML document into [`NodeConfig`]. Missing keys take
//! their defaults, so a file holding only `host` is valid.

use heapless::String;
use serde::Deserialize;

use mdclink_core::config::{DisplayConfig, DEFAULT_PORT};

/// Maximum host name length
pub const MAX_HOST_LEN: usize = 64;

/// Configuration error
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum ConfigError {
    /// Not valid TOML, or a value has the wrong type
    Parse,
    /// No host to connect to
    InvalidHost,
}

/// Everything the link task needs
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// IPv4 literal or DNS name of the display
    pub host: String<MAX_HOST_LEN>,
    pub port: u16,
    /// Wait between connection attempts
    pub reconnect_delay_s: u32,
    /// Treat the connection as dead after this long without data
    pub idle_timeout_s: u32,
    pub display: DisplayConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: DEFAULT_PORT,
            reconnect_delay_s: 10,
            idle_timeout_s: 120,
            display: DisplayConfig::default(),
        }
    }
}

/// Parse and check a TOML configuration
pub fn parse_config(text: &str) -> Result<NodeConfig, ConfigError> {
    let mut config: NodeConfig = toml::from_str(text).map_err(|_| ConfigError::Parse)?;

    if config.host.trim().is_empty() {
        return Err(ConfigError::InvalidHost);
    }
    if config.port == 0 {
        config.port = DEFAULT_PORT;
    }

    Ok(config)
}
