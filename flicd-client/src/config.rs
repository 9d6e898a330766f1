//! Client configuration
//!
//! Loaded from TOML. Every field is optional:
//!
//! ```toml
//! host = "127.0.0.1"
//! port = 5551
//! tcp_nodelay = true
//! connect_timeout_ms = 2000
//!
//! [channel]
//! latency_mode = "LowLatency"
//! auto_disconnect_time = 511
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use flicd_core::ChannelConfig;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Port the daemon listens on unless told otherwise
pub const DEFAULT_PORT: u16 = 5551;

/// Connection and default channel settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    /// Daemon host name or address
    pub host: String,
    /// Daemon TCP port
    pub port: u16,
    /// Disable Nagle's algorithm on the socket
    pub tcp_nodelay: bool,
    /// Give up connecting after this many milliseconds
    pub connect_timeout_ms: Option<u64>,
    /// Mode used by channels created without explicit parameters
    pub channel: ChannelConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: DEFAULT_PORT,
            tcp_nodelay: true,
            connect_timeout_ms: None,
            channel: ChannelConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Config for `host:port` with every other field defaulted
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_ms.map(Duration::from_millis)
    }
}
