//! Connection channel mode configuration

use flicd_protocol::LatencyMode;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Auto disconnect time meaning "never disconnect"
pub const AUTO_DISCONNECT_NEVER: i16 = 511;

/// Mode parameters of a connection channel
///
/// Fixed when the channel is created; later changes are requested with a
/// change mode parameters command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ChannelConfig {
    /// Latency / power trade-off
    pub latency_mode: LatencyMode,
    /// Seconds without button activity before the daemon disconnects
    /// (0..=511, 511 = never)
    pub auto_disconnect_time: i16,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            latency_mode: LatencyMode::NormalLatency,
            auto_disconnect_time: AUTO_DISCONNECT_NEVER,
        }
    }
}

impl ChannelConfig {
    pub fn new(latency_mode: LatencyMode, auto_disconnect_time: i16) -> Self {
        Self {
            latency_mode,
            auto_disconnect_time,
        }
    }

    /// True if the daemon never drops this channel for inactivity
    pub fn never_auto_disconnects(&self) -> bool {
        self.auto_disconnect_time == AUTO_DISCONNECT_NEVER
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_never_disconnects() {
        let config = ChannelConfig::default();
        assert_eq!(config.latency_mode, LatencyMode::NormalLatency);
        assert!(config.never_auto_disconnects());
    }

    #[test]
    fn test_explicit_timeout() {
        let config = ChannelConfig::new(LatencyMode::LowLatency, 30);
        assert!(!config.never_auto_disconnects());
    }
}
