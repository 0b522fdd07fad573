//! Agent tuning knobs with defaults matching the device's observed behavior.

use crate::adaptor::StickCalibration;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Buffer lengths for the two pipe directions.
///
/// The read side is double-width so a transfer can carry two coalesced
/// 64-byte reports; writes are always a single report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipeParams {
    pub read_buffer_len: usize,
    pub write_buffer_len: usize,
}

impl Default for PipeParams {
    fn default() -> Self {
        Self { read_buffer_len: 128, write_buffer_len: 64 }
    }
}

/// Timing and calibration configuration of a [`ProAgent`].
///
/// [`ProAgent`]: crate::agent::ProAgent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Worker tick cadence. The controller streams at roughly 60 reports
    /// per second, so 15 ms keeps the pipeline full without busy work.
    pub pull_interval_ms: u64,
    /// Cache entries older than this count as disconnected.
    pub packet_timeout_ms: u64,
    /// Deadline for a command or subcommand reply.
    pub reply_timeout_ms: u64,
    pub pipes: PipeParams,
    pub calibration: StickCalibration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            pull_interval_ms: 15,
            packet_timeout_ms: 100,
            reply_timeout_ms: 400,
            pipes: PipeParams::default(),
            calibration: StickCalibration::default(),
        }
    }
}

impl AgentConfig {
    pub fn pull_interval(&self) -> Duration {
        Duration::from_millis(self.pull_interval_ms)
    }

    pub fn packet_timeout(&self) -> Duration {
        Duration::from_millis(self.packet_timeout_ms)
    }

    pub fn reply_timeout(&self) -> Duration {
        Duration::from_millis(self.reply_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_device_timing() {
        let config = AgentConfig::default();
        assert_eq!(config.pull_interval(), Duration::from_millis(15));
        assert_eq!(config.packet_timeout(), Duration::from_millis(100));
        assert_eq!(config.reply_timeout(), Duration::from_millis(400));
        assert_eq!(config.pipes.read_buffer_len, 128);
        assert_eq!(config.pipes.write_buffer_len, 64);
    }

    #[test]
    fn test_config_round_trips_through_serde() {
        let config = AgentConfig { pull_interval_ms: 8, ..Default::default() };
        let json = serde_json::to_string(&config).expect("serialize");
        let back: AgentConfig = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, config);
    }
}
