use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::SessionEndpoint;
use crate::error::{Error, Result};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Sensor channels
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Highest analog input on the ADC (four single-ended inputs).
pub const MAX_CHANNEL: u8 = 3;

/// A hardware analog input line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(pub u8);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hardware channel → server-assigned sensor id.  Ordered so every
/// sampling pass visits channels in the same sequence.
pub type SensorChannelMap = BTreeMap<ChannelId, u64>;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Monitor daemon
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Configuration file for the sampling daemon.
///
/// ```json
/// {
///   "endpoint": {
///     "address": "10.0.0.2", "port": 5000,
///     "certificate": "client.pem", "private_key": "client.key", "ca_bundle": "ca.pem"
///   },
///   "device_id": 42,
///   "channels": { "0": 7, "1": 8, "2": 9 }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    pub endpoint: SessionEndpoint,
    /// Delay after a failed connection or a failed sampling pass.
    #[serde(default = "d_retry_period_secs")]
    pub retry_period_secs: u64,
    /// Delay between two successful sampling passes.
    #[serde(default = "d_measurement_period_secs")]
    pub measurement_period_secs: u64,
    /// Bounded wait for each frame read/write.  `None` blocks until the
    /// transport itself gives up.
    #[serde(default)]
    pub rpc_timeout_secs: Option<u64>,
    /// Server id of the device running the daemon.  Informational only.
    #[serde(default)]
    pub device_id: Option<u64>,
    /// IIO device directory exposing `in_voltage<N>_raw` files.
    #[serde(default = "d_iio_device")]
    pub iio_device: PathBuf,
    pub channels: SensorChannelMap,
}

impl MonitorConfig {
    /// Read, parse and validate a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("reading {}: {e}", path.display())))?;
        let config: MonitorConfig = serde_json::from_str(&raw)
            .map_err(|e| Error::Config(format!("parsing {}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.endpoint.validate()?;
        if self.channels.is_empty() {
            return Err(Error::Config("at least one sensor channel is required".into()));
        }
        if let Some(ch) = self.channels.keys().find(|ch| ch.0 > MAX_CHANNEL) {
            return Err(Error::Config(format!(
                "channel {ch} out of range (0..={MAX_CHANNEL})"
            )));
        }
        if self.retry_period_secs == 0 {
            return Err(Error::Config("retry_period_secs must be positive".into()));
        }
        if self.measurement_period_secs == 0 {
            return Err(Error::Config("measurement_period_secs must be positive".into()));
        }
        if self.rpc_timeout_secs == Some(0) {
            return Err(Error::Config("rpc_timeout_secs must be positive when set".into()));
        }
        Ok(())
    }

    pub fn retry_period(&self) -> Duration {
        Duration::from_secs(self.retry_period_secs)
    }

    pub fn measurement_period(&self) -> Duration {
        Duration::from_secs(self.measurement_period_secs)
    }

    pub fn rpc_timeout(&self) -> Option<Duration> {
        self.rpc_timeout_secs.map(Duration::from_secs)
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_retry_period_secs() -> u64 {
    5
}

fn d_measurement_period_secs() -> u64 {
    600
}

fn d_iio_device() -> PathBuf {
    PathBuf::from("/sys/bus/iio/devices/iio:device0")
}
