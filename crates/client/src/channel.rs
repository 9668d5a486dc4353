//! Hardware channel readers.

use std::path::PathBuf;

use async_trait::async_trait;
use fl_domain::config::ChannelId;
use fl_domain::{Error, Result};

/// Reads the raw value of one analog input.
#[async_trait]
pub trait ChannelReader: Send + Sync {
    async fn read(&self, channel: ChannelId) -> Result<i64>;
}

/// Reads ADC channels through the Linux IIO sysfs interface
/// (`<device>/in_voltage<N>_raw`), as exposed by the ads1015 driver for
/// ADS1015/ADS1115 converters.
#[derive(Debug, Clone)]
pub struct IioChannelReader {
    device_dir: PathBuf,
}

impl IioChannelReader {
    pub fn new(device_dir: impl Into<PathBuf>) -> Self {
        Self {
            device_dir: device_dir.into(),
        }
    }

    pub fn channel_path(&self, channel: ChannelId) -> PathBuf {
        self.device_dir.join(format!("in_voltage{}_raw", channel.0))
    }
}

#[async_trait]
impl ChannelReader for IioChannelReader {
    async fn read(&self, channel: ChannelId) -> Result<i64> {
        let path = self.channel_path(channel);
        let raw = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| Error::Sensor {
                channel: channel.0,
                message: format!("reading {}: {e}", path.display()),
            })?;
        let raw = raw.trim();
        raw.parse::<i64>().map_err(|e| Error::Sensor {
            channel: channel.0,
            message: format!("parsing {raw:?}: {e}"),
        })
    }
}
