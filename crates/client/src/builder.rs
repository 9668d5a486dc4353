//! Builder pattern for constructing a [`RetryingSession`].

use std::sync::Arc;
use std::time::Duration;

use fl_domain::config::{ChannelId, MonitorConfig, SensorChannelMap, SessionEndpoint};
use fl_domain::{Error, Result};

use crate::channel::{ChannelReader, IioChannelReader};
use crate::clock::{Clock, TokioClock};
use crate::retry::{RetryPolicy, RetryState};
use crate::rpc::RpcOptions;
use crate::session::RetryingSession;
use crate::transport::{TlsTransport, Transport};

/// Fluent builder for [`RetryingSession`].
///
/// # Example
///
/// ```rust,no_run
/// # use fl_client::{SessionBuilder, ChannelId, SessionEndpoint, IioChannelReader};
/// # fn endpoint() -> SessionEndpoint { unimplemented!() }
/// let session = SessionBuilder::new()
///     .endpoint(endpoint())
///     .channel(ChannelId(0), 7)
///     .channel(ChannelId(1), 8)
///     .retry_period(std::time::Duration::from_secs(5))
///     .measurement_period(std::time::Duration::from_secs(600))
///     .reader(IioChannelReader::new("/sys/bus/iio/devices/iio:device0"))
///     .build()
///     .unwrap();
/// ```
pub struct SessionBuilder {
    endpoint: Option<SessionEndpoint>,
    channels: SensorChannelMap,
    policy: RetryPolicy,
    rpc: RpcOptions,
    transport: Option<Arc<dyn Transport>>,
    reader: Option<Arc<dyn ChannelReader>>,
    clock: Arc<dyn Clock>,
}

impl SessionBuilder {
    pub fn new() -> Self {
        Self {
            endpoint: None,
            channels: SensorChannelMap::new(),
            policy: RetryPolicy::default(),
            rpc: RpcOptions::default(),
            transport: None,
            reader: None,
            clock: Arc::new(TokioClock),
        }
    }

    /// Seed every field from a loaded daemon config, reading channels
    /// through the configured IIO device.
    pub fn from_config(config: &MonitorConfig) -> Self {
        Self::new()
            .endpoint(config.endpoint.clone())
            .channels(config.channels.clone())
            .retry_period(config.retry_period())
            .measurement_period(config.measurement_period())
            .io_timeout(config.rpc_timeout())
            .reader(IioChannelReader::new(config.iio_device.clone()))
    }

    // ── Required ─────────────────────────────────────────────────────

    pub fn endpoint(mut self, endpoint: SessionEndpoint) -> Self {
        self.endpoint = Some(endpoint);
        self
    }

    /// Replace the whole channel map.
    pub fn channels(mut self, channels: SensorChannelMap) -> Self {
        self.channels = channels;
        self
    }

    /// Map one hardware channel to a sensor id.
    pub fn channel(mut self, channel: ChannelId, sensor_id: u64) -> Self {
        self.channels.insert(channel, sensor_id);
        self
    }

    pub fn reader(mut self, reader: impl ChannelReader + 'static) -> Self {
        self.reader = Some(Arc::new(reader));
        self
    }

    // ── Behavior ─────────────────────────────────────────────────────

    pub fn retry_period(mut self, d: Duration) -> Self {
        self.policy.retry_period = d;
        self
    }

    pub fn measurement_period(mut self, d: Duration) -> Self {
        self.policy.measurement_period = d;
        self
    }

    pub fn io_timeout(mut self, limit: Option<Duration>) -> Self {
        self.rpc.io_timeout = limit;
        self
    }

    /// Override the transport (default: [`TlsTransport`] for the endpoint).
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Override the sleep source (default: [`TokioClock`]).
    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Build the [`RetryingSession`].
    pub fn build(self) -> Result<RetryingSession> {
        let endpoint = self
            .endpoint
            .ok_or_else(|| Error::Config("endpoint is required".into()))?;
        if self.channels.is_empty() {
            return Err(Error::Config("at least one sensor channel is required".into()));
        }
        if self.policy.retry_period.is_zero() {
            return Err(Error::Config("retry period must be positive".into()));
        }
        if self.policy.measurement_period.is_zero() {
            return Err(Error::Config("measurement period must be positive".into()));
        }
        let reader = self
            .reader
            .ok_or_else(|| Error::Config("channel reader is required".into()))?;
        let transport = match self.transport {
            Some(t) => t,
            None => Arc::new(TlsTransport::from_endpoint(&endpoint)?),
        };

        Ok(RetryingSession {
            endpoint,
            channels: self.channels,
            policy: self.policy,
            rpc: self.rpc,
            transport,
            reader,
            clock: self.clock,
            state: RetryState::default(),
        })
    }
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}
