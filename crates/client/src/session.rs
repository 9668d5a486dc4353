//! The telemetry daemon loop: reconnect, sample, tear down, sleep.

use std::sync::Arc;
use std::time::Duration;

use fl_domain::config::{SensorChannelMap, SessionEndpoint};
use fl_domain::trace::TraceEvent;
use fl_domain::Result;
use tokio_util::sync::CancellationToken;

use crate::channel::ChannelReader;
use crate::clock::Clock;
use crate::retry::{RetryPolicy, RetryState};
use crate::rpc::{RpcClient, RpcOptions};
use crate::transport::Transport;

/// Reconnecting sampler.
///
/// Create via [`SessionBuilder`](crate::builder::SessionBuilder).
pub struct RetryingSession {
    pub(crate) endpoint: SessionEndpoint,
    pub(crate) channels: SensorChannelMap,
    pub(crate) policy: RetryPolicy,
    pub(crate) rpc: RpcOptions,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) reader: Arc<dyn ChannelReader>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) state: RetryState,
}

impl RetryingSession {
    pub fn state(&self) -> &RetryState {
        &self.state
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run until `shutdown` is cancelled.
    ///
    /// Each cycle opens a connection, uploads one reading per channel and
    /// closes the connection again before sleeping: `measurement_period`
    /// after a complete pass, `retry_period` after any failure.  Errors of
    /// every kind are handled the same way; nothing here is fatal.
    pub async fn run(&mut self, shutdown: CancellationToken) {
        tracing::info!(
            authority = %self.endpoint.authority(),
            channels = self.channels.len(),
            retry_secs = self.policy.retry_period.as_secs(),
            measurement_secs = self.policy.measurement_period.as_secs(),
            "starting telemetry session"
        );

        loop {
            if shutdown.is_cancelled() {
                break;
            }

            let delay = tokio::select! {
                d = self.cycle() => d,
                _ = shutdown.cancelled() => break,
            };

            tracing::info!(delay_secs = delay.as_secs(), "sleeping");
            tokio::select! {
                _ = self.clock.sleep(delay) => {}
                _ = shutdown.cancelled() => break,
            }
        }

        tracing::info!(
            successful_passes = self.state.successful_passes,
            "telemetry session stopped"
        );
    }

    /// One connect → sample → close cycle.  Returns the wait before the
    /// next one.  The connection is always closed when this returns.
    async fn cycle(&mut self) -> Duration {
        let authority = self.endpoint.authority();

        let mut client =
            match RpcClient::create(self.transport.as_ref(), &self.endpoint, &self.rpc).await {
                Ok(client) => client,
                Err(e) => {
                    let failures = self.state.record_connect_failure();
                    tracing::warn!(
                        authority = %authority,
                        consecutive_failures = failures,
                        error = %e,
                        "failed to connect to server"
                    );
                    TraceEvent::ConnectFailed {
                        authority,
                        consecutive_failures: failures,
                        error: e.to_string(),
                    }
                    .emit();
                    return self.policy.delay_after(false);
                }
            };

        self.state.record_connected();
        tracing::info!(authority = %authority, "connected to server");
        TraceEvent::Connected { authority }.emit();

        let outcome = self.sample_pass(&mut client).await;
        client.close().await;

        match outcome {
            Ok(()) => {
                let passes = self.state.record_pass();
                TraceEvent::PassCompleted {
                    channels: self.channels.len(),
                    successful_passes: passes,
                }
                .emit();
                self.policy.delay_after(true)
            }
            Err(e) => {
                tracing::error!(error = %e, "sampling pass failed, reconnecting");
                TraceEvent::PassFailed {
                    error: e.to_string(),
                }
                .emit();
                self.policy.delay_after(false)
            }
        }
    }

    /// Read every channel and upload it.  Stops at the first failure.
    async fn sample_pass(&self, client: &mut RpcClient) -> Result<()> {
        for (&channel, &sensor_id) in &self.channels {
            let reading = self.reader.read(channel).await?;
            let value = reading as f64;
            let measurement_id = client.send_measurement(sensor_id, value).await?;
            TraceEvent::MeasurementRecorded {
                channel: channel.0,
                sensor_id,
                value,
                measurement_id,
            }
            .emit();
        }
        Ok(())
    }
}
