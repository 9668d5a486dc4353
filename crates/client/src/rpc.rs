//! Hello handshake and the four business RPCs.

use std::io::ErrorKind;
use std::time::Duration;

use fl_domain::config::SessionEndpoint;
use fl_domain::{Error, Result};
use fl_protocol::{
    BasicResponse, ClientType, Hello, Message, RegisterDevice, RegisterSensor, SendMeasurement,
    SetOwnership,
};

use crate::connection::Connection;
use crate::transport::Transport;

/// Per-client knobs.
#[derive(Debug, Clone, Default)]
pub struct RpcOptions {
    /// Bounded wait for each frame send/receive (default: unbounded).
    pub io_timeout: Option<Duration>,
}

/// A connected control client.
///
/// Every operation takes `&mut self`, so at most one request is ever
/// outstanding.  Any failed exchange closes the connection; later calls
/// fail with `NotConnected` and the caller should discard the client.
pub struct RpcClient {
    conn: Connection,
}

impl RpcClient {
    /// Open a connection and greet the server.
    pub async fn create(
        transport: &dyn Transport,
        endpoint: &SessionEndpoint,
        options: &RpcOptions,
    ) -> Result<Self> {
        let conn = Connection::open(transport, endpoint)
            .await?
            .with_io_timeout(options.io_timeout);
        Self::handshake(conn).await
    }

    /// Send `Hello` on an open connection.  No response is expected.
    pub async fn handshake(mut conn: Connection) -> Result<Self> {
        let hello = Hello {
            client_type: ClientType::Control as i32,
        };
        if let Err(e) = conn.send(hello.into()).await {
            conn.close().await;
            return Err(Error::Connect(format!(
                "sending hello to {}: {e}",
                conn.peer()
            )));
        }

        tracing::debug!(peer = %conn.peer(), "hello sent, client ready");
        Ok(Self { conn })
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_open()
    }

    /// Release the connection.  Idempotent.
    pub async fn close(&mut self) {
        self.conn.close().await;
    }

    /// Register a device and return its server-assigned id.
    pub async fn register_device(
        &mut self,
        name: impl Into<String>,
        location: impl Into<String>,
    ) -> Result<u64> {
        let req = RegisterDevice {
            name: name.into(),
            location: location.into(),
        };
        tracing::info!(name = %req.name, location = %req.location, "registering device");
        self.call_for_id(req.into()).await
    }

    /// Register a sensor with its reporting range and return its id.
    pub async fn register_sensor(
        &mut self,
        name: impl Into<String>,
        location: impl Into<String>,
        floor: f64,
        ceiling: f64,
    ) -> Result<u64> {
        let req = RegisterSensor {
            name: name.into(),
            location: location.into(),
            floor,
            ceiling,
        };
        tracing::info!(name = %req.name, floor, ceiling, "registering sensor");
        self.call_for_id(req.into()).await
    }

    /// Attach `peripheral_id` to `parent_id`.
    ///
    /// The response's error code is returned as-is; a non-ok code is not a
    /// protocol failure.
    pub async fn set_ownership(&mut self, peripheral_id: u64, parent_id: u64) -> Result<BasicResponse> {
        let req = SetOwnership {
            peripheral_id,
            parent_id,
            orphan: false,
        };
        tracing::info!(peripheral_id, parent_id, "setting peripheral owner");
        self.call(req.into()).await
    }

    /// Upload one reading and return the id of the stored measurement.
    pub async fn send_measurement(&mut self, sensor_id: u64, value: f64) -> Result<u64> {
        tracing::debug!(sensor_id, value, "sending measurement");
        let id = self
            .call_for_id(SendMeasurement { sensor_id, value }.into())
            .await?;
        tracing::info!(sensor_id, value, measurement_id = id, "measurement recorded");
        Ok(id)
    }

    // ── Exchange plumbing ────────────────────────────────────────────

    async fn call_for_id(&mut self, request: Message) -> Result<u64> {
        let kind = request.message_type();
        let resp = self.call(request).await?;
        if !resp.is_ok() {
            tracing::warn!(
                request = %kind,
                code = resp.code,
                message = resp.message.as_deref().unwrap_or(""),
                "server reported an error"
            );
        }
        match resp.id {
            Some(id) => Ok(id),
            None => {
                self.conn.close().await;
                Err(Error::Protocol(format!(
                    "missing id in BASIC_RESPONSE to {kind}"
                )))
            }
        }
    }

    async fn call(&mut self, request: Message) -> Result<BasicResponse> {
        let kind = request.message_type();
        let result = self.round_trip(request).await;
        if let Err(e) = &result {
            tracing::warn!(request = %kind, peer = %self.conn.peer(), error = %e, "rpc failed");
            self.conn.close().await;
        }
        result
    }

    async fn round_trip(&mut self, request: Message) -> Result<BasicResponse> {
        self.conn.send(request).await?;
        match self.conn.receive().await? {
            Some(Message::BasicResponse(resp)) => {
                tracing::debug!(id = ?resp.id, code = resp.code, "received basic response");
                Ok(resp)
            }
            Some(other) => Err(Error::Protocol(format!(
                "unexpected message type {}",
                other.message_type()
            ))),
            None => Err(Error::io(
                ErrorKind::UnexpectedEof,
                "server closed the connection before responding",
            )),
        }
    }
}
