//! Exclusive owner of one live transport stream.

use std::future::Future;
use std::io::ErrorKind;
use std::time::Duration;

use fl_domain::config::SessionEndpoint;
use fl_domain::{Error, Result};
use fl_protocol::{FrameCodec, Message};
use futures_util::{SinkExt, StreamExt};
use tokio::io::AsyncWriteExt;
use tokio_util::codec::Framed;

use crate::transport::{BoxedStream, Transport};

/// One framed stream to the server.
///
/// `Connection` is neither `Clone` nor `Copy`; handing it to an
/// [`RpcClient`](crate::RpcClient) moves it.  After [`close`](Self::close)
/// the stream is gone and every send/receive fails with `NotConnected`.
pub struct Connection {
    framed: Option<Framed<BoxedStream, FrameCodec>>,
    peer: String,
    io_timeout: Option<Duration>,
}

impl Connection {
    /// Open the transport to `endpoint`.  Fails with [`Error::Connect`].
    pub async fn open(transport: &dyn Transport, endpoint: &SessionEndpoint) -> Result<Self> {
        let stream = transport.connect(endpoint).await?;
        Ok(Self::from_stream(stream, endpoint.authority()))
    }

    /// Wrap an already-established stream.
    pub fn from_stream(stream: BoxedStream, peer: impl Into<String>) -> Self {
        Self {
            framed: Some(Framed::new(stream, FrameCodec::new())),
            peer: peer.into(),
            io_timeout: None,
        }
    }

    /// Bound every frame send/receive.  `None` waits as long as the
    /// transport does.
    pub fn with_io_timeout(mut self, limit: Option<Duration>) -> Self {
        self.io_timeout = limit;
        self
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }

    pub fn is_open(&self) -> bool {
        self.framed.is_some()
    }

    /// Write one whole frame and flush it.
    pub async fn send(&mut self, msg: Message) -> Result<()> {
        let limit = self.io_timeout;
        let framed = self.framed.as_mut().ok_or_else(not_connected)?;
        bounded(limit, "send", framed.send(msg)).await?
    }

    /// Wait for one whole frame.
    ///
    /// `Ok(None)` means the peer closed the stream cleanly between frames.
    pub async fn receive(&mut self) -> Result<Option<Message>> {
        let limit = self.io_timeout;
        let framed = self.framed.as_mut().ok_or_else(not_connected)?;
        bounded(limit, "receive", framed.next()).await?.transpose()
    }

    /// Release the stream.  Calling it again is a no-op.
    pub async fn close(&mut self) {
        let Some(mut framed) = self.framed.take() else {
            return;
        };
        let limit = self.io_timeout;
        let shutdown = bounded(limit, "shutdown", framed.get_mut().shutdown())
            .await
            .and_then(|r| r.map_err(Error::from));
        if let Err(e) = shutdown {
            tracing::debug!(peer = %self.peer, error = %e, "shutdown did not complete");
        }
        tracing::debug!(peer = %self.peer, "connection closed");
    }
}

fn not_connected() -> Error {
    Error::io(ErrorKind::NotConnected, "connection is closed")
}

async fn bounded<F: Future>(limit: Option<Duration>, op: &str, fut: F) -> Result<F::Output> {
    match limit {
        None => Ok(fut.await),
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| Error::io(ErrorKind::TimedOut, format!("{op} timed out after {limit:?}"))),
    }
}
