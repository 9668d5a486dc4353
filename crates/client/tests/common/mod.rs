//! In-process fakes shared by the integration tests: a scripted server on
//! the far side of a `tokio::io::duplex` pipe, a transport that can be told
//! to fail, an ADC with fixed readings and a clock that never really sleeps.

#![allow(dead_code)]

use std::collections::{BTreeMap, VecDeque};
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use fl_client::{
    BoxedStream, ChannelId, ChannelReader, Clock, Connection, Error, Result, SessionEndpoint,
    Transport,
};
use fl_protocol::{BasicResponse, FrameCodec, Message};
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite, DuplexStream, ReadBuf};
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;

pub fn endpoint() -> SessionEndpoint {
    SessionEndpoint {
        address: "127.0.0.1".into(),
        port: 5000,
        certificate: "client.pem".into(),
        private_key: "client.key".into(),
        ca_bundle: "ca.pem".into(),
    }
}

// ── Scripted server ─────────────────────────────────────────────────

/// What the fake server does with the next request it reads.
#[derive(Debug, Clone)]
pub enum Reply {
    Send(Message),
    /// Close the stream without answering.
    Hangup,
    /// Read the request and never answer.
    Silence,
}

/// Requests seen by a fake server, in arrival order (Hello included).
pub type Inbox = Arc<Mutex<Vec<Message>>>;

/// Serve `replies` in order, then hang up.  Hello frames are recorded but
/// never answered.
pub async fn serve_script(stream: DuplexStream, replies: Vec<Reply>, inbox: Inbox) {
    let mut framed = Framed::new(stream, FrameCodec::new());
    let mut replies: VecDeque<Reply> = replies.into();
    while let Some(Ok(msg)) = framed.next().await {
        let is_hello = matches!(msg, Message::Hello(_));
        inbox.lock().unwrap().push(msg);
        if is_hello {
            continue;
        }
        match replies.pop_front() {
            Some(Reply::Send(resp)) => {
                if framed.send(resp).await.is_err() {
                    return;
                }
            }
            Some(Reply::Silence) => {
                std::future::pending::<()>().await;
            }
            Some(Reply::Hangup) | None => return,
        }
    }
}

/// Connection to a freshly spawned scripted server.
pub fn scripted_connection(replies: Vec<Reply>) -> (Connection, Inbox) {
    let (client, server) = tokio::io::duplex(4096);
    let inbox = Inbox::default();
    tokio::spawn(serve_script(server, replies, inbox.clone()));
    (Connection::from_stream(Box::new(client), "fake-server"), inbox)
}

/// How the server behind a [`ScriptedTransport`] answers requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerMode {
    /// Every request gets a fresh id.
    AssignIds,
    /// Every request gets an ok response without an id.
    OmitId,
    /// The first request after Hello is read and the stream closed.
    HangUp,
    /// The server end is gone before the client writes anything.
    Vanish,
}

async fn serve_mode(stream: DuplexStream, mode: ServerMode, next_id: Arc<AtomicU64>, inbox: Inbox) {
    let mut framed = Framed::new(stream, FrameCodec::new());
    while let Some(Ok(msg)) = framed.next().await {
        let is_hello = matches!(msg, Message::Hello(_));
        inbox.lock().unwrap().push(msg);
        if is_hello {
            continue;
        }
        let resp = match mode {
            ServerMode::AssignIds => BasicResponse::with_id(next_id.fetch_add(1, Ordering::SeqCst)),
            ServerMode::OmitId => BasicResponse::default(),
            ServerMode::HangUp | ServerMode::Vanish => return,
        };
        if framed.send(Message::from(resp)).await.is_err() {
            return;
        }
    }
}

// ── Transport ───────────────────────────────────────────────────────

/// Shared counters observed by the test after the session stops.
#[derive(Debug, Default)]
pub struct Gauge {
    pub attempts: AtomicUsize,
    pub open: AtomicUsize,
    pub max_open: AtomicUsize,
}

/// Refuses the first `fail_first` connects, then hands out streams to a
/// fake server answering according to `mode`.
pub struct ScriptedTransport {
    pub fail_first: usize,
    pub mode: ServerMode,
    pub gauge: Arc<Gauge>,
    pub inbox: Inbox,
    next_id: Arc<AtomicU64>,
}

impl ScriptedTransport {
    pub fn new(fail_first: usize) -> Self {
        Self {
            fail_first,
            mode: ServerMode::AssignIds,
            gauge: Arc::default(),
            inbox: Inbox::default(),
            next_id: Arc::new(AtomicU64::new(1000)),
        }
    }

    pub fn with_mode(mut self, mode: ServerMode) -> Self {
        self.mode = mode;
        self
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn connect(&self, endpoint: &SessionEndpoint) -> Result<BoxedStream> {
        let attempt = self.gauge.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt <= self.fail_first {
            return Err(Error::Connect(format!(
                "{} refused attempt {attempt}",
                endpoint.authority()
            )));
        }

        let (client, server) = tokio::io::duplex(4096);
        if self.mode == ServerMode::Vanish {
            drop(server);
        } else {
            tokio::spawn(serve_mode(
                server,
                self.mode,
                self.next_id.clone(),
                self.inbox.clone(),
            ));
        }

        let now_open = self.gauge.open.fetch_add(1, Ordering::SeqCst) + 1;
        self.gauge.max_open.fetch_max(now_open, Ordering::SeqCst);
        Ok(Box::new(Tracked {
            inner: client,
            gauge: self.gauge.clone(),
        }))
    }
}

/// Transport that always fails.
pub struct Unreachable;

#[async_trait]
impl Transport for Unreachable {
    async fn connect(&self, endpoint: &SessionEndpoint) -> Result<BoxedStream> {
        Err(Error::Connect(format!("{} unreachable", endpoint.authority())))
    }
}

/// Client half of a pipe that counts itself out of `gauge.open` on drop.
struct Tracked {
    inner: DuplexStream,
    gauge: Arc<Gauge>,
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.gauge.open.fetch_sub(1, Ordering::SeqCst);
    }
}

impl AsyncRead for Tracked {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl AsyncWrite for Tracked {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

// ── ADC ─────────────────────────────────────────────────────────────

/// Fixed readings per channel; one channel may be made to fail.
#[derive(Default)]
pub struct FakeAdc {
    pub readings: BTreeMap<ChannelId, i64>,
    pub failing: Option<ChannelId>,
}

impl FakeAdc {
    pub fn with(readings: &[(u8, i64)]) -> Self {
        Self {
            readings: readings.iter().map(|&(c, v)| (ChannelId(c), v)).collect(),
            failing: None,
        }
    }

    pub fn failing_on(mut self, channel: u8) -> Self {
        self.failing = Some(ChannelId(channel));
        self
    }
}

#[async_trait]
impl ChannelReader for FakeAdc {
    async fn read(&self, channel: ChannelId) -> Result<i64> {
        if self.failing == Some(channel) {
            return Err(Error::Sensor {
                channel: channel.0,
                message: "i2c bus timeout".into(),
            });
        }
        Ok(self.readings.get(&channel).copied().unwrap_or(0))
    }
}

// ── Clock ───────────────────────────────────────────────────────────

/// Returns immediately, recording each requested delay together with the
/// number of connections open at that moment.  Cancels `shutdown` once
/// `stop_after` sleeps have been requested.
pub struct RecordingClock {
    pub sleeps: Arc<Mutex<Vec<(Duration, usize)>>>,
    gauge: Arc<Gauge>,
    stop_after: usize,
    shutdown: CancellationToken,
}

impl RecordingClock {
    pub fn new(gauge: Arc<Gauge>, stop_after: usize, shutdown: CancellationToken) -> Self {
        Self {
            sleeps: Arc::default(),
            gauge,
            stop_after,
            shutdown,
        }
    }
}

#[async_trait]
impl Clock for RecordingClock {
    async fn sleep(&self, duration: Duration) {
        let open = self.gauge.open.load(Ordering::SeqCst);
        let mut sleeps = self.sleeps.lock().unwrap();
        sleeps.push((duration, open));
        if sleeps.len() >= self.stop_after {
            self.shutdown.cancel();
        }
    }
}
