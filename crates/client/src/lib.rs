//! `fl-client` — request/response engine and reconnecting telemetry session.
//!
//! # Layers
//!
//! ```text
//! RetryingSession ──► RpcClient ──► Connection ──► FrameCodec ──► Transport
//!   (reconnect,        (hello +      (one owned      (tag + len      (TCP +
//!    sampling)          4 RPCs)       stream)         + protobuf)     mutual TLS)
//! ```
//!
//! # Connection flow
//!
//! 1. Open the transport (TCP connect + TLS handshake)
//! 2. Send `Hello { client_type: Control }` (never answered)
//! 3. Each RPC: write one request frame, read exactly one `BasicResponse`
//! 4. Any failure closes the connection; only the session reconnects
//!
//! The session opens a fresh connection for every sampling pass and closes
//! it before sleeping, so at most one connection is ever alive.

pub mod builder;
pub mod channel;
pub mod clock;
pub mod connection;
pub mod retry;
pub mod rpc;
pub mod session;
pub mod transport;

// ── Re-exports for ergonomic imports ─────────────────────────────────

pub use builder::SessionBuilder;
pub use channel::{ChannelReader, IioChannelReader};
pub use clock::{Clock, TokioClock};
pub use connection::Connection;
pub use retry::{RetryPolicy, RetryState};
pub use rpc::{RpcClient, RpcOptions};
pub use session::RetryingSession;
pub use transport::{AsyncStream, BoxedStream, TlsTransport, Transport};

pub use fl_domain::config::{ChannelId, SensorChannelMap, SessionEndpoint};
pub use fl_domain::{Error, Result};
pub use fl_protocol::{BasicResponse, ErrorCode};
