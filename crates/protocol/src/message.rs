//! Message set exchanged with the server.
//!
//! Bodies are protobuf-encoded.  The [`Message`] enum is the only thing the
//! rest of the workspace matches on, so adding a kind is a compile error at
//! every consumer until it is handled.

use std::fmt;

use bytes::BytesMut;
use fl_domain::{Error, Result};
use prost::Message as ProstMessage;

/// Kind of peer announced in [`Hello`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum ClientType {
    /// Issues registration, ownership and measurement requests.
    Control = 0,
    /// Read-only dashboard style client.
    Monitor = 1,
}

/// Outcome code carried by every [`BasicResponse`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum ErrorCode {
    Ok = 0,
    InvalidRequest = 1,
    NotFound = 2,
    Internal = 3,
}

/// Client → server: first frame on every connection.  Never answered.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Hello {
    #[prost(enumeration = "ClientType", tag = "1")]
    pub client_type: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RegisterDevice {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub location: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RegisterSensor {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub location: String,
    /// Lowest value the sensor can report.
    #[prost(double, tag = "3")]
    pub floor: f64,
    /// Highest value the sensor can report.
    #[prost(double, tag = "4")]
    pub ceiling: f64,
}

/// Attach a peripheral to a parent device, or detach it when `orphan` is set.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SetOwnership {
    #[prost(uint64, tag = "1")]
    pub peripheral_id: u64,
    #[prost(uint64, tag = "2")]
    pub parent_id: u64,
    #[prost(bool, tag = "3")]
    pub orphan: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SendMeasurement {
    #[prost(uint64, tag = "1")]
    pub sensor_id: u64,
    #[prost(double, tag = "2")]
    pub value: f64,
}

/// Server → client acknowledgment envelope used for every request type.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BasicResponse {
    /// Id assigned by the server (device, sensor or measurement record).
    #[prost(uint64, optional, tag = "1")]
    pub id: Option<u64>,
    #[prost(enumeration = "ErrorCode", tag = "2")]
    pub code: i32,
    #[prost(string, optional, tag = "3")]
    pub message: Option<String>,
}

impl BasicResponse {
    /// Successful response carrying an assigned id.
    pub fn with_id(id: u64) -> Self {
        Self {
            id: Some(id),
            code: ErrorCode::Ok as i32,
            message: None,
        }
    }

    /// Whether the code is [`ErrorCode::Ok`].  Unknown codes count as errors.
    pub fn is_ok(&self) -> bool {
        ErrorCode::try_from(self.code) == Ok(ErrorCode::Ok)
    }
}

// ── Frame tags ──────────────────────────────────────────────────────

/// One-byte frame tag identifying the body type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageType {
    Hello = 1,
    RegisterDevice = 2,
    RegisterSensor = 3,
    SetOwnership = 4,
    SendMeasurement = 5,
    BasicResponse = 6,
}

impl MessageType {
    pub fn tag(self) -> u8 {
        self as u8
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        Some(match tag {
            1 => MessageType::Hello,
            2 => MessageType::RegisterDevice,
            3 => MessageType::RegisterSensor,
            4 => MessageType::SetOwnership,
            5 => MessageType::SendMeasurement,
            6 => MessageType::BasicResponse,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            MessageType::Hello => "HELLO",
            MessageType::RegisterDevice => "REGISTER_DEVICE",
            MessageType::RegisterSensor => "REGISTER_SENSOR",
            MessageType::SetOwnership => "SET_OWNERSHIP",
            MessageType::SendMeasurement => "SEND_MEASUREMENT",
            MessageType::BasicResponse => "BASIC_RESPONSE",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ── Envelope ────────────────────────────────────────────────────────

/// A decoded message of any kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Hello(Hello),
    RegisterDevice(RegisterDevice),
    RegisterSensor(RegisterSensor),
    SetOwnership(SetOwnership),
    SendMeasurement(SendMeasurement),
    BasicResponse(BasicResponse),
}

impl Message {
    pub fn message_type(&self) -> MessageType {
        match self {
            Message::Hello(_) => MessageType::Hello,
            Message::RegisterDevice(_) => MessageType::RegisterDevice,
            Message::RegisterSensor(_) => MessageType::RegisterSensor,
            Message::SetOwnership(_) => MessageType::SetOwnership,
            Message::SendMeasurement(_) => MessageType::SendMeasurement,
            Message::BasicResponse(_) => MessageType::BasicResponse,
        }
    }

    /// Size of the protobuf body in bytes.
    pub fn body_len(&self) -> usize {
        match self {
            Message::Hello(m) => m.encoded_len(),
            Message::RegisterDevice(m) => m.encoded_len(),
            Message::RegisterSensor(m) => m.encoded_len(),
            Message::SetOwnership(m) => m.encoded_len(),
            Message::SendMeasurement(m) => m.encoded_len(),
            Message::BasicResponse(m) => m.encoded_len(),
        }
    }

    /// Append the protobuf body to `dst`.
    pub fn encode_body(&self, dst: &mut BytesMut) -> Result<()> {
        let res = match self {
            Message::Hello(m) => m.encode(dst),
            Message::RegisterDevice(m) => m.encode(dst),
            Message::RegisterSensor(m) => m.encode(dst),
            Message::SetOwnership(m) => m.encode(dst),
            Message::SendMeasurement(m) => m.encode(dst),
            Message::BasicResponse(m) => m.encode(dst),
        };
        res.map_err(|e| Error::Protocol(format!("encoding {}: {e}", self.message_type())))
    }

    /// Parse `body` as the variant named by `kind`.
    pub fn decode(kind: MessageType, body: &[u8]) -> Result<Self> {
        let decoded = match kind {
            MessageType::Hello => Hello::decode(body).map(Message::Hello),
            MessageType::RegisterDevice => RegisterDevice::decode(body).map(Message::RegisterDevice),
            MessageType::RegisterSensor => RegisterSensor::decode(body).map(Message::RegisterSensor),
            MessageType::SetOwnership => SetOwnership::decode(body).map(Message::SetOwnership),
            MessageType::SendMeasurement => {
                SendMeasurement::decode(body).map(Message::SendMeasurement)
            }
            MessageType::BasicResponse => BasicResponse::decode(body).map(Message::BasicResponse),
        };
        decoded.map_err(|e| Error::Protocol(format!("decoding {kind} body: {e}")))
    }
}

macro_rules! impl_from_body {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for Message {
                fn from(m: $variant) -> Self {
                    Message::$variant(m)
                }
            }
        )*
    };
}

impl_from_body!(
    Hello,
    RegisterDevice,
    RegisterSensor,
    SetOwnership,
    SendMeasurement,
    BasicResponse,
);
