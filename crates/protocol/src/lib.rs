//! Wire protocol: message types and the length-delimited frame codec.
//!
//! Every request except [`Hello`] is answered by exactly one
//! [`BasicResponse`] before the next request may be sent.

pub mod frame;
pub mod message;

pub use frame::{FrameCodec, FRAME_HEADER_BYTES, MAX_FRAME_BODY_BYTES};
pub use message::{
    BasicResponse, ClientType, ErrorCode, Hello, Message, MessageType, RegisterDevice,
    RegisterSensor, SendMeasurement, SetOwnership,
};
