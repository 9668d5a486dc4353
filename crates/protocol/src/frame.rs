//! Length-delimited frame codec.
//!
//! ```text
//! ┌────────┬──────────────────┬──────────────────────────┐
//! │ Tag    │ Length (4 bytes) │ Body (Length bytes)      │
//! │ 1 byte │ Big-endian u32   │ Protobuf of the tag type │
//! └────────┴──────────────────┴──────────────────────────┘
//! ```
//!
//! The decoder only yields a message once the whole body is buffered, so a
//! partial frame is never visible to the caller.  A stream that ends
//! between frames is a clean close; one that ends inside a frame is an
//! `UnexpectedEof` I/O error.

use bytes::{Buf, BufMut, BytesMut};
use fl_domain::{Error, Result};
use tokio_util::codec::{Decoder, Encoder};

use crate::message::{Message, MessageType};

/// Tag byte + big-endian body length.
pub const FRAME_HEADER_BYTES: usize = 5;

/// Largest body either side may send.
pub const MAX_FRAME_BODY_BYTES: usize = 64 * 1024;

/// [`Encoder`]/[`Decoder`] pair for use with `tokio_util::codec::Framed`.
#[derive(Debug, Clone)]
pub struct FrameCodec {
    max_body: usize,
}

impl FrameCodec {
    pub fn new() -> Self {
        Self::with_max_body(MAX_FRAME_BODY_BYTES)
    }

    /// Cap on body size.  Clamped to what the 32-bit length field can carry.
    pub fn with_max_body(max_body: usize) -> Self {
        Self {
            max_body: max_body.min(u32::MAX as usize),
        }
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for FrameCodec {
    type Item = Message;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Message>> {
        if src.len() < FRAME_HEADER_BYTES {
            return Ok(None);
        }

        let tag = src[0];
        let len = u32::from_be_bytes([src[1], src[2], src[3], src[4]]) as usize;

        let kind = MessageType::from_tag(tag)
            .ok_or_else(|| Error::Protocol(format!("unrecognized message tag {tag}")))?;
        if len > self.max_body {
            return Err(Error::Protocol(format!(
                "{kind} frame body of {len} bytes exceeds maximum {}",
                self.max_body
            )));
        }

        let total = FRAME_HEADER_BYTES + len;
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        src.advance(FRAME_HEADER_BYTES);
        let body = src.split_to(len);
        Message::decode(kind, &body).map(Some)
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Message>> {
        match self.decode(buf)? {
            Some(msg) => Ok(Some(msg)),
            None if buf.is_empty() => Ok(None),
            None => Err(Error::io(
                std::io::ErrorKind::UnexpectedEof,
                format!("peer closed mid-frame with {} bytes buffered", buf.len()),
            )),
        }
    }
}

impl Encoder<Message> for FrameCodec {
    type Error = Error;

    fn encode(&mut self, msg: Message, dst: &mut BytesMut) -> Result<()> {
        let len = msg.body_len();
        if len > self.max_body {
            return Err(Error::Protocol(format!(
                "{} frame body of {len} bytes exceeds maximum {}",
                msg.message_type(),
                self.max_body
            )));
        }

        let wire_len = u32::try_from(len).map_err(|_| {
            Error::Protocol(format!("{} frame body of {len} bytes", msg.message_type()))
        })?;

        dst.reserve(FRAME_HEADER_BYTES + len);
        dst.put_u8(msg.message_type().tag());
        dst.put_u32(wire_len);
        msg.encode_body(dst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{BasicResponse, ErrorCode, Hello, RegisterDevice};

    fn encoded(msg: Message) -> BytesMut {
        let mut buf = BytesMut::new();
        FrameCodec::new().encode(msg, &mut buf).unwrap();
        buf
    }

    #[test]
    fn header_layout() {
        let buf = encoded(Message::from(RegisterDevice {
            name: "kitchen-pi".into(),
            location: "kitchen".into(),
        }));
        assert_eq!(buf[0], MessageType::RegisterDevice.tag());
        let len = u32::from_be_bytes([buf[1], buf[2], buf[3], buf[4]]) as usize;
        assert_eq!(len, buf.len() - FRAME_HEADER_BYTES);
    }

    #[test]
    fn empty_body_frame() {
        // Control is the zero value, so the body is empty.
        let mut buf = encoded(Message::from(Hello::default()));
        assert_eq!(&buf[..], &[MessageType::Hello.tag(), 0, 0, 0, 0]);
        let msg = FrameCodec::new().decode(&mut buf).unwrap();
        assert_eq!(msg, Some(Message::Hello(Hello::default())));
        assert!(buf.is_empty());
    }

    #[test]
    fn waits_for_complete_body() {
        let full = encoded(Message::from(BasicResponse::with_id(42)));
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::new();

        for (i, byte) in full.iter().enumerate() {
            buf.put_u8(*byte);
            let out = codec.decode(&mut buf).unwrap();
            if i + 1 < full.len() {
                assert!(out.is_none(), "yielded early at byte {i}");
            } else {
                assert_eq!(out, Some(Message::from(BasicResponse::with_id(42))));
            }
        }
    }

    #[test]
    fn decodes_back_to_back_frames() {
        let mut buf = encoded(Message::from(BasicResponse::with_id(1)));
        buf.extend_from_slice(&encoded(Message::from(BasicResponse::with_id(2))));
        let mut codec = FrameCodec::new();
        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some(Message::from(BasicResponse::with_id(1)))
        );
        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some(Message::from(BasicResponse::with_id(2)))
        );
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn unknown_tag_is_protocol_error() {
        let mut buf = BytesMut::from(&[0xEEu8, 0, 0, 0, 0][..]);
        let err = FrameCodec::new().decode(&mut buf).unwrap_err();
        assert!(matches!(err, Error::Protocol(_)), "got {err:?}");
    }

    #[test]
    fn oversized_header_rejected_before_body_arrives() {
        let mut buf = BytesMut::new();
        buf.put_u8(MessageType::BasicResponse.tag());
        buf.put_u32(17);
        let err = FrameCodec::with_max_body(16).decode(&mut buf).unwrap_err();
        assert!(matches!(err, Error::Protocol(_)), "got {err:?}");
    }

    #[test]
    fn oversized_message_not_encoded() {
        let msg = Message::from(RegisterDevice {
            name: "x".repeat(64),
            location: String::new(),
        });
        let mut buf = BytesMut::new();
        let err = FrameCodec::with_max_body(16).encode(msg, &mut buf).unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
        assert!(buf.is_empty());
    }

    #[test]
    fn max_body_fits_length_field() {
        assert_eq!(FrameCodec::with_max_body(usize::MAX).max_body, u32::MAX as usize);
        assert_eq!(FrameCodec::with_max_body(16).max_body, 16);
    }

    #[test]
    fn eof_between_frames_is_clean() {
        let mut buf = BytesMut::new();
        assert!(FrameCodec::new().decode_eof(&mut buf).unwrap().is_none());
    }

    #[test]
    fn eof_inside_frame_is_io_error() {
        let full = encoded(Message::from(BasicResponse {
            id: Some(7),
            code: ErrorCode::Ok as i32,
            message: Some("registered".into()),
        }));
        let mut buf = BytesMut::from(&full[..full.len() - 3]);
        match FrameCodec::new().decode_eof(&mut buf) {
            Err(Error::Io(e)) => assert_eq!(e.kind(), std::io::ErrorKind::UnexpectedEof),
            other => panic!("expected UnexpectedEof, got {other:?}"),
        }
    }
}
