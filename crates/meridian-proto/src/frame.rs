//! Frame encoding and decoding.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::ProtocolError;

/// Frame header size in bytes.
pub const FRAME_HEADER_SIZE: usize = 8;

/// Current protocol version.
pub const PROTOCOL_VERSION: u8 = 1;

/// Message types are 24-bit on the wire.
pub const MAX_MESSAGE_TYPE: u32 = 0x00FF_FFFF;

/// A single wire frame: fixed header plus opaque body.
///
/// Frames are created fresh for every call and response; the body is owned
/// by the frame (cheaply cloneable via [`Bytes`]) until handed to the
/// transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Protocol version (currently 1).
    pub version: u8,
    /// 24-bit message type identifier.
    pub msg_type: u32,
    /// Correlation number matching a request to its response.
    pub request_id: u32,
    /// Opaque body bytes (may be empty).
    pub body: Bytes,
}

impl Frame {
    /// Creates a frame with the current protocol version.
    #[must_use]
    pub fn new(msg_type: u32, request_id: u32, body: impl Into<Bytes>) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            msg_type,
            request_id,
            body: body.into(),
        }
    }

    /// Creates a frame with an empty body.
    #[must_use]
    pub fn empty(msg_type: u32, request_id: u32) -> Self {
        Self::new(msg_type, request_id, Bytes::new())
    }

    /// Encodes the frame to wire bytes (big-endian header, then body).
    ///
    /// Only the low 24 bits of the message type exist on the wire; catalog
    /// types always fit.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        debug_assert!(self.msg_type <= MAX_MESSAGE_TYPE);

        let mut buf = BytesMut::with_capacity(FRAME_HEADER_SIZE + self.body.len());
        buf.put_u8(self.version);
        buf.put_u8((self.msg_type >> 16) as u8);
        buf.put_u8((self.msg_type >> 8) as u8);
        buf.put_u8(self.msg_type as u8);
        buf.put_u32(self.request_id);
        buf.extend_from_slice(&self.body);
        buf.freeze()
    }

    /// Decodes a frame from wire bytes.
    ///
    /// Fails with [`ProtocolError::FrameTooShort`] if the input cannot hold
    /// the 8-byte header. The body is everything after the header and may be
    /// empty.
    pub fn decode(mut bytes: Bytes) -> Result<Self, ProtocolError> {
        if bytes.len() < FRAME_HEADER_SIZE {
            return Err(ProtocolError::FrameTooShort { len: bytes.len() });
        }

        let version = bytes.get_u8();
        let msg_type = (u32::from(bytes.get_u8()) << 16)
            | (u32::from(bytes.get_u8()) << 8)
            | u32::from(bytes.get_u8());
        let request_id = bytes.get_u32();

        Ok(Self {
            version,
            msg_type,
            request_id,
            body: bytes,
        })
    }

    /// Total encoded length of this frame.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        FRAME_HEADER_SIZE + self.body.len()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_with_body() {
        let frame = Frame::new(0x03_0101, 12345, &b"test payload"[..]);
        let bytes = frame.encode();

        assert_eq!(bytes.len(), FRAME_HEADER_SIZE + b"test payload".len());
        assert_eq!(bytes[0], 0x01);

        let decoded = Frame::decode(bytes).unwrap();
        assert_eq!(decoded.version, PROTOCOL_VERSION);
        assert_eq!(decoded.msg_type, 0x03_0101);
        assert_eq!(decoded.request_id, 12345);
        assert_eq!(&decoded.body[..], b"test payload");
    }

    #[test]
    fn roundtrip_empty_body() {
        let frame = Frame::empty(0x01_0103, 7);
        let bytes = frame.encode();
        assert_eq!(bytes.len(), FRAME_HEADER_SIZE);

        let decoded = Frame::decode(bytes).unwrap();
        assert_eq!(decoded.msg_type, 0x01_0103);
        assert_eq!(decoded.request_id, 7);
        assert!(decoded.body.is_empty());
    }

    #[test]
    fn header_layout_is_big_endian() {
        let frame = Frame::new(0xAA_BBCC, 0x0102_0304, Bytes::new());
        let bytes = frame.encode();
        assert_eq!(&bytes[..], &[0x01, 0xAA, 0xBB, 0xCC, 0x01, 0x02, 0x03, 0x04]);
    }

    #[test]
    fn decode_rejects_short_input() {
        for len in 0..FRAME_HEADER_SIZE {
            let err = Frame::decode(Bytes::from(vec![0u8; len])).unwrap_err();
            assert!(matches!(err, ProtocolError::FrameTooShort { len: l } if l == len));
        }
    }

    #[test]
    fn decode_accepts_exact_header() {
        let decoded = Frame::decode(Bytes::from(vec![1, 0, 0, 1, 0, 0, 0, 9])).unwrap();
        assert_eq!(decoded.version, 1);
        assert_eq!(decoded.msg_type, 1);
        assert_eq!(decoded.request_id, 9);
        assert!(decoded.body.is_empty());
    }

    #[test]
    fn max_request_id_survives() {
        let frame = Frame::empty(0x03_0101, u32::MAX);
        let decoded = Frame::decode(frame.encode()).unwrap();
        assert_eq!(decoded.request_id, u32::MAX);
    }
}
