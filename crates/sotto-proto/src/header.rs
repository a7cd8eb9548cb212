//! Control-frame header and stream reassembly.
//!
//! Control messages on the TLS stream carry a fixed 6-byte big-endian prefix,
//! `type: u16` followed by `length: u32`, then `length` payload bytes whose
//! encoding is determined by the type. The [`Framer`] accumulates plaintext
//! produced by the TLS session and yields complete frames; partial frames
//! stay buffered until more bytes arrive.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::errors::ProtocolError;

/// Fixed 6-byte control frame prefix (big-endian).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Message type discriminant.
    pub ty: u16,
    /// Payload length in bytes.
    pub len: u32,
}

impl FrameHeader {
    /// Serialized header size.
    pub const SIZE: usize = 6;

    /// Safety ceiling for a single control payload (8 MiB).
    ///
    /// Anything larger is treated as a protocol violation and closes the
    /// connection; legitimate control traffic is orders of magnitude smaller.
    pub const MAX_PAYLOAD: u32 = 8 * 1024 * 1024;

    /// Parse a header from the first [`Self::SIZE`] bytes of `buf`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::PayloadTooLarge`] when the announced length
    /// exceeds [`Self::MAX_PAYLOAD`].
    ///
    /// # Panics
    ///
    /// Panics if `buf` is shorter than [`Self::SIZE`]; callers check
    /// availability first.
    pub fn parse(buf: &[u8]) -> Result<Self, ProtocolError> {
        let ty = u16::from_be_bytes([buf[0], buf[1]]);
        let len = u32::from_be_bytes([buf[2], buf[3], buf[4], buf[5]]);

        if len > Self::MAX_PAYLOAD {
            return Err(ProtocolError::PayloadTooLarge {
                size: len as usize,
                max: Self::MAX_PAYLOAD as usize,
            });
        }

        Ok(Self { ty, len })
    }

    /// Append the serialized header to `dst`.
    pub fn encode(&self, dst: &mut impl BufMut) {
        dst.put_u16(self.ty);
        dst.put_u32(self.len);
    }
}

/// A reassembled control frame: type discriminant plus raw payload.
///
/// Payload decoding is deferred so unknown types can be skipped without
/// touching their bytes.
#[derive(Debug, Clone)]
pub struct RawFrame {
    /// Message type discriminant from the header.
    pub ty: u16,
    /// Raw payload bytes.
    pub payload: Bytes,
}

/// Accumulates TLS plaintext and yields complete control frames.
#[derive(Debug, Default)]
pub struct Framer {
    buf: BytesMut,
}

impl Framer {
    /// Create an empty framer.
    #[must_use]
    pub fn new() -> Self {
        Self { buf: BytesMut::with_capacity(4096) }
    }

    /// Feed plaintext bytes received from the TLS session.
    pub fn extend(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Pop the next complete frame, if one is buffered.
    ///
    /// Returns `Ok(None)` when more bytes are needed. Call repeatedly after
    /// each [`Framer::extend`] until it returns `None` — a single read may
    /// carry several frames.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::PayloadTooLarge`] on a header announcing an
    /// oversized payload; the connection must be dropped as no resync point
    /// exists in the stream.
    pub fn next_frame(&mut self) -> Result<Option<RawFrame>, ProtocolError> {
        if self.buf.len() < FrameHeader::SIZE {
            return Ok(None);
        }

        let header = FrameHeader::parse(&self.buf[..FrameHeader::SIZE])?;
        let total = FrameHeader::SIZE + header.len as usize;

        if self.buf.len() < total {
            return Ok(None);
        }

        self.buf.advance(FrameHeader::SIZE);
        let payload = self.buf.split_to(header.len as usize).freeze();

        Ok(Some(RawFrame { ty: header.ty, payload }))
    }

    /// Discard any buffered partial frame.
    ///
    /// Used when a connection is torn down so a reconnect starts clean.
    pub fn reset(&mut self) {
        self.buf.clear();
    }
}

/// Encode a frame (header + payload) into a fresh buffer.
#[must_use]
pub fn encode_frame(ty: u16, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(FrameHeader::SIZE + payload.len());
    FrameHeader { ty, len: payload.len() as u32 }.encode(&mut out);
    out.extend_from_slice(payload);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_round_trip() {
        let header = FrameHeader { ty: 3, len: 1234 };
        let mut wire = Vec::new();
        header.encode(&mut wire);

        assert_eq!(wire.len(), FrameHeader::SIZE);
        assert_eq!(FrameHeader::parse(&wire).unwrap(), header);
    }

    #[test]
    fn oversized_payload_rejected() {
        let mut wire = Vec::new();
        FrameHeader { ty: 0, len: FrameHeader::MAX_PAYLOAD + 1 }.encode(&mut wire);

        assert!(matches!(
            FrameHeader::parse(&wire),
            Err(ProtocolError::PayloadTooLarge { .. })
        ));
    }

    #[test]
    fn framer_reassembles_split_input() {
        let wire = encode_frame(9, b"hello voice");

        let mut framer = Framer::new();
        // Feed one byte at a time; no frame until the last byte lands.
        for (i, byte) in wire.iter().enumerate() {
            framer.extend(&[*byte]);
            if i + 1 < wire.len() {
                assert!(framer.next_frame().unwrap().is_none());
            }
        }

        let frame = framer.next_frame().unwrap().unwrap();
        assert_eq!(frame.ty, 9);
        assert_eq!(&frame.payload[..], b"hello voice");
        assert!(framer.next_frame().unwrap().is_none());
    }

    #[test]
    fn framer_yields_multiple_frames_per_feed() {
        let mut wire = encode_frame(0, b"a");
        wire.extend_from_slice(&encode_frame(5, b""));
        wire.extend_from_slice(&encode_frame(3, b"ping"));

        let mut framer = Framer::new();
        framer.extend(&wire);

        assert_eq!(framer.next_frame().unwrap().unwrap().ty, 0);
        let sync = framer.next_frame().unwrap().unwrap();
        assert_eq!(sync.ty, 5);
        assert!(sync.payload.is_empty());
        assert_eq!(&framer.next_frame().unwrap().unwrap().payload[..], b"ping");
        assert!(framer.next_frame().unwrap().is_none());
    }

    #[test]
    fn framer_oversize_is_fatal() {
        let mut framer = Framer::new();
        let mut wire = Vec::new();
        FrameHeader { ty: 1, len: FrameHeader::MAX_PAYLOAD + 1 }.encode(&mut wire);
        framer.extend(&wire);

        assert!(framer.next_frame().is_err());
    }
}
