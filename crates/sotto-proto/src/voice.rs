//! Voice datagram framing.
//!
//! The same byte format travels in two envelopes: encrypted UDP datagrams
//! and the payload of `UDPTunnel` control frames. The first byte's top three
//! bits select the packet kind; the low five bits carry the whisper target
//! on outgoing audio.
//!
//! Malformed or truncated input is discarded by returning `None`; voice
//! traffic is lossy by design and a bad datagram must never take the
//! connection down.

use crate::packet::{PacketReader, PacketWriter};

/// Hard ceiling for a voice datagram, ciphertext tag included.
pub const MAX_DATAGRAM: usize = 1024;

/// Kind selector for UDP ping packets (`header >> 5`).
pub const KIND_PING: u8 = 1;

/// Kind selector for OPUS audio packets (`header >> 5`).
pub const KIND_OPUS: u8 = 4;

/// Terminator flag bit in the opus frame descriptor.
const OPUS_TERMINATOR: u64 = 0x2000;

/// Length mask in the opus frame descriptor.
const OPUS_LENGTH: u64 = 0x1FFF;

/// A parsed voice datagram.
#[derive(Debug, Clone, PartialEq)]
pub enum VoicePacket {
    /// Transport keep-alive; the server echoes the timestamp back.
    Ping {
        /// Sender clock in milliseconds.
        timestamp: u64,
    },
    /// One opus audio frame from a remote user.
    Opus {
        /// Speaker's session id.
        session: u64,
        /// Monotonic frame sequence for jitter-buffer ordering.
        sequence: u64,
        /// Opaque opus payload; may be empty when the datagram carried only
        /// positional data.
        payload: Vec<u8>,
        /// Set on the final frame of a transmission.
        terminator: bool,
        /// Positional audio coordinates, when present.
        position: Option<[f32; 3]>,
        /// Audio distance override, when present.
        distance: Option<f32>,
    },
}

/// Parse a decrypted voice datagram or `UDPTunnel` payload.
///
/// Returns `None` for unknown kinds and for input too truncated to carry a
/// packet; callers drop such datagrams silently.
#[must_use]
pub fn parse(data: &[u8]) -> Option<VoicePacket> {
    let mut reader = PacketReader::new(data);
    let header = reader.read_u8();
    if !reader.ok() {
        return None;
    }

    match header >> 5 {
        KIND_PING => {
            let timestamp = reader.read_u64();
            reader.ok().then_some(VoicePacket::Ping { timestamp })
        }
        KIND_OPUS => {
            let session = reader.read_varint();
            let sequence = reader.read_varint();
            if !reader.ok() {
                return None;
            }

            let descriptor = reader.read_varint();
            let terminator = descriptor & OPUS_TERMINATOR != 0;
            let len = (descriptor & OPUS_LENGTH) as usize;

            // Only the first frame of the descriptor sequence is extracted;
            // a truncated frame degrades to a position-only packet.
            let payload = if reader.ok() && len <= reader.left() {
                reader.read_bytes(len)
            } else {
                Vec::new()
            };

            let mut position = None;
            let mut distance = None;
            if reader.left() >= 12 {
                position = Some([reader.read_f32(), reader.read_f32(), reader.read_f32()]);
                if reader.left() >= 4 {
                    distance = Some(reader.read_f32());
                }
            }

            Some(VoicePacket::Opus { session, sequence, payload, terminator, position, distance })
        }
        _ => None,
    }
}

/// Encode a UDP ping datagram: kind header plus a big-endian timestamp.
#[must_use]
pub fn encode_ping(timestamp: u64) -> Vec<u8> {
    let mut buf = [0u8; 9];
    let mut writer = PacketWriter::new(&mut buf);
    writer.write_u8(KIND_PING << 5);
    writer.write_u64(timestamp);
    debug_assert!(writer.ok());
    buf.to_vec()
}

/// Encode an outgoing opus frame for transmission.
///
/// `target` is the whisper target slot (0 for normal talk) and lands in the
/// low five bits of the header byte. Returns `None` when the frame would not
/// fit the plaintext budget of a voice datagram ([`MAX_DATAGRAM`] minus the
/// 4-byte crypto tag).
#[must_use]
pub fn encode_opus(
    target: u8,
    sequence: u64,
    payload: &[u8],
    terminator: bool,
    position: Option<[f32; 3]>,
) -> Option<Vec<u8>> {
    let mut buf = [0u8; MAX_DATAGRAM - 4];
    let mut writer = PacketWriter::new(&mut buf);

    writer.write_u8(KIND_OPUS << 5 | target & 0x1F);
    writer.write_varint(sequence);

    let mut descriptor = payload.len() as u64 & OPUS_LENGTH;
    if terminator {
        descriptor |= OPUS_TERMINATOR;
    }
    writer.write_varint(descriptor);
    writer.write_bytes(payload);

    if let Some([x, y, z]) = position {
        writer.write_f32(x);
        writer.write_f32(y);
        writer.write_f32(z);
    }

    let ok = writer.ok();
    let size = writer.size();
    ok.then(|| buf[..size].to_vec())
}
