//! Wire protocol for the Sotto voice client.
//!
//! Three independent layers share this crate:
//!
//! - [`header`]: the 6-byte control-frame prefix used on the TLS stream and
//!   the [`Framer`] accumulator that reassembles frames from a plaintext byte
//!   stream.
//! - [`control`]: typed control messages (Mumble protocol buffers) keyed by
//!   the frame type field.
//! - [`packet`] / [`voice`]: the self-describing voice byte-stream codec used
//!   inside UDP datagrams and `UDPTunnel` control frames.
//!
//! The crate is transport-agnostic: it never touches sockets and performs no
//! I/O, so every codec path is testable from plain byte slices.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod control;
mod errors;
pub mod header;
pub mod mumble;
pub mod packet;
pub mod voice;

pub use control::{ControlMessage, ControlType};
pub use errors::ProtocolError;
pub use header::{Framer, FrameHeader, RawFrame};
pub use packet::{PacketReader, PacketWriter};
pub use voice::VoicePacket;

/// Result alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;
