//! Protocol error types.

use thiserror::Error;

/// Errors produced while framing or decoding control traffic.
///
/// Voice datagrams never produce errors; malformed voice data is discarded
/// silently by the parser (see [`crate::voice`]).
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Frame header announced a payload above the safety ceiling.
    ///
    /// This is a protocol violation: the peer is either not speaking the
    /// protocol or attempting resource exhaustion. The connection must be
    /// closed.
    #[error("control payload of {size} bytes exceeds the {max} byte ceiling")]
    PayloadTooLarge {
        /// Announced payload length.
        size: usize,
        /// Maximum accepted payload length.
        max: usize,
    },

    /// Frame type is not part of the control message set.
    ///
    /// Servers legitimately send types outside the set this client handles;
    /// callers skip the frame rather than closing the connection.
    #[error("unhandled control message type {0}")]
    UnknownType(u16),

    /// Payload of a known type failed protobuf decoding.
    #[error("malformed control payload: {0}")]
    Decode(#[from] prost::DecodeError),
}
