//! Typed control messages and their wire dispatch.
//!
//! Every control frame is `(type, payload)`; the type selects the protobuf
//! message the payload decodes to. [`ControlMessage`] covers the message set
//! this client handles — servers send further types (codec negotiation,
//! server config) which callers skip via [`ProtocolError::UnknownType`].

use bytes::Bytes;
use prost::Message;

use crate::errors::ProtocolError;
use crate::mumble;

/// Control message type discriminants, as carried in the frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ControlType {
    /// Version exchange.
    Version = 0,
    /// Tunneled voice datagram (raw voice framing, not protobuf).
    UdpTunnel = 1,
    /// Client authentication.
    Authenticate = 2,
    /// Keep-alive and transport statistics.
    Ping = 3,
    /// Connection rejection.
    Reject = 4,
    /// Initial state push complete; carries our session id.
    ServerSync = 5,
    /// Channel removal.
    ChannelRemove = 6,
    /// Channel creation or mutation.
    ChannelState = 7,
    /// User disconnect, kick, or ban.
    UserRemove = 8,
    /// User creation or mutation.
    UserState = 9,
    /// Text chat.
    TextMessage = 11,
    /// Permission rejection for a prior request.
    PermissionDenied = 12,
    /// UDP crypto key and nonce setup.
    CryptSetup = 15,
    /// Whisper/shout routing registration.
    VoiceTarget = 19,
}

impl TryFrom<u16> for ControlType {
    type Error = ProtocolError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Version),
            1 => Ok(Self::UdpTunnel),
            2 => Ok(Self::Authenticate),
            3 => Ok(Self::Ping),
            4 => Ok(Self::Reject),
            5 => Ok(Self::ServerSync),
            6 => Ok(Self::ChannelRemove),
            7 => Ok(Self::ChannelState),
            8 => Ok(Self::UserRemove),
            9 => Ok(Self::UserState),
            11 => Ok(Self::TextMessage),
            12 => Ok(Self::PermissionDenied),
            15 => Ok(Self::CryptSetup),
            19 => Ok(Self::VoiceTarget),
            other => Err(ProtocolError::UnknownType(other)),
        }
    }
}

/// A decoded control message.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlMessage {
    /// Version exchange.
    Version(mumble::Version),
    /// Tunneled voice datagram; payload uses the voice framing of
    /// [`crate::voice`], not protobuf.
    UdpTunnel(Bytes),
    /// Client authentication.
    Authenticate(mumble::Authenticate),
    /// Keep-alive and transport statistics.
    Ping(mumble::Ping),
    /// Connection rejection.
    Reject(mumble::Reject),
    /// Initial state push complete.
    ServerSync(mumble::ServerSync),
    /// Channel removal.
    ChannelRemove(mumble::ChannelRemove),
    /// Channel creation or mutation.
    ChannelState(mumble::ChannelState),
    /// User removal.
    UserRemove(mumble::UserRemove),
    /// User creation or mutation.
    UserState(mumble::UserState),
    /// Text chat.
    TextMessage(mumble::TextMessage),
    /// Permission rejection.
    PermissionDenied(mumble::PermissionDenied),
    /// UDP crypto setup or resync.
    CryptSetup(mumble::CryptSetup),
    /// Whisper/shout routing registration.
    VoiceTarget(mumble::VoiceTarget),
}

impl ControlMessage {
    /// The wire type discriminant of this message.
    #[must_use]
    pub fn control_type(&self) -> ControlType {
        match self {
            Self::Version(_) => ControlType::Version,
            Self::UdpTunnel(_) => ControlType::UdpTunnel,
            Self::Authenticate(_) => ControlType::Authenticate,
            Self::Ping(_) => ControlType::Ping,
            Self::Reject(_) => ControlType::Reject,
            Self::ServerSync(_) => ControlType::ServerSync,
            Self::ChannelRemove(_) => ControlType::ChannelRemove,
            Self::ChannelState(_) => ControlType::ChannelState,
            Self::UserRemove(_) => ControlType::UserRemove,
            Self::UserState(_) => ControlType::UserState,
            Self::TextMessage(_) => ControlType::TextMessage,
            Self::PermissionDenied(_) => ControlType::PermissionDenied,
            Self::CryptSetup(_) => ControlType::CryptSetup,
            Self::VoiceTarget(_) => ControlType::VoiceTarget,
        }
    }

    /// Encode the payload; pair with [`ControlMessage::control_type`] for the
    /// frame header.
    #[must_use]
    pub fn encode_payload(&self) -> Vec<u8> {
        match self {
            Self::Version(m) => m.encode_to_vec(),
            Self::UdpTunnel(bytes) => bytes.to_vec(),
            Self::Authenticate(m) => m.encode_to_vec(),
            Self::Ping(m) => m.encode_to_vec(),
            Self::Reject(m) => m.encode_to_vec(),
            Self::ServerSync(m) => m.encode_to_vec(),
            Self::ChannelRemove(m) => m.encode_to_vec(),
            Self::ChannelState(m) => m.encode_to_vec(),
            Self::UserRemove(m) => m.encode_to_vec(),
            Self::UserState(m) => m.encode_to_vec(),
            Self::TextMessage(m) => m.encode_to_vec(),
            Self::PermissionDenied(m) => m.encode_to_vec(),
            Self::CryptSetup(m) => m.encode_to_vec(),
            Self::VoiceTarget(m) => m.encode_to_vec(),
        }
    }

    /// Encode into a complete control frame (header + payload).
    #[must_use]
    pub fn encode_frame(&self) -> Vec<u8> {
        crate::header::encode_frame(self.control_type() as u16, &self.encode_payload())
    }

    /// Decode a payload for the given wire type.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::UnknownType`] for types outside the handled set
    /// (skip the frame); [`ProtocolError::Decode`] for malformed payloads of
    /// known types (drop the connection).
    pub fn decode(ty: u16, payload: Bytes) -> Result<Self, ProtocolError> {
        let ty = ControlType::try_from(ty)?;

        Ok(match ty {
            ControlType::Version => Self::Version(mumble::Version::decode(&payload[..])?),
            ControlType::UdpTunnel => Self::UdpTunnel(payload),
            ControlType::Authenticate => {
                Self::Authenticate(mumble::Authenticate::decode(&payload[..])?)
            }
            ControlType::Ping => Self::Ping(mumble::Ping::decode(&payload[..])?),
            ControlType::Reject => Self::Reject(mumble::Reject::decode(&payload[..])?),
            ControlType::ServerSync => Self::ServerSync(mumble::ServerSync::decode(&payload[..])?),
            ControlType::ChannelRemove => {
                Self::ChannelRemove(mumble::ChannelRemove::decode(&payload[..])?)
            }
            ControlType::ChannelState => {
                Self::ChannelState(mumble::ChannelState::decode(&payload[..])?)
            }
            ControlType::UserRemove => Self::UserRemove(mumble::UserRemove::decode(&payload[..])?),
            ControlType::UserState => Self::UserState(mumble::UserState::decode(&payload[..])?),
            ControlType::TextMessage => {
                Self::TextMessage(mumble::TextMessage::decode(&payload[..])?)
            }
            ControlType::PermissionDenied => {
                Self::PermissionDenied(mumble::PermissionDenied::decode(&payload[..])?)
            }
            ControlType::CryptSetup => Self::CryptSetup(mumble::CryptSetup::decode(&payload[..])?),
            ControlType::VoiceTarget => {
                Self::VoiceTarget(mumble::VoiceTarget::decode(&payload[..])?)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_type_is_skippable() {
        // CodecVersion (21) arrives on every stock-server handshake.
        let err = ControlMessage::decode(21, Bytes::new()).unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownType(21)));
    }

    #[test]
    fn user_state_round_trip() {
        let msg = ControlMessage::UserState(mumble::UserState {
            session: Some(7),
            channel_id: Some(42),
            listening_channel_add: vec![3, 4],
            ..Default::default()
        });

        let frame = msg.encode_frame();
        let header = crate::FrameHeader::parse(&frame).unwrap();
        assert_eq!(header.ty, ControlType::UserState as u16);

        let decoded =
            ControlMessage::decode(header.ty, Bytes::copy_from_slice(&frame[6..])).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn udp_tunnel_is_opaque() {
        let voice = Bytes::from_static(&[0x80, 0x01, 0x02]);
        let msg = ControlMessage::UdpTunnel(voice.clone());
        assert_eq!(msg.encode_payload(), voice.to_vec());

        let decoded = ControlMessage::decode(1, voice.clone()).unwrap();
        assert_eq!(decoded, ControlMessage::UdpTunnel(voice));
    }

    #[test]
    fn malformed_known_payload_is_fatal() {
        // 0xFF is an invalid field key for Ping.
        let err = ControlMessage::decode(3, Bytes::from_static(&[0xFF, 0xFF, 0xFF])).unwrap_err();
        assert!(matches!(err, ProtocolError::Decode(_)));
    }
}
