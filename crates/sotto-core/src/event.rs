//! Events fed into the client and actions it produces.

use std::collections::BTreeSet;

use sotto_proto::ControlMessage;

use crate::state::User;

/// A whisper/shout routing rule, expressed in names.
///
/// Names rather than ids: targets can be configured before the referenced
/// users or channels are known to the server state, and they are resolved
/// on every flush.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoiceTargetConfig {
    /// Display names of target users.
    pub users: BTreeSet<String>,
    /// Names of target channels.
    pub channels: BTreeSet<String>,
}

/// Events the driver feeds into the state machine.
///
/// Every time-sensitive event carries the driver's clock as milliseconds so
/// the core stays deterministic under test.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// A connection attempt was requested by the application.
    ConnectRequested {
        /// Username to authenticate with.
        username: String,
    },

    /// The TLS session became active; the control channel is usable.
    TlsActivated {
        /// Driver clock.
        now_ms: u64,
    },

    /// The transport failed or was closed.
    ConnectionLost,

    /// A decoded control message arrived on the TLS stream.
    Control {
        /// The decoded message.
        message: ControlMessage,
        /// Driver clock.
        now_ms: u64,
    },

    /// An encrypted datagram arrived on the UDP socket.
    Datagram {
        /// Raw datagram including the crypto tag.
        data: Vec<u8>,
        /// Driver clock.
        now_ms: u64,
    },

    /// Periodic reconciliation tick; fed every 500 ms while the TLS session
    /// is active.
    Tick {
        /// Driver clock.
        now_ms: u64,
    },

    /// Application wants to be in this channel.
    SetChannel(String),

    /// Application wants to hear this channel without joining.
    AddListenChannel(String),

    /// Application no longer wants to hear this channel.
    RemoveListenChannel(String),

    /// Select the voice target slot used for outgoing audio.
    SetVoiceTarget(u8),

    /// Queue a voice target rebuild for a slot.
    UpdateVoiceTarget {
        /// Target slot, 1..=30 (0 is normal talk).
        index: u8,
        /// Users and channels to route to.
        config: VoiceTargetConfig,
    },

    /// Application wants to transmit one framed voice packet.
    SendVoice {
        /// Voice payload in wire framing (header byte, sequence, opus data).
        data: Vec<u8>,
    },
}

/// Actions for the driver to execute.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientAction {
    /// Send a control message over the TLS stream.
    SendControl(ControlMessage),

    /// Send an already-encrypted datagram over the UDP socket.
    SendDatagram(Vec<u8>),

    /// Deliver one opus frame to the audio output.
    VoiceFrame {
        /// Speaking user.
        user: User,
        /// Frame sequence number for jitter ordering.
        sequence: u64,
        /// Opaque opus payload.
        payload: Vec<u8>,
        /// Final frame of the transmission.
        terminator: bool,
    },

    /// Positional update for a speaking user; queued for the audio thread.
    Position {
        /// Speaker's session id.
        session: u32,
        /// World coordinates.
        position: [f32; 3],
    },

    /// Audio distance update for a speaking user.
    Distance {
        /// Speaking user.
        user: User,
        /// Maximum audible distance.
        distance: f32,
    },

    /// The server acknowledged authentication; the connection is usable.
    Synced {
        /// Our session id.
        session: u32,
    },

    /// The connection is considered dead; tear down and redial.
    Reconnect,
}
