//! Mumble control-channel protocol buffer messages.
//!
//! Hand-maintained `prost` definitions for the subset of the Mumble protocol
//! this client speaks. Field numbers follow the upstream `Mumble.proto`
//! (proto2), so the wire format is interoperable with stock servers.

#![allow(missing_docs)]

/// Version exchange, sent by both peers immediately after the TLS handshake.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Version {
    /// Encoded as `(major << 16) | (minor << 8) | patch`.
    #[prost(uint32, optional, tag = "1")]
    pub version: ::core::option::Option<u32>,
    #[prost(string, optional, tag = "2")]
    pub release: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(string, optional, tag = "3")]
    pub os: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(string, optional, tag = "4")]
    pub os_version: ::core::option::Option<::prost::alloc::string::String>,
}

/// Client authentication, sent once after `Version`.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Authenticate {
    #[prost(string, optional, tag = "1")]
    pub username: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(string, optional, tag = "2")]
    pub password: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(string, repeated, tag = "3")]
    pub tokens: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
    #[prost(int32, repeated, packed = "false", tag = "4")]
    pub celt_versions: ::prost::alloc::vec::Vec<i32>,
    #[prost(bool, optional, tag = "5")]
    pub opus: ::core::option::Option<bool>,
}

/// Keep-alive and transport statistics, exchanged in both directions.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Ping {
    #[prost(uint64, optional, tag = "1")]
    pub timestamp: ::core::option::Option<u64>,
    #[prost(uint32, optional, tag = "2")]
    pub good: ::core::option::Option<u32>,
    #[prost(uint32, optional, tag = "3")]
    pub late: ::core::option::Option<u32>,
    #[prost(uint32, optional, tag = "4")]
    pub lost: ::core::option::Option<u32>,
    #[prost(uint32, optional, tag = "5")]
    pub resync: ::core::option::Option<u32>,
    #[prost(uint32, optional, tag = "6")]
    pub udp_packets: ::core::option::Option<u32>,
    #[prost(uint32, optional, tag = "7")]
    pub tcp_packets: ::core::option::Option<u32>,
    #[prost(float, optional, tag = "8")]
    pub udp_ping_avg: ::core::option::Option<f32>,
    #[prost(float, optional, tag = "9")]
    pub udp_ping_var: ::core::option::Option<f32>,
    #[prost(float, optional, tag = "10")]
    pub tcp_ping_avg: ::core::option::Option<f32>,
    #[prost(float, optional, tag = "11")]
    pub tcp_ping_var: ::core::option::Option<f32>,
}

/// Connection rejection, sent by the server before closing.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Reject {
    #[prost(enumeration = "reject::RejectType", optional, tag = "1")]
    pub r#type: ::core::option::Option<i32>,
    #[prost(string, optional, tag = "2")]
    pub reason: ::core::option::Option<::prost::alloc::string::String>,
}

pub mod reject {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum RejectType {
        None = 0,
        WrongVersion = 1,
        InvalidUsername = 2,
        WrongUserPw = 3,
        WrongServerPw = 4,
        UsernameInUse = 5,
        ServerFull = 6,
        NoCertificate = 7,
        AuthenticatorFail = 8,
    }
}

/// Sent by the server when authentication succeeded and initial state has
/// been pushed; carries our session id.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ServerSync {
    #[prost(uint32, optional, tag = "1")]
    pub session: ::core::option::Option<u32>,
    #[prost(uint32, optional, tag = "2")]
    pub max_bandwidth: ::core::option::Option<u32>,
    #[prost(string, optional, tag = "3")]
    pub welcome_text: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(uint64, optional, tag = "4")]
    pub permissions: ::core::option::Option<u64>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ChannelRemove {
    #[prost(uint32, required, tag = "1")]
    pub channel_id: u32,
}

/// Channel creation or mutation; also used by the client to request a
/// temporary channel.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ChannelState {
    #[prost(uint32, optional, tag = "1")]
    pub channel_id: ::core::option::Option<u32>,
    #[prost(uint32, optional, tag = "2")]
    pub parent: ::core::option::Option<u32>,
    #[prost(string, optional, tag = "3")]
    pub name: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(uint32, repeated, packed = "false", tag = "4")]
    pub links: ::prost::alloc::vec::Vec<u32>,
    #[prost(string, optional, tag = "5")]
    pub description: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(bool, optional, tag = "8")]
    pub temporary: ::core::option::Option<bool>,
    #[prost(int32, optional, tag = "9")]
    pub position: ::core::option::Option<i32>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UserRemove {
    #[prost(uint32, required, tag = "1")]
    pub session: u32,
    #[prost(uint32, optional, tag = "2")]
    pub actor: ::core::option::Option<u32>,
    #[prost(string, optional, tag = "3")]
    pub reason: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(bool, optional, tag = "4")]
    pub ban: ::core::option::Option<bool>,
}

/// User creation or mutation; also the vehicle for channel moves and
/// listening-channel updates initiated by the client.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UserState {
    #[prost(uint32, optional, tag = "1")]
    pub session: ::core::option::Option<u32>,
    #[prost(uint32, optional, tag = "2")]
    pub actor: ::core::option::Option<u32>,
    #[prost(string, optional, tag = "3")]
    pub name: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(uint32, optional, tag = "4")]
    pub user_id: ::core::option::Option<u32>,
    #[prost(uint32, optional, tag = "5")]
    pub channel_id: ::core::option::Option<u32>,
    #[prost(bool, optional, tag = "6")]
    pub mute: ::core::option::Option<bool>,
    #[prost(bool, optional, tag = "7")]
    pub deaf: ::core::option::Option<bool>,
    #[prost(bool, optional, tag = "8")]
    pub suppress: ::core::option::Option<bool>,
    #[prost(bool, optional, tag = "9")]
    pub self_mute: ::core::option::Option<bool>,
    #[prost(bool, optional, tag = "10")]
    pub self_deaf: ::core::option::Option<bool>,
    #[prost(uint32, repeated, packed = "false", tag = "21")]
    pub listening_channel_add: ::prost::alloc::vec::Vec<u32>,
    #[prost(uint32, repeated, packed = "false", tag = "22")]
    pub listening_channel_remove: ::prost::alloc::vec::Vec<u32>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TextMessage {
    #[prost(uint32, optional, tag = "1")]
    pub actor: ::core::option::Option<u32>,
    #[prost(uint32, repeated, packed = "false", tag = "2")]
    pub session: ::prost::alloc::vec::Vec<u32>,
    #[prost(uint32, repeated, packed = "false", tag = "3")]
    pub channel_id: ::prost::alloc::vec::Vec<u32>,
    #[prost(uint32, repeated, packed = "false", tag = "4")]
    pub tree_id: ::prost::alloc::vec::Vec<u32>,
    #[prost(string, required, tag = "5")]
    pub message: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PermissionDenied {
    #[prost(uint32, optional, tag = "1")]
    pub permission: ::core::option::Option<u32>,
    #[prost(uint32, optional, tag = "2")]
    pub channel_id: ::core::option::Option<u32>,
    #[prost(uint32, optional, tag = "3")]
    pub session: ::core::option::Option<u32>,
    #[prost(string, optional, tag = "4")]
    pub reason: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(string, optional, tag = "6")]
    pub name: ::core::option::Option<::prost::alloc::string::String>,
}

/// Symmetric-key setup for the UDP voice channel.
///
/// The server sends all three fields after authentication; a client sends an
/// empty message to request a nonce resync, which the server answers with a
/// `server_nonce`-only message.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CryptSetup {
    #[prost(bytes = "vec", optional, tag = "1")]
    pub key: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "2")]
    pub client_nonce: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "3")]
    pub server_nonce: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,
}

/// Whisper/shout routing rule registration.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct VoiceTarget {
    /// Target slot, 1..=30.
    #[prost(uint32, optional, tag = "1")]
    pub id: ::core::option::Option<u32>,
    #[prost(message, repeated, tag = "2")]
    pub targets: ::prost::alloc::vec::Vec<voice_target::Target>,
}

pub mod voice_target {
    /// A single routing sub-target: a set of sessions or one channel.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Target {
        #[prost(uint32, repeated, packed = "false", tag = "1")]
        pub session: ::prost::alloc::vec::Vec<u32>,
        #[prost(uint32, optional, tag = "2")]
        pub channel_id: ::core::option::Option<u32>,
        #[prost(string, optional, tag = "3")]
        pub group: ::core::option::Option<::prost::alloc::string::String>,
        #[prost(bool, optional, tag = "4")]
        pub links: ::core::option::Option<bool>,
        #[prost(bool, optional, tag = "5")]
        pub children: ::core::option::Option<bool>,
    }
}
