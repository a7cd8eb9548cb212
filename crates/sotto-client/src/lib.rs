//! Tokio runtime and public facade for the Sotto voice client.
//!
//! # Architecture
//!
//! Protocol logic lives in [`sotto_core`] as a pure state machine; this
//! crate supplies the I/O around it:
//!
//! - [`transport`]: the TCP+TLS control channel (reader/writer tasks over
//!   channels).
//! - A UDP socket for the encrypted voice path.
//! - A single connection task that owns the state machine, drives the
//!   500 ms reconciliation tick, and implements the reconnect policy.
//! - [`VoiceClient`]: the application-facing handle.
//!
//! All socket I/O happens on the connection task; the facade only enqueues
//! commands and takes brief locks for reads, so its methods never block on
//! the network.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod audio;
mod client;
mod error;
mod runtime;
pub mod transport;
mod udp;

pub use audio::{ActivationMode, AudioInput, AudioOutput, NullAudio, PositionHook, VoiceLikelihood};
pub use client::{ClientConfig, ConnectionInfo, VoiceClient};
pub use error::ClientError;
pub use sotto_core::{Channel, User, VoiceTargetConfig};
pub use transport::TlsMode;
