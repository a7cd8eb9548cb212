//! Sans-IO client state machine for the Sotto voice client.
//!
//! The [`Client`] owns every piece of protocol state — the user/channel
//! store, the UDP cipher, ping statistics, and the desired-state fields the
//! application mutates — but performs no I/O and reads no clocks. The caller
//! feeds it [`ClientEvent`]s (decoded control frames, UDP datagrams, ticks,
//! application intents) with explicit millisecond timestamps and executes
//! the [`ClientAction`]s it returns.
//!
//! This makes the entire reconciliation engine testable from plain event
//! sequences: every property of the protocol (channel convergence, listen
//! deltas, ping cadence, UDP fallback) is observable as emitted actions.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod client;
mod event;
mod ping;
mod state;

pub use client::Client;
pub use event::{ClientAction, ClientEvent, VoiceTargetConfig};
pub use ping::PingWindow;
pub use state::{Channel, StateStore, User};
