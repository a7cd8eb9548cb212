//! The client state machine.
//!
//! Owns mirrored server state, the UDP cipher, ping accounting, and the
//! application's desired state, and turns events into protocol actions. The
//! reconciliation engine runs from the periodic tick: each tick diffs
//! desired against actual state and emits at most one channel move, one
//! listen update, one voice target per pending slot, one control ping, and
//! one UDP ping.

use sotto_crypto::CryptState;
use sotto_proto::voice::{self, VoicePacket, MAX_DATAGRAM};
use sotto_proto::{mumble, ControlMessage};
use tracing::{debug, info, trace, warn};

use crate::event::{ClientAction, ClientEvent, VoiceTargetConfig};
use crate::ping::PingWindow;
use crate::state::StateStore;

use std::collections::{BTreeMap, BTreeSet};

/// Control ping cadence.
const PING_INTERVAL_MS: u64 = 1000;

/// Unanswered control pings tolerated before the connection is reset.
const MAX_IN_FLIGHT_PINGS: u32 = 4;

/// Grace period after activation before ping loss or missing UDP can reset
/// or downgrade the connection.
const SESSION_GRACE_MS: u64 = 20_000;

/// Minimum gap between crypt resync requests.
const CRYPT_REQUEST_GAP_MS: u64 = 1000;

/// Protocol version advertised in the handshake: 1.2.4.
const PROTOCOL_VERSION: u32 = 0x0001_0204;

/// Channel joined when the application never expressed a preference.
const DEFAULT_CHANNEL: &str = "Root";

/// Sans-IO voice client state machine.
pub struct Client {
    state: StateStore,
    crypto: CryptState,
    tcp_ping: PingWindow,
    udp_ping: PingWindow,

    cur_manual_channel: String,
    last_manual_channel: String,
    cur_listens: BTreeSet<String>,
    last_listens: BTreeSet<String>,
    pending_voice_targets: BTreeMap<u8, VoiceTargetConfig>,
    voice_target: u8,

    connected: bool,
    has_udp: bool,
    next_ping_at: u64,
    session_started_ms: u64,
    in_flight_tcp_pings: u32,
    last_good_udp: Option<u64>,
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl Client {
    /// Create a disconnected client.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: StateStore::new(),
            crypto: CryptState::new(),
            tcp_ping: PingWindow::new(),
            udp_ping: PingWindow::new(),
            cur_manual_channel: String::new(),
            last_manual_channel: String::new(),
            cur_listens: BTreeSet::new(),
            last_listens: BTreeSet::new(),
            pending_voice_targets: BTreeMap::new(),
            voice_target: 0,
            connected: false,
            has_udp: false,
            next_ping_at: 0,
            session_started_ms: 0,
            in_flight_tcp_pings: 0,
            last_good_udp: None,
        }
    }

    /// Process one event and return the actions it produced.
    pub fn handle(&mut self, event: ClientEvent) -> Vec<ClientAction> {
        match event {
            ClientEvent::ConnectRequested { username } => {
                self.on_connect_requested(username);
                Vec::new()
            }
            ClientEvent::TlsActivated { now_ms } => self.on_tls_activated(now_ms),
            ClientEvent::ConnectionLost => {
                self.connected = false;
                Vec::new()
            }
            ClientEvent::Control { message, now_ms } => self.on_control(message, now_ms),
            ClientEvent::Datagram { data, now_ms } => self.on_datagram(&data, now_ms),
            ClientEvent::Tick { now_ms } => self.on_tick(now_ms),
            ClientEvent::SetChannel(name) => {
                if self.connected && name != self.cur_manual_channel {
                    self.cur_manual_channel = name;
                }
                Vec::new()
            }
            ClientEvent::AddListenChannel(name) => {
                self.cur_listens.insert(name);
                Vec::new()
            }
            ClientEvent::RemoveListenChannel(name) => {
                self.cur_listens.remove(&name);
                Vec::new()
            }
            ClientEvent::SetVoiceTarget(index) => {
                self.voice_target = index;
                Vec::new()
            }
            ClientEvent::UpdateVoiceTarget { index, config } => {
                self.pending_voice_targets.insert(index, config);
                Vec::new()
            }
            ClientEvent::SendVoice { data } => self.on_send_voice(data),
        }
    }

    fn on_connect_requested(&mut self, username: String) {
        self.state.set_username(username);
        self.tcp_ping.reset();
        self.udp_ping.reset();

        // First connect defaults the desired channel; reconnects instead
        // reset the acknowledged name so the reconciler re-joins the
        // desired channel on the fresh session.
        if self.cur_manual_channel.is_empty() {
            self.cur_manual_channel = DEFAULT_CHANNEL.to_string();
        } else {
            self.last_manual_channel = DEFAULT_CHANNEL.to_string();
        }
    }

    fn on_tls_activated(&mut self, now_ms: u64) -> Vec<ClientAction> {
        self.state.reset();
        self.connected = true;
        self.has_udp = false;
        self.in_flight_tcp_pings = 0;
        self.session_started_ms = now_ms;
        self.next_ping_at = 0;
        self.last_good_udp = None;
        // Listens were acknowledged by the previous session only.
        self.last_listens.clear();

        let version = ControlMessage::Version(mumble::Version {
            version: Some(PROTOCOL_VERSION),
            release: Some(format!("sotto {}", env!("CARGO_PKG_VERSION"))),
            os: Some(std::env::consts::OS.to_string()),
            os_version: None,
        });

        let authenticate = ControlMessage::Authenticate(mumble::Authenticate {
            username: Some(self.state.username().to_string()),
            opus: Some(true),
            ..Default::default()
        });

        vec![ClientAction::SendControl(version), ClientAction::SendControl(authenticate)]
    }

    fn on_control(&mut self, message: ControlMessage, now_ms: u64) -> Vec<ClientAction> {
        match message {
            ControlMessage::Ping(ping) => {
                self.on_server_ping(&ping, now_ms);
                Vec::new()
            }
            ControlMessage::ServerSync(sync) => {
                let session = sync.session.unwrap_or(0);
                self.state.set_session(session);
                info!(session, "server sync complete");
                vec![ClientAction::Synced { session }]
            }
            ControlMessage::UserState(update) => {
                self.apply_user_state(&update);
                Vec::new()
            }
            ControlMessage::UserRemove(remove) => {
                if let Some(user) = self.state.remove_user(remove.session) {
                    debug!(session = remove.session, name = %user.name, "user removed");
                }
                Vec::new()
            }
            ControlMessage::ChannelState(update) => {
                self.apply_channel_state(&update);
                Vec::new()
            }
            ControlMessage::ChannelRemove(remove) => {
                self.state.remove_channel(remove.channel_id);
                Vec::new()
            }
            ControlMessage::CryptSetup(setup) => {
                self.apply_crypt_setup(&setup);
                Vec::new()
            }
            ControlMessage::UdpTunnel(data) => {
                let mut actions = Vec::new();
                self.route_voice(&data, now_ms, &mut actions);
                actions
            }
            ControlMessage::Reject(reject) => {
                warn!(
                    reason = reject.reason.as_deref().unwrap_or(""),
                    "server rejected the connection"
                );
                Vec::new()
            }
            ControlMessage::PermissionDenied(denied) => {
                debug!(
                    reason = denied.reason.as_deref().unwrap_or(""),
                    "permission denied"
                );
                Vec::new()
            }
            ControlMessage::TextMessage(text) => {
                trace!(actor = text.actor.unwrap_or(0), "text message ignored");
                Vec::new()
            }
            ControlMessage::Version(version) => {
                debug!(
                    version = version.version.unwrap_or(0),
                    release = version.release.as_deref().unwrap_or(""),
                    "server version"
                );
                Vec::new()
            }
            // Client-to-server messages echoed by misbehaving servers.
            ControlMessage::Authenticate(_) | ControlMessage::VoiceTarget(_) => Vec::new(),
        }
    }

    fn apply_user_state(&mut self, update: &mumble::UserState) {
        let Some(session) = update.session else {
            return;
        };

        let user = self.state.upsert_user(session);
        if let Some(name) = &update.name {
            user.name.clone_from(name);
        }
        if let Some(server_id) = update.user_id {
            user.server_id = server_id;
        }
        if let Some(channel_id) = update.channel_id {
            user.channel_id = channel_id;
        }
    }

    fn apply_channel_state(&mut self, update: &mumble::ChannelState) {
        let Some(id) = update.channel_id else {
            return;
        };

        let channel = self.state.upsert_channel(id);
        if let Some(parent) = update.parent {
            channel.parent = parent;
        }
        if let Some(name) = &update.name {
            channel.name.clone_from(name);
        }
        if let Some(temporary) = update.temporary {
            channel.temporary = temporary;
        }
    }

    fn apply_crypt_setup(&mut self, setup: &mumble::CryptSetup) {
        match (&setup.key, &setup.client_nonce, &setup.server_nonce) {
            (Some(key), Some(client_nonce), Some(server_nonce)) => {
                match self.crypto.install(key, client_nonce, server_nonce) {
                    Ok(()) => debug!("udp crypto initialized"),
                    Err(err) => warn!(%err, "crypt setup rejected"),
                }
            }
            (None, _, Some(server_nonce)) => {
                match self.crypto.set_decrypt_nonce(server_nonce) {
                    Ok(()) => debug!("udp crypto resynced"),
                    Err(err) => warn!(%err, "crypt resync rejected"),
                }
            }
            _ => debug!("ignoring crypt setup without key material"),
        }
    }

    fn on_server_ping(&mut self, ping: &mumble::Ping, now_ms: u64) {
        self.in_flight_tcp_pings = 0;

        if self.crypto.initialized() {
            self.crypto.set_remote(
                ping.good.unwrap_or(0),
                ping.late.unwrap_or(0),
                ping.lost.unwrap_or(0),
                ping.resync.unwrap_or(0),
            );

            let stats = self.crypto.stats();
            let aged = now_ms.saturating_sub(self.session_started_ms) > SESSION_GRACE_MS;

            if self.has_udp && (stats.remote_good == 0 || stats.local_good == 0) && aged {
                self.has_udp = false;
                if stats.remote_good == 0 && stats.local_good == 0 {
                    warn!("udp blocked in both directions, voice falls back to the tcp tunnel");
                } else if stats.remote_good == 0 {
                    warn!("server does not receive our udp packets, voice falls back to the tcp tunnel");
                } else {
                    warn!("no udp packets arrive from the server, voice falls back to the tcp tunnel");
                }
            } else if !self.has_udp && stats.remote_good > 3 && stats.local_good > 3 {
                info!("udp path confirmed in both directions, leaving the tcp tunnel");
                self.has_udp = true;
            }
        }

        if let Some(timestamp) = ping.timestamp {
            self.tcp_ping.record(now_ms.saturating_sub(timestamp) as f32);
        }
    }

    fn on_datagram(&mut self, data: &[u8], now_ms: u64) -> Vec<ClientAction> {
        let mut actions = Vec::new();

        if !self.crypto.initialized() {
            return actions;
        }

        if data.len() > MAX_DATAGRAM {
            trace!(len = data.len(), "dropping oversized datagram");
            return actions;
        }

        match self.crypto.decrypt(data) {
            Some(plain) => {
                self.last_good_udp = Some(now_ms);
                self.route_voice(&plain, now_ms, &mut actions);
            }
            None => {
                debug!("datagram failed to decrypt");
                let stale = self
                    .last_good_udp
                    .is_none_or(|at| now_ms.saturating_sub(at) > CRYPT_REQUEST_GAP_MS);
                if stale {
                    // Rate-limit resync requests to one per gap interval.
                    self.last_good_udp = Some(now_ms);
                    debug!("requesting crypt resync");
                    actions.push(ClientAction::SendControl(ControlMessage::CryptSetup(
                        mumble::CryptSetup::default(),
                    )));
                }
            }
        }

        actions
    }

    fn route_voice(&mut self, data: &[u8], now_ms: u64, actions: &mut Vec<ClientAction>) {
        match voice::parse(data) {
            Some(VoicePacket::Ping { timestamp }) => {
                self.udp_ping.record(now_ms.saturating_sub(timestamp) as f32);
            }
            Some(VoicePacket::Opus { session, sequence, payload, terminator, position, distance }) => {
                let Some(user) = self.state.user(session as u32) else {
                    return;
                };
                let user = user.clone();

                if !payload.is_empty() {
                    actions.push(ClientAction::VoiceFrame {
                        user: user.clone(),
                        sequence,
                        payload,
                        terminator,
                    });
                }
                if let Some(position) = position {
                    actions.push(ClientAction::Position { session: session as u32, position });
                }
                if let Some(distance) = distance {
                    actions.push(ClientAction::Distance { user, distance });
                }
            }
            None => {}
        }
    }

    fn on_send_voice(&mut self, data: Vec<u8>) -> Vec<ClientAction> {
        if !self.has_udp {
            return vec![ClientAction::SendControl(ControlMessage::UdpTunnel(data.into()))];
        }

        if !self.crypto.initialized() {
            return Vec::new();
        }

        if data.len() > MAX_DATAGRAM - sotto_crypto::TAG_OVERHEAD {
            trace!(len = data.len(), "voice frame exceeds the datagram budget, dropping");
            return Vec::new();
        }

        match self.crypto.encrypt(&data) {
            Some(wire) => vec![ClientAction::SendDatagram(wire)],
            None => Vec::new(),
        }
    }

    fn on_tick(&mut self, now_ms: u64) -> Vec<ClientAction> {
        let mut actions = Vec::new();

        if !self.connected {
            return actions;
        }

        self.reconcile_channel(&mut actions);
        self.reconcile_listens(&mut actions);
        self.flush_voice_targets(&mut actions);
        self.track_own_channel();
        self.ping_cadence(now_ms, &mut actions);

        actions
    }

    fn reconcile_channel(&mut self, actions: &mut Vec<ClientAction>) {
        if self.cur_manual_channel == self.last_manual_channel
            || self.state.channels().is_empty()
        {
            return;
        }

        self.last_manual_channel.clone_from(&self.cur_manual_channel);

        if let Some(channel_id) = self.state.channel_id_by_name(&self.cur_manual_channel) {
            actions.push(ClientAction::SendControl(ControlMessage::UserState(
                mumble::UserState {
                    session: Some(self.state.session()),
                    channel_id: Some(channel_id),
                    ..Default::default()
                },
            )));
        } else {
            // Ask the server to create it; the join happens on a later tick
            // once the channel shows up in the state store.
            actions.push(ClientAction::SendControl(ControlMessage::ChannelState(
                mumble::ChannelState {
                    parent: Some(0),
                    name: Some(self.cur_manual_channel.clone()),
                    temporary: Some(true),
                    ..Default::default()
                },
            )));
        }
    }

    fn reconcile_listens(&mut self, actions: &mut Vec<ClientAction>) {
        let to_remove: Vec<String> =
            self.last_listens.difference(&self.cur_listens).cloned().collect();
        let to_add: Vec<String> =
            self.cur_listens.difference(&self.last_listens).cloned().collect();

        let mut remove_ids = Vec::new();
        for name in to_remove {
            if let Some(id) = self.state.channel_id_by_name(&name) {
                remove_ids.push(id);
            }
            // Whether resolved or not, we no longer listen to it.
            self.last_listens.remove(&name);
        }

        let mut add_ids = Vec::new();
        for name in to_add {
            if let Some(id) = self.state.channel_id_by_name(&name) {
                add_ids.push(id);
                self.last_listens.insert(name);
            }
            // Unresolved names stay pending and retry next tick.
        }

        if !add_ids.is_empty() || !remove_ids.is_empty() {
            actions.push(ClientAction::SendControl(ControlMessage::UserState(
                mumble::UserState {
                    session: Some(self.state.session()),
                    listening_channel_add: add_ids,
                    listening_channel_remove: remove_ids,
                    ..Default::default()
                },
            )));
        }
    }

    fn flush_voice_targets(&mut self, actions: &mut Vec<ClientAction>) {
        let pending = std::mem::take(&mut self.pending_voice_targets);

        for (index, config) in pending {
            let mut targets = Vec::new();

            // All user targets share one sub-target.
            let mut sessions = Vec::new();
            for name in &config.users {
                if let Some(user) = self.state.user_by_name(name) {
                    sessions.push(user.session);
                }
            }
            targets.push(mumble::voice_target::Target { session: sessions, ..Default::default() });

            // Channel routing is per channel: one sub-target each.
            for name in &config.channels {
                if let Some(channel_id) = self.state.channel_id_by_name(name) {
                    targets.push(mumble::voice_target::Target {
                        channel_id: Some(channel_id),
                        ..Default::default()
                    });
                }
            }

            actions.push(ClientAction::SendControl(ControlMessage::VoiceTarget(
                mumble::VoiceTarget { id: Some(u32::from(index)), targets },
            )));
        }
    }

    fn track_own_channel(&mut self) {
        let Some(user) = self.state.user(self.state.session()) else {
            return;
        };
        let Some(channel) = self.state.channel(user.channel_id) else {
            return;
        };

        if !channel.name.is_empty() {
            self.last_manual_channel.clone_from(&channel.name);
        }
    }

    fn ping_cadence(&mut self, now_ms: u64, actions: &mut Vec<ClientAction>) {
        if now_ms < self.next_ping_at {
            return;
        }

        let aged = now_ms.saturating_sub(self.session_started_ms) > SESSION_GRACE_MS;
        if self.in_flight_tcp_pings >= MAX_IN_FLIGHT_PINGS && aged {
            warn!(
                in_flight = self.in_flight_tcp_pings,
                "server stopped answering control pings, resetting the connection"
            );
            self.connected = false;
            actions.push(ClientAction::Reconnect);
            return;
        }

        self.in_flight_tcp_pings += 1;

        let crypt = self.crypto.stats();
        actions.push(ClientAction::SendControl(ControlMessage::Ping(mumble::Ping {
            timestamp: Some(now_ms),
            good: Some(crypt.local_good),
            late: Some(crypt.local_late),
            lost: Some(crypt.local_lost),
            resync: Some(crypt.local_resync),
            tcp_packets: Some(self.tcp_ping.count()),
            tcp_ping_avg: Some(self.tcp_ping.average()),
            tcp_ping_var: Some(self.tcp_ping.variance()),
            udp_packets: Some(self.udp_ping.count()),
            udp_ping_avg: Some(self.udp_ping.average()),
            udp_ping_var: Some(self.udp_ping.variance()),
        })));

        // Sent even while tunneling: this is what re-opens the NAT path and
        // lets the server's good count recover.
        if let Some(wire) = self.crypto.encrypt(&voice::encode_ping(now_ms)) {
            actions.push(ClientAction::SendDatagram(wire));
        }

        self.next_ping_at = now_ms + PING_INTERVAL_MS;
    }

    // Read-side accessors for the facade.

    /// Mirrored server state.
    #[must_use]
    pub fn state(&self) -> &StateStore {
        &self.state
    }

    /// Whether the control channel is considered alive.
    #[must_use]
    pub fn connected(&self) -> bool {
        self.connected
    }

    /// Whether voice currently uses the UDP path (false means tunneling).
    #[must_use]
    pub fn has_udp(&self) -> bool {
        self.has_udp
    }

    /// The voice target slot applied to outgoing audio.
    #[must_use]
    pub fn voice_target(&self) -> u8 {
        self.voice_target
    }

    /// Round-trip statistics for the control channel.
    #[must_use]
    pub fn tcp_ping(&self) -> &PingWindow {
        &self.tcp_ping
    }

    /// Round-trip statistics for the UDP voice path.
    #[must_use]
    pub fn udp_ping(&self) -> &PingWindow {
        &self.udp_ping
    }

    /// True when a channel with this exact name is known.
    #[must_use]
    pub fn channel_exists(&self, name: &str) -> bool {
        self.state.channel_id_by_name(name).is_some()
    }

    /// Display name of the user with this stable server id.
    #[must_use]
    pub fn player_name_from_server_id(&self, server_id: u32) -> Option<String> {
        self.state.user_by_server_id(server_id).map(|u| u.name.clone())
    }

    /// Channel name the user with this stable server id is in.
    #[must_use]
    pub fn voice_channel_from_server_id(&self, server_id: u32) -> Option<String> {
        let user = self.state.user_by_server_id(server_id)?;
        self.state.channel(user.channel_id).map(|c| c.name.clone())
    }

    /// Resolve active speaker sessions to display names, appending our own
    /// username when the local input is live.
    #[must_use]
    pub fn talker_names(&self, sessions: &[u32], self_talking: bool) -> Vec<String> {
        let mut names: Vec<String> = sessions
            .iter()
            .filter_map(|s| self.state.user(*s))
            .map(|u| u.name.clone())
            .collect();

        if self_talking {
            names.push(self.state.username().to_string());
        }

        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn activated_client() -> Client {
        let mut client = Client::new();
        client.handle(ClientEvent::ConnectRequested { username: "alice".into() });
        client.handle(ClientEvent::TlsActivated { now_ms: 0 });
        client
    }

    #[test]
    fn activation_sends_version_then_authenticate() {
        let mut client = Client::new();
        client.handle(ClientEvent::ConnectRequested { username: "alice".into() });
        let actions = client.handle(ClientEvent::TlsActivated { now_ms: 0 });

        assert_eq!(actions.len(), 2);
        match &actions[0] {
            ClientAction::SendControl(ControlMessage::Version(v)) => {
                assert_eq!(v.version, Some(PROTOCOL_VERSION));
            }
            other => panic!("expected version first, got {other:?}"),
        }
        match &actions[1] {
            ClientAction::SendControl(ControlMessage::Authenticate(a)) => {
                assert_eq!(a.username.as_deref(), Some("alice"));
                assert_eq!(a.opus, Some(true));
            }
            other => panic!("expected authenticate second, got {other:?}"),
        }
    }

    #[test]
    fn server_sync_resolves_session() {
        let mut client = activated_client();
        let actions = client.handle(ClientEvent::Control {
            message: ControlMessage::ServerSync(mumble::ServerSync {
                session: Some(31),
                ..Default::default()
            }),
            now_ms: 10,
        });

        assert_eq!(actions, vec![ClientAction::Synced { session: 31 }]);
        assert_eq!(client.state().session(), 31);
    }

    #[test]
    fn set_channel_requires_connection() {
        let mut client = Client::new();
        client.handle(ClientEvent::SetChannel("Lobby".into()));
        assert!(client.cur_manual_channel.is_empty());

        let mut client = activated_client();
        client.handle(ClientEvent::SetChannel("Lobby".into()));
        assert_eq!(client.cur_manual_channel, "Lobby");
    }

    #[test]
    fn first_connect_defaults_channel_to_root() {
        let mut client = Client::new();
        client.handle(ClientEvent::ConnectRequested { username: "a".into() });
        assert_eq!(client.cur_manual_channel, DEFAULT_CHANNEL);

        // A reconnect keeps the preference but forces a re-join.
        client.handle(ClientEvent::TlsActivated { now_ms: 0 });
        client.handle(ClientEvent::SetChannel("Ops".into()));
        client.handle(ClientEvent::ConnectRequested { username: "a".into() });
        assert_eq!(client.cur_manual_channel, "Ops");
        assert_eq!(client.last_manual_channel, DEFAULT_CHANNEL);
    }

    #[test]
    fn voice_send_tunnels_without_udp() {
        let mut client = activated_client();
        let frame = vec![0x80, 0x00, 0x01, 0xAA];
        let actions = client.handle(ClientEvent::SendVoice { data: frame.clone() });

        assert_eq!(
            actions,
            vec![ClientAction::SendControl(ControlMessage::UdpTunnel(frame.into()))]
        );
    }

    #[test]
    fn tunneled_voice_routes_like_a_datagram() {
        let mut client = activated_client();
        client.handle(ClientEvent::Control {
            message: ControlMessage::UserState(mumble::UserState {
                session: Some(5),
                name: Some("bob".into()),
                ..Default::default()
            }),
            now_ms: 0,
        });

        let wire = voice::encode_opus(0, 9, b"opus", false, None).unwrap();
        let mut relayed = vec![wire[0] & 0xE0, 0x05];
        relayed.extend_from_slice(&wire[1..]);

        let actions = client.handle(ClientEvent::Control {
            message: ControlMessage::UdpTunnel(relayed.into()),
            now_ms: 0,
        });

        match &actions[..] {
            [ClientAction::VoiceFrame { user, sequence, payload, terminator }] => {
                assert_eq!(user.name, "bob");
                assert_eq!(*sequence, 9);
                assert_eq!(payload, b"opus");
                assert!(!terminator);
            }
            other => panic!("expected one voice frame, got {other:?}"),
        }
    }

    #[test]
    fn voice_from_unknown_session_is_dropped() {
        let mut client = activated_client();

        let wire = voice::encode_opus(0, 1, b"opus", false, None).unwrap();
        let mut relayed = vec![wire[0] & 0xE0, 0x07];
        relayed.extend_from_slice(&wire[1..]);

        let actions = client.handle(ClientEvent::Control {
            message: ControlMessage::UdpTunnel(relayed.into()),
            now_ms: 0,
        });
        assert!(actions.is_empty());
    }
}
