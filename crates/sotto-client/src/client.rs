//! Public client facade.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use sotto_core::{Client, ClientEvent, VoiceTargetConfig};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::warn;

use crate::audio::{ActivationMode, AudioInput, AudioOutput, PositionHook, VoiceLikelihood};
use crate::error::ClientError;
use crate::runtime::{Command, Runtime, lock};
use crate::transport::TlsMode;

/// Default time allowed for TCP connect plus TLS handshake.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Client configuration.
///
/// [`ClientConfig::default`] gives secure TLS with SNI derived from the
/// connect address and a 5 second connect timeout.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// TLS verification mode.
    pub tls_mode: TlsMode,

    /// SNI / verification name override; the connect host is used when
    /// unset.
    pub server_name: Option<String>,

    /// Maximum time for connection establishment, handshake included.
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            tls_mode: TlsMode::default(),
            server_name: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl ClientConfig {
    /// Config for development servers with self-signed certificates.
    #[must_use]
    pub fn development() -> Self {
        Self { tls_mode: TlsMode::Insecure, ..Default::default() }
    }

    /// Config for production with an explicit verification name.
    #[must_use]
    pub fn production(server_name: impl Into<String>) -> Self {
        Self {
            tls_mode: TlsMode::Secure,
            server_name: Some(server_name.into()),
            ..Default::default()
        }
    }
}

/// Snapshot of the connection lifecycle, readable at any time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionInfo {
    /// Configured server address (`host:port`), empty when disconnected.
    pub address: String,
    /// Configured username.
    pub username: String,
    /// A dial or handshake is in progress.
    pub is_connecting: bool,
    /// The control channel is up.
    pub is_connected: bool,
}

/// Handle to a voice client.
///
/// Cheap to clone-by-reference through `Arc`; all methods take `&self`.
/// State setters are non-blocking and idempotent: they enqueue the change
/// and the reconciliation loop converges the server towards it. Dropping
/// the last handle shuts the connection task down.
pub struct VoiceClient {
    commands: mpsc::UnboundedSender<Command>,
    core: Arc<Mutex<Client>>,
    info: Arc<Mutex<ConnectionInfo>>,
    positions: crossbeam_channel::Receiver<(u32, [f32; 3])>,
    position_hook: Mutex<Option<PositionHook>>,
    input: Arc<dyn AudioInput>,
    output: Arc<dyn AudioOutput>,
    runtime_task: JoinHandle<()>,
}

impl VoiceClient {
    /// Create a client and spawn its connection task.
    ///
    /// # Errors
    ///
    /// Fails when the voice socket cannot be bound.
    ///
    /// # Panics
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(
        config: ClientConfig,
        input: Arc<dyn AudioInput>,
        output: Arc<dyn AudioOutput>,
    ) -> std::io::Result<Self> {
        let core = Arc::new(Mutex::new(Client::new()));
        let info = Arc::new(Mutex::new(ConnectionInfo::default()));
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (positions_tx, positions_rx) = crossbeam_channel::unbounded();

        let runtime_task = Runtime::spawn(
            config,
            core.clone(),
            info.clone(),
            output.clone(),
            positions_tx,
            commands_rx,
        )?;

        Ok(Self {
            commands: commands_tx,
            core,
            info,
            positions: positions_rx,
            position_hook: Mutex::new(None),
            input,
            output,
            runtime_task,
        })
    }

    /// Connect to a server and authenticate.
    ///
    /// Resolves once the server completes its initial state push. A failed
    /// attempt keeps retrying on the reconnect schedule, so this future
    /// resolves on whichever attempt first succeeds.
    ///
    /// # Errors
    ///
    /// [`ClientError::InvalidAddress`] for a malformed address;
    /// [`ClientError::Closed`] when the runtime is gone.
    pub async fn connect(
        &self,
        address: impl Into<String>,
        username: impl Into<String>,
    ) -> Result<ConnectionInfo, ClientError> {
        let address = address.into();
        if crate::runtime::parse_address(&address).is_none() {
            return Err(ClientError::InvalidAddress(address));
        }

        let (done, completion) = oneshot::channel();
        self.commands
            .send(Command::Connect { address, username: username.into(), done })
            .map_err(|_| ClientError::Closed)?;

        completion.await.map_err(|_| ClientError::Closed)
    }

    /// Disconnect gracefully.
    ///
    /// Resolves once the socket has closed (immediately when there is no
    /// connection).
    ///
    /// # Errors
    ///
    /// [`ClientError::Closed`] when the runtime is gone.
    pub async fn disconnect(&self) -> Result<(), ClientError> {
        let (done, completion) = oneshot::channel();
        self.commands.send(Command::Disconnect { done }).map_err(|_| ClientError::Closed)?;
        completion.await.map_err(|_| ClientError::Closed)
    }

    /// Request a channel move; the reconciler converges on the next tick.
    /// No-op when already requested or while disconnected.
    pub fn set_channel(&self, name: impl Into<String>) {
        self.send(ClientEvent::SetChannel(name.into()));
    }

    /// Start listening to a channel without joining it.
    pub fn add_listen_channel(&self, name: impl Into<String>) {
        self.send(ClientEvent::AddListenChannel(name.into()));
    }

    /// Stop listening to a channel.
    pub fn remove_listen_channel(&self, name: impl Into<String>) {
        self.send(ClientEvent::RemoveListenChannel(name.into()));
    }

    /// Select the whisper target slot for outgoing voice (0 = normal talk).
    pub fn set_voice_target(&self, index: u8) {
        self.send(ClientEvent::SetVoiceTarget(index));
    }

    /// Queue a rebuild of a whisper target slot.
    pub fn update_voice_target(&self, index: u8, config: VoiceTargetConfig) {
        self.send(ClientEvent::UpdateVoiceTarget { index, config });
    }

    /// The whisper target slot currently applied to outgoing voice, for the
    /// capture side to stamp into frame headers.
    #[must_use]
    pub fn voice_target(&self) -> u8 {
        lock(&self.core).voice_target()
    }

    /// Transmit one framed voice packet (see
    /// [`sotto_proto::voice::encode_opus`]). Rides UDP when the path is
    /// proven, the TCP tunnel otherwise; dropped silently while
    /// disconnected.
    pub fn send_voice(&self, data: Vec<u8>) {
        self.send(ClientEvent::SendVoice { data });
    }

    /// Names of everyone currently audible, our own name included when the
    /// input side reports us talking.
    #[must_use]
    pub fn get_talkers(&self) -> Vec<String> {
        let sessions = self.output.talkers();
        let self_talking = self.input.is_talking();
        lock(&self.core).talker_names(&sessions, self_talking)
    }

    /// Whether any remote user is currently audible.
    #[must_use]
    pub fn is_anyone_talking(&self) -> bool {
        !self.output.talkers().is_empty()
    }

    /// Current lifecycle snapshot.
    #[must_use]
    pub fn get_connection_info(&self) -> ConnectionInfo {
        lock(&self.info).clone()
    }

    /// True when a channel with this exact name exists on the server.
    #[must_use]
    pub fn does_channel_exist(&self, name: &str) -> bool {
        lock(&self.core).channel_exists(name)
    }

    /// Display name of the user with this stable server id.
    #[must_use]
    pub fn get_player_name_from_server_id(&self, server_id: u32) -> Option<String> {
        lock(&self.core).player_name_from_server_id(server_id)
    }

    /// Channel name of the user with this stable server id.
    #[must_use]
    pub fn get_voice_channel_from_server_id(&self, server_id: u32) -> Option<String> {
        lock(&self.core).voice_channel_from_server_id(server_id)
    }

    /// Override the playback volume for a user by display name.
    pub fn set_client_volume_override(&self, name: &str, volume: f32) {
        let user = lock(&self.core).state().user_by_name(name).cloned();
        match user {
            Some(user) => self.output.set_volume_override(&user, volume),
            None => warn!(%name, "volume override for unknown user"),
        }
    }

    /// Override the playback volume for a user by stable server id.
    pub fn set_client_volume_override_by_server_id(&self, server_id: u32, volume: f32) {
        let user = lock(&self.core).state().user_by_server_id(server_id).cloned();
        if let Some(user) = user {
            self.output.set_volume_override(&user, volume);
        }
    }

    /// Install the hook that overrides wire positions per user.
    pub fn set_position_hook(&self, hook: PositionHook) {
        *lock(&self.position_hook) = Some(hook);
    }

    /// Drain queued positional updates and deliver them to the audio
    /// output.
    ///
    /// Call from the consumer's audio/render thread. Positions are queued
    /// rather than delivered inline because the position hook may run
    /// arbitrary consumer code that must stay off the network task.
    pub fn run_frame(&self) {
        while let Ok((session, mut position)) = self.positions.try_recv() {
            let user = lock(&self.core).state().user(session).cloned();
            let Some(user) = user else { continue };

            let hook = lock(&self.position_hook).clone();
            if let Some(hook) = hook {
                if let Some(replacement) = hook(&user.name) {
                    position = replacement;
                }
            }

            self.output.on_position(&user, position);
        }
    }

    // Audio forwarding; capture and playback live behind the traits.

    /// Our own position for positional audio.
    pub fn set_actor_position(&self, position: [f32; 3]) {
        self.input.set_position(position);
    }

    /// Listener pose for 3D rendering.
    pub fn set_listener_matrix(&self, position: [f32; 3], front: [f32; 3], up: [f32; 3]) {
        self.output.set_listener(position, front, up);
    }

    /// Master playback volume.
    pub fn set_output_volume(&self, volume: f32) {
        self.output.set_volume(volume);
    }

    /// Audible distance for both directions.
    pub fn set_audio_distance(&self, distance: f32) {
        self.input.set_distance(distance);
        self.output.set_distance(distance);
    }

    /// Audible distance for our transmissions only.
    pub fn set_audio_input_distance(&self, distance: f32) {
        self.input.set_distance(distance);
    }

    /// Audible distance for playback only.
    pub fn set_audio_output_distance(&self, distance: f32) {
        self.output.set_distance(distance);
    }

    /// Current audible distance.
    #[must_use]
    pub fn get_audio_distance(&self) -> f32 {
        self.output.distance()
    }

    /// Switch between voice activation and push-to-talk.
    pub fn set_activation_mode(&self, mode: ActivationMode) {
        self.input.set_activation_mode(mode);
    }

    /// Tune voice-activity sensitivity.
    pub fn set_activation_likelihood(&self, likelihood: VoiceLikelihood) {
        self.input.set_activation_likelihood(likelihood);
    }

    /// Push-to-talk control state.
    pub fn set_ptt(&self, pressed: bool) {
        self.input.set_ptt(pressed);
    }

    fn send(&self, event: ClientEvent) {
        // A dropped runtime means shutdown; setters are fire-and-forget.
        let _ = self.commands.send(Command::Event(event));
    }
}

impl Drop for VoiceClient {
    fn drop(&mut self) {
        self.runtime_task.abort();
    }
}
