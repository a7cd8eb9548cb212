//! Audio collaborator interfaces.
//!
//! Capture, encoding, playback, and spatialization live outside this crate;
//! these traits are the narrow seams the client talks through. Defaults are
//! no-ops so a consumer only implements what it uses.

use std::sync::Arc;

use sotto_core::User;

/// How the input side decides when the user is transmitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationMode {
    /// Transmit when voice activity is detected.
    VoiceActivity,
    /// Transmit while the push-to-talk control is held.
    PushToTalk,
}

/// Sensitivity of voice-activity detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceLikelihood {
    /// Trigger on almost anything.
    VeryLow,
    /// Permissive.
    Low,
    /// Balanced default.
    Moderate,
    /// Conservative.
    High,
    /// Trigger only on clear speech.
    VeryHigh,
}

/// Hook that overrides wire positions; receives the speaker's name and
/// returns replacement coordinates.
pub type PositionHook = Arc<dyn Fn(&str) -> Option<[f32; 3]> + Send + Sync>;

/// The audio capture side (microphone, encoder, voice detection).
pub trait AudioInput: Send + Sync {
    /// Whether the local user is currently transmitting.
    fn is_talking(&self) -> bool {
        false
    }

    /// Our own position for positional audio.
    fn set_position(&self, _position: [f32; 3]) {}

    /// Maximum distance at which our audio should be heard.
    fn set_distance(&self, _distance: f32) {}

    /// Switch between voice activation and push-to-talk.
    fn set_activation_mode(&self, _mode: ActivationMode) {}

    /// Tune voice-activity sensitivity.
    fn set_activation_likelihood(&self, _likelihood: VoiceLikelihood) {}

    /// Push-to-talk control state.
    fn set_ptt(&self, _pressed: bool) {}
}

/// The audio playback side (jitter buffer, decoder, mixer, 3D rendering).
pub trait AudioOutput: Send + Sync {
    /// Deliver one opus frame from a remote user.
    ///
    /// Called from the network task; implementations must hand the payload
    /// off without blocking on codec work.
    fn on_voice(&self, user: &User, sequence: u64, payload: &[u8], terminator: bool);

    /// Positional update for a user, delivered from the consumer's audio
    /// thread via [`crate::VoiceClient::run_frame`].
    fn on_position(&self, _user: &User, _position: [f32; 3]) {}

    /// Audio distance override carried in a voice packet.
    fn on_distance(&self, _user: &User, _distance: f32) {}

    /// Sessions currently producing audible output.
    fn talkers(&self) -> Vec<u32> {
        Vec::new()
    }

    /// Master playback volume.
    fn set_volume(&self, _volume: f32) {}

    /// Per-user volume override.
    fn set_volume_override(&self, _user: &User, _volume: f32) {}

    /// Maximum audible distance for incoming audio.
    fn set_distance(&self, _distance: f32) {}

    /// Current maximum audible distance.
    fn distance(&self) -> f32 {
        0.0
    }

    /// Listener pose for 3D rendering.
    fn set_listener(&self, _position: [f32; 3], _front: [f32; 3], _up: [f32; 3]) {}
}

/// Output sink that discards everything; useful for control-only consumers
/// and tests.
pub struct NullAudio;

impl AudioInput for NullAudio {}

impl AudioOutput for NullAudio {
    fn on_voice(&self, _user: &User, _sequence: u64, _payload: &[u8], _terminator: bool) {}
}
