//! Round-trip time accounting.

/// Samples kept for the running average and variance.
const WINDOW: usize = 16;

/// Fixed-size ring of round-trip samples with derived statistics.
///
/// One window exists per transport (TCP control pings, UDP voice pings);
/// both are reported to the server in every control ping.
#[derive(Debug, Clone)]
pub struct PingWindow {
    samples: [f32; WINDOW],
    count: u32,
}

impl Default for PingWindow {
    fn default() -> Self {
        Self::new()
    }
}

impl PingWindow {
    /// An empty window.
    #[must_use]
    pub fn new() -> Self {
        Self { samples: [0.0; WINDOW], count: 0 }
    }

    /// Drop all samples.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Record one round-trip sample in milliseconds.
    pub fn record(&mut self, rtt_ms: f32) {
        let filled = self.count as usize;
        if filled < WINDOW {
            self.samples[filled] = rtt_ms;
        } else {
            self.samples.rotate_left(1);
            self.samples[WINDOW - 1] = rtt_ms;
        }
        self.count += 1;
    }

    /// Total samples ever recorded (not capped at the window size).
    #[must_use]
    pub fn count(&self) -> u32 {
        self.count
    }

    fn filled(&self) -> &[f32] {
        &self.samples[..(self.count as usize).min(WINDOW)]
    }

    /// Mean of the windowed samples; 0 when empty.
    #[must_use]
    pub fn average(&self) -> f32 {
        let filled = self.filled();
        if filled.is_empty() {
            return 0.0;
        }
        filled.iter().sum::<f32>() / filled.len() as f32
    }

    /// Population variance of the windowed samples; 0 when empty.
    #[must_use]
    pub fn variance(&self) -> f32 {
        let filled = self.filled();
        if filled.is_empty() {
            return 0.0;
        }
        let mean = self.average();
        filled.iter().map(|s| (s - mean) * (s - mean)).sum::<f32>() / filled.len() as f32
    }
}
