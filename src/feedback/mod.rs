mod audio;
mod haptics;

#[cfg(test)]
mod tests;

pub use audio::{NullTone, ToneSink};
pub use haptics::{HapticSink, NullHaptics, TimedOutputHaptics};

#[cfg(all(target_os = "linux", feature = "feedback"))]
pub use audio::EvdevBeeper;

use crate::config::FeedbackConfig;
use std::sync::Arc;
use tracing::warn;

/// Lifecycle points that produce operator cues
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cue {
    /// A code was read and admitted; fires before the network call resolves
    ScanRead,
    /// Check-in succeeded
    Success,
    /// Guest was already checked in
    AlreadyCheckedIn,
    /// Check-in failed
    Failure,
}

impl Cue {
    /// Haptic on/off pattern in milliseconds, starting with an "on" segment
    pub fn haptic_pattern(&self) -> &'static [u64] {
        match self {
            Cue::ScanRead => &[40],
            Cue::Success => &[80],
            Cue::AlreadyCheckedIn => &[60, 80, 60],
            Cue::Failure => &[250],
        }
    }

    /// Tone frequency (Hz) and duration (ms)
    pub fn tone(&self) -> (u16, u64) {
        match self {
            Cue::ScanRead => (1200, 80),
            Cue::Success => (1600, 120),
            Cue::AlreadyCheckedIn => (900, 120),
            Cue::Failure => (400, 250),
        }
    }
}

/// Fire-and-forget haptic/audio cues for the scan pipeline.
///
/// Every sink call runs on a blocking task and swallows its errors; the
/// emitter can never fail, throw into, or block the scan loop.
pub struct FeedbackEmitter {
    haptics: Arc<dyn HapticSink>,
    tone: Arc<dyn ToneSink>,
    enabled: bool,
}

impl FeedbackEmitter {
    pub fn new(haptics: Arc<dyn HapticSink>, tone: Arc<dyn ToneSink>, enabled: bool) -> Self {
        Self {
            haptics,
            tone,
            enabled,
        }
    }

    /// Build the emitter for the configured devices, falling back to no-op
    /// sinks where the hardware path is unavailable.
    pub fn from_config(config: &FeedbackConfig) -> Self {
        let haptics: Arc<dyn HapticSink> = Arc::new(TimedOutputHaptics::new(&config.haptic_device));

        #[cfg(all(target_os = "linux", feature = "feedback"))]
        let tone: Arc<dyn ToneSink> = Arc::new(EvdevBeeper::new(&config.beeper_device));
        #[cfg(not(all(target_os = "linux", feature = "feedback")))]
        let tone: Arc<dyn ToneSink> = Arc::new(NullTone);

        Self::new(haptics, tone, config.enabled)
    }

    /// Emit the cue for a lifecycle point. Returns immediately.
    pub fn emit(&self, cue: Cue) {
        if !self.enabled {
            return;
        }

        let haptics = Arc::clone(&self.haptics);
        let tone = Arc::clone(&self.tone);

        tokio::task::spawn_blocking(move || {
            if let Err(e) = haptics.vibrate(cue.haptic_pattern()) {
                warn!("Haptic cue {:?} failed: {}", cue, e);
            }
            let (freq, duration) = cue.tone();
            if let Err(e) = tone.tone(freq, duration) {
                warn!("Audio cue {:?} failed: {}", cue, e);
            }
        });
    }
}
