use super::*;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

struct RecordingHaptics {
    patterns: Mutex<Vec<Vec<u64>>>,
}

impl HapticSink for RecordingHaptics {
    fn vibrate(&self, pattern: &[u64]) -> std::io::Result<()> {
        self.patterns.lock().push(pattern.to_vec());
        Ok(())
    }
}

struct RecordingTone {
    tones: Mutex<Vec<(u16, u64)>>,
}

impl ToneSink for RecordingTone {
    fn tone(&self, freq_hz: u16, duration_ms: u64) -> std::io::Result<()> {
        self.tones.lock().push((freq_hz, duration_ms));
        Ok(())
    }
}

struct FailingSink;

impl HapticSink for FailingSink {
    fn vibrate(&self, _pattern: &[u64]) -> std::io::Result<()> {
        Err(std::io::Error::new(std::io::ErrorKind::NotFound, "no motor"))
    }
}

impl ToneSink for FailingSink {
    fn tone(&self, _freq_hz: u16, _duration_ms: u64) -> std::io::Result<()> {
        Err(std::io::Error::new(std::io::ErrorKind::NotFound, "no beeper"))
    }
}

async fn drain_blocking_tasks() {
    // spawn_blocking cues have no completion handle; a short yield-loop is
    // enough for the threadpool to run them
    for _ in 0..20 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

#[tokio::test]
async fn outcome_cues_are_distinct() {
    assert_ne!(Cue::Success.haptic_pattern(), Cue::Failure.haptic_pattern());
    assert_ne!(
        Cue::Success.haptic_pattern(),
        Cue::AlreadyCheckedIn.haptic_pattern()
    );
    // double pulse for already-checked-in
    assert_eq!(Cue::AlreadyCheckedIn.haptic_pattern().len(), 3);
    // failure pulse is the longest
    assert!(Cue::Failure.haptic_pattern()[0] > Cue::Success.haptic_pattern()[0]);
}

#[tokio::test]
async fn emit_drives_both_sinks() {
    let haptics = Arc::new(RecordingHaptics {
        patterns: Mutex::new(Vec::new()),
    });
    let tone = Arc::new(RecordingTone {
        tones: Mutex::new(Vec::new()),
    });
    let emitter = FeedbackEmitter::new(
        Arc::clone(&haptics) as Arc<dyn HapticSink>,
        Arc::clone(&tone) as Arc<dyn ToneSink>,
        true,
    );

    emitter.emit(Cue::ScanRead);
    emitter.emit(Cue::Success);
    drain_blocking_tasks().await;

    let patterns = haptics.patterns.lock().clone();
    assert!(patterns.contains(&vec![40]));
    assert!(patterns.contains(&vec![80]));

    let tones = tone.tones.lock().clone();
    assert!(tones.contains(&(1200, 80)));
    assert!(tones.contains(&(1600, 120)));
}

#[tokio::test]
async fn sink_failures_are_swallowed() {
    let emitter = FeedbackEmitter::new(Arc::new(FailingSink), Arc::new(FailingSink), true);

    // must not panic the runtime or surface anywhere
    emitter.emit(Cue::ScanRead);
    emitter.emit(Cue::Failure);
    drain_blocking_tasks().await;
}

#[tokio::test]
async fn disabled_emitter_stays_silent() {
    let haptics = Arc::new(RecordingHaptics {
        patterns: Mutex::new(Vec::new()),
    });
    let emitter = FeedbackEmitter::new(
        Arc::clone(&haptics) as Arc<dyn HapticSink>,
        Arc::new(NullTone),
        false,
    );

    emitter.emit(Cue::Success);
    drain_blocking_tasks().await;
    assert!(haptics.patterns.lock().is_empty());
}
