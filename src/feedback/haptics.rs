use std::fs::OpenOptions;
use std::io::Write;
use std::thread;
use std::time::Duration;
use tracing::debug;

/// Vibration output. Implementations run on a blocking task; they may sleep
/// between pattern segments but must stay bounded.
pub trait HapticSink: Send + Sync {
    /// Play an on/off millisecond pattern starting with an "on" segment.
    fn vibrate(&self, pattern: &[u64]) -> std::io::Result<()>;
}

/// Sysfs timed-output vibrator (Android-style `.../vibrator/enable`).
/// Writing a millisecond count runs the motor for that long.
pub struct TimedOutputHaptics {
    device_path: String,
}

impl TimedOutputHaptics {
    pub fn new(device_path: impl Into<String>) -> Self {
        Self {
            device_path: device_path.into(),
        }
    }
}

impl HapticSink for TimedOutputHaptics {
    fn vibrate(&self, pattern: &[u64]) -> std::io::Result<()> {
        for (i, &ms) in pattern.iter().enumerate() {
            if i % 2 == 0 {
                let mut file = OpenOptions::new().write(true).open(&self.device_path)?;
                file.write_all(ms.to_string().as_bytes())?;
            }
            // pattern segments are real time either way: motor-on for even
            // indices, gap for odd ones
            thread::sleep(Duration::from_millis(ms));
        }
        Ok(())
    }
}

/// No-op sink for hosts without a vibration motor
pub struct NullHaptics;

impl HapticSink for NullHaptics {
    fn vibrate(&self, pattern: &[u64]) -> std::io::Result<()> {
        debug!("Haptic pattern {:?} (no device)", pattern);
        Ok(())
    }
}
