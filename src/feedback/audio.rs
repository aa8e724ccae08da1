use tracing::debug;

/// Short tone output. Same contract as [`super::haptics::HapticSink`]:
/// blocking-task execution, bounded duration.
pub trait ToneSink: Send + Sync {
    fn tone(&self, freq_hz: u16, duration_ms: u64) -> std::io::Result<()>;
}

/// Evdev beeper (EV_SND/SND_TONE), e.g. the platform PC speaker device.
#[cfg(all(target_os = "linux", feature = "feedback"))]
pub struct EvdevBeeper {
    device_path: String,
}

#[cfg(all(target_os = "linux", feature = "feedback"))]
impl EvdevBeeper {
    pub fn new(device_path: impl Into<String>) -> Self {
        Self {
            device_path: device_path.into(),
        }
    }
}

#[cfg(all(target_os = "linux", feature = "feedback"))]
impl ToneSink for EvdevBeeper {
    fn tone(&self, freq_hz: u16, duration_ms: u64) -> std::io::Result<()> {
        use evdev::{Device, EventType, InputEvent, SoundType};

        let mut device = Device::open(&self.device_path)?;
        device.send_events(&[InputEvent::new(
            EventType::SOUND,
            SoundType::SND_TONE.0,
            freq_hz as i32,
        )])?;
        std::thread::sleep(std::time::Duration::from_millis(duration_ms));
        device.send_events(&[InputEvent::new(EventType::SOUND, SoundType::SND_TONE.0, 0)])?;
        Ok(())
    }
}

/// No-op sink for hosts without a beeper
pub struct NullTone;

impl ToneSink for NullTone {
    fn tone(&self, freq_hz: u16, duration_ms: u64) -> std::io::Result<()> {
        debug!("Tone {}Hz for {}ms (no device)", freq_hz, duration_ms);
        Ok(())
    }
}
