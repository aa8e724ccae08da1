#![allow(dead_code)]

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GatescanConfig {
    pub camera: CameraConfig,
    pub decoder: DecoderConfig,
    pub gate: GateConfig,
    pub checkin: CheckInConfig,
    pub feedback: FeedbackConfig,
    pub overlay: OverlayConfig,
    pub system: SystemConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CameraConfig {
    /// Camera device index (e.g., 0 for /dev/video0)
    #[serde(default = "default_camera_index")]
    pub index: u32,

    /// Camera resolution (width, height)
    #[serde(default = "default_camera_resolution")]
    pub resolution: (u32, u32),

    /// Frames per second
    #[serde(default = "default_camera_fps")]
    pub fps: u32,
}

/// Which decode backend to use for a scan session.
/// "auto" resolves once at session start and never re-branches mid-session.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DecoderConfig {
    /// Backend selection: "auto", "native", or "fallback"
    #[serde(default = "default_decoder_backend")]
    pub backend: String,

    /// Poll interval of the fallback decoder in milliseconds
    #[serde(default = "default_fallback_poll_ms")]
    pub fallback_poll_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GateConfig {
    /// Window during which a repeat of the last admitted token is suppressed
    #[serde(default = "default_duplicate_window_ms")]
    pub duplicate_window_ms: u64,

    /// Hold on the processing lock after an already-checked-in outcome
    #[serde(default = "default_already_cooldown_ms")]
    pub already_checked_in_cooldown_ms: u64,

    /// Hold on the processing lock after a failed check-in
    #[serde(default = "default_failure_cooldown_ms")]
    pub failure_cooldown_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CheckInConfig {
    /// Base URL of the guest-management API
    #[serde(default = "default_checkin_base_url")]
    pub base_url: String,

    /// Request timeout in milliseconds
    #[serde(default = "default_checkin_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FeedbackConfig {
    /// Enable haptic/audio cues
    #[serde(default = "default_feedback_enabled")]
    pub enabled: bool,

    /// Sysfs timed-output vibrator path
    #[serde(default = "default_haptic_device")]
    pub haptic_device: String,

    /// Evdev beeper device path
    #[serde(default = "default_beeper_device")]
    pub beeper_device: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OverlayConfig {
    /// Auto-dismiss delay for the success overlay in milliseconds
    #[serde(default = "default_overlay_dismiss_ms")]
    pub dismiss_ms: u64,

    /// Wristband color used when neither guest nor event specifies one
    #[serde(default = "default_fallback_wristband")]
    pub fallback_wristband: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SystemConfig {
    /// Frame well capacity (number of frame slots)
    #[serde(default = "default_frame_well_capacity")]
    pub frame_well_capacity: usize,

    /// Event bus capacity
    #[serde(default = "default_event_bus_capacity")]
    pub event_bus_capacity: usize,

    /// Enable the operator keyboard console
    #[serde(default = "default_console_enabled")]
    pub console_enabled: bool,
}

impl GatescanConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("gatescan.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default("camera.index", default_camera_index())?
            .set_default(
                "camera.resolution",
                vec![default_camera_resolution().0, default_camera_resolution().1],
            )?
            .set_default("camera.fps", default_camera_fps())?
            .set_default("decoder.backend", default_decoder_backend())?
            .set_default("decoder.fallback_poll_ms", default_fallback_poll_ms())?
            .set_default("gate.duplicate_window_ms", default_duplicate_window_ms())?
            .set_default(
                "gate.already_checked_in_cooldown_ms",
                default_already_cooldown_ms(),
            )?
            .set_default("gate.failure_cooldown_ms", default_failure_cooldown_ms())?
            .set_default("checkin.base_url", default_checkin_base_url())?
            .set_default("checkin.timeout_ms", default_checkin_timeout_ms())?
            .set_default("feedback.enabled", default_feedback_enabled())?
            .set_default("feedback.haptic_device", default_haptic_device())?
            .set_default("feedback.beeper_device", default_beeper_device())?
            .set_default("overlay.dismiss_ms", default_overlay_dismiss_ms())?
            .set_default("overlay.fallback_wristband", default_fallback_wristband())?
            .set_default(
                "system.frame_well_capacity",
                default_frame_well_capacity() as i64,
            )?
            .set_default(
                "system.event_bus_capacity",
                default_event_bus_capacity() as i64,
            )?
            .set_default("system.console_enabled", default_console_enabled())?
            .add_source(File::with_name(&path_str).required(false))
            .add_source(Environment::with_prefix("GATESCAN").separator("_"))
            .build()?;

        let config: GatescanConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.camera.resolution.0 == 0 || self.camera.resolution.1 == 0 {
            return Err(ConfigError::Message(
                "Camera resolution must be greater than 0".to_string(),
            ));
        }

        if self.camera.fps == 0 {
            return Err(ConfigError::Message(
                "Camera fps must be greater than 0".to_string(),
            ));
        }

        match self.decoder.backend.as_str() {
            "auto" | "native" | "fallback" => {}
            other => {
                return Err(ConfigError::Message(format!(
                    "Unknown decoder backend '{}', expected auto, native, or fallback",
                    other
                )));
            }
        }

        if self.decoder.fallback_poll_ms == 0 {
            return Err(ConfigError::Message(
                "Fallback poll interval must be greater than 0".to_string(),
            ));
        }

        if self.gate.duplicate_window_ms == 0 {
            return Err(ConfigError::Message(
                "Duplicate window must be greater than 0".to_string(),
            ));
        }

        if self.checkin.base_url.is_empty() {
            return Err(ConfigError::Message(
                "Check-in base URL must not be empty".to_string(),
            ));
        }

        if !self.checkin.base_url.starts_with("http://")
            && !self.checkin.base_url.starts_with("https://")
        {
            return Err(ConfigError::Message(
                "Check-in base URL must be an http(s) URL".to_string(),
            ));
        }

        if self.checkin.timeout_ms == 0 {
            return Err(ConfigError::Message(
                "Check-in timeout must be greater than 0".to_string(),
            ));
        }

        if self.overlay.dismiss_ms == 0 {
            return Err(ConfigError::Message(
                "Overlay dismiss delay must be greater than 0".to_string(),
            ));
        }

        if self.system.frame_well_capacity == 0 {
            return Err(ConfigError::Message(
                "Frame well capacity must be greater than 0".to_string(),
            ));
        }

        if self.system.event_bus_capacity == 0 {
            return Err(ConfigError::Message(
                "Event bus capacity must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for GatescanConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig {
                index: default_camera_index(),
                resolution: default_camera_resolution(),
                fps: default_camera_fps(),
            },
            decoder: DecoderConfig {
                backend: default_decoder_backend(),
                fallback_poll_ms: default_fallback_poll_ms(),
            },
            gate: GateConfig {
                duplicate_window_ms: default_duplicate_window_ms(),
                already_checked_in_cooldown_ms: default_already_cooldown_ms(),
                failure_cooldown_ms: default_failure_cooldown_ms(),
            },
            checkin: CheckInConfig {
                base_url: default_checkin_base_url(),
                timeout_ms: default_checkin_timeout_ms(),
            },
            feedback: FeedbackConfig {
                enabled: default_feedback_enabled(),
                haptic_device: default_haptic_device(),
                beeper_device: default_beeper_device(),
            },
            overlay: OverlayConfig {
                dismiss_ms: default_overlay_dismiss_ms(),
                fallback_wristband: default_fallback_wristband(),
            },
            system: SystemConfig {
                frame_well_capacity: default_frame_well_capacity(),
                event_bus_capacity: default_event_bus_capacity(),
                console_enabled: default_console_enabled(),
            },
        }
    }
}

// Default value functions
fn default_camera_index() -> u32 {
    0
}
fn default_camera_resolution() -> (u32, u32) {
    (1280, 720)
}
fn default_camera_fps() -> u32 {
    30
}

fn default_decoder_backend() -> String {
    "auto".to_string()
}
fn default_fallback_poll_ms() -> u64 {
    200
}

fn default_duplicate_window_ms() -> u64 {
    1500
}
fn default_already_cooldown_ms() -> u64 {
    1500
}
fn default_failure_cooldown_ms() -> u64 {
    2000
}

fn default_checkin_base_url() -> String {
    "http://localhost:8000/api".to_string()
}
fn default_checkin_timeout_ms() -> u64 {
    5000
}

fn default_feedback_enabled() -> bool {
    true
}
fn default_haptic_device() -> String {
    "/sys/class/timed_output/vibrator/enable".to_string()
}
fn default_beeper_device() -> String {
    "/dev/input/by-path/platform-pcspkr-event-spkr".to_string()
}

fn default_overlay_dismiss_ms() -> u64 {
    4000
}
fn default_fallback_wristband() -> String {
    "blue".to_string()
}

fn default_frame_well_capacity() -> usize {
    8
}
fn default_event_bus_capacity() -> usize {
    100
}
fn default_console_enabled() -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = GatescanConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.gate.duplicate_window_ms, 1500);
        assert_eq!(config.gate.failure_cooldown_ms, 2000);
        assert_eq!(config.overlay.dismiss_ms, 4000);
        assert_eq!(config.camera.resolution, (1280, 720));
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let config =
            GatescanConfig::load_from_file("/nonexistent/gatescan.toml").expect("defaults load");
        assert_eq!(config.decoder.backend, "auto");
        assert_eq!(config.camera.fps, 30);
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("temp config file");
        writeln!(
            file,
            "[gate]\nduplicate_window_ms = 900\n\n[checkin]\nbase_url = \"https://venue.example/api\"\n"
        )
        .unwrap();

        let config = GatescanConfig::load_from_file(file.path()).expect("config loads");
        assert_eq!(config.gate.duplicate_window_ms, 900);
        assert_eq!(config.checkin.base_url, "https://venue.example/api");
        // untouched sections keep defaults
        assert_eq!(config.gate.failure_cooldown_ms, 2000);
    }

    #[test]
    fn test_config_validation() {
        let mut config = GatescanConfig::default();

        config.camera.resolution = (0, 0);
        assert!(config.validate().is_err());
        config.camera.resolution = (1280, 720);
        assert!(config.validate().is_ok());

        config.decoder.backend = "hardware".to_string();
        assert!(config.validate().is_err());
        config.decoder.backend = "fallback".to_string();
        assert!(config.validate().is_ok());

        config.checkin.base_url = "ftp://nope".to_string();
        assert!(config.validate().is_err());
        config.checkin.base_url = "http://localhost:8000".to_string();
        assert!(config.validate().is_ok());
    }
}
