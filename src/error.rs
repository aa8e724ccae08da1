use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatescanError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),

    #[error("Check-in transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Scan session error: {message}")]
    Session { message: String },

    #[error("System error: {message}")]
    System { message: String },

    #[error("Component error in {component}: {message}")]
    Component { component: String, message: String },
}

/// Camera acquisition/capture failures. Access failures are operator-visible
/// and retryable; nothing here is fatal to the process.
#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Camera access denied for {device}: {details}")]
    AccessDenied { device: String, details: String },

    #[error("Failed to open camera device {device}: {details}")]
    DeviceOpen { device: String, details: String },

    #[error("Capture stream error: {details}")]
    CaptureStream { details: String },

    #[error("Camera configuration error: {details}")]
    Configuration { details: String },
}

impl GatescanError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }

    pub fn session<S: Into<String>>(message: S) -> Self {
        Self::Session {
            message: message.into(),
        }
    }

    pub fn component<S: Into<String>>(component: S, message: S) -> Self {
        Self::Component {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Whether the operator can recover by retrying the scan session.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GatescanError::Camera(CameraError::AccessDenied { .. })
                | GatescanError::Camera(CameraError::DeviceOpen { .. })
        )
    }
}

pub type Result<T> = std::result::Result<T, GatescanError>;
