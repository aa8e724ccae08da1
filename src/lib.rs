pub mod app;
pub mod camera;
pub mod checkin;
pub mod config;
pub mod console;
pub mod decoder;
pub mod error;
pub mod events;
pub mod feedback;
pub mod frame;
pub mod frame_well;
pub mod overlay;
pub mod scan;

pub use app::{ComponentState, GatescanOrchestrator, ShutdownReason};
pub use checkin::{CheckInApi, CheckInClient, CheckInResult, EventDetail, Guest};
pub use config::GatescanConfig;
pub use console::KeyboardConsole;
pub use decoder::{BackendKind, DecodeBackend, NativeDetector, PollingDecoder};
pub use error::{CameraError, GatescanError, Result};
pub use events::{EventBus, EventFilter, EventReceiver, GatescanEvent};
pub use feedback::{Cue, FeedbackEmitter, HapticSink, ToneSink};
pub use frame::{FrameData, FrameFormat};
pub use frame_well::FrameWell;
pub use overlay::{OverlayCard, OverlayController};
pub use scan::{Admission, DedupGate, ScanSession, ScanToken, SuppressReason};
