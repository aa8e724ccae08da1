mod fallback;
mod native;

#[cfg(test)]
mod tests;

pub use fallback::PollingDecoder;
pub use native::NativeDetector;

use crate::config::DecoderConfig;
use crate::error::Result;
use crate::frame_well::FrameWell;
use crate::scan::DedupGate;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Which decode path a scan session runs on. Chosen once at session start,
/// never re-branched mid-session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// On-device detector driven by our own per-frame sampling loop
    Native,
    /// Managed polling decoder that owns its own timing loop
    Fallback,
}

/// A decode backend feeds raw QR payloads into the session's sink channel
/// between `start` and `stop`.
///
/// The native backend consults the gate to skip detection while a prior
/// candidate is processing; the fallback decodes unconditionally and relies
/// on the gate downstream.
#[async_trait]
pub trait DecodeBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    async fn start(
        &self,
        well: Arc<FrameWell>,
        sink: mpsc::Sender<String>,
        gate: Arc<DedupGate>,
    ) -> Result<()>;

    async fn stop(&self);
}

/// Resolve the configured backend choice against platform capability.
///
/// "auto" picks the native detector only where the raw-frame capture
/// pipeline exists; everywhere else the polling fallback runs.
pub fn select_backend(config: &DecoderConfig) -> BackendKind {
    match config.backend.as_str() {
        "native" => BackendKind::Native,
        "fallback" => BackendKind::Fallback,
        _ => {
            if cfg!(all(target_os = "linux", feature = "camera")) {
                BackendKind::Native
            } else {
                BackendKind::Fallback
            }
        }
    }
}

/// Build the backend for a session. One-time branch per session start.
pub fn create_backend(config: &DecoderConfig, camera_fps: u32) -> Box<dyn DecodeBackend> {
    match select_backend(config) {
        BackendKind::Native => Box::new(NativeDetector::new(camera_fps)),
        BackendKind::Fallback => Box::new(PollingDecoder::new(config.fallback_poll_ms)),
    }
}

/// Shared per-frame QR decode used by both backends.
///
/// Returns the first decoded payload, or `None` for any frame without a
/// readable code. Misses are routine and never surfaced.
pub(crate) fn decode_frame(frame: &crate::frame::FrameData) -> Option<String> {
    let luma = frame.to_luma()?;
    let mut prepared = rqrr::PreparedImage::prepare(luma);
    let grids = prepared.detect_grids();

    for grid in grids {
        match grid.decode() {
            Ok((_, content)) => return Some(content),
            Err(e) => {
                tracing::trace!("Grid decode failed: {:?}", e);
            }
        }
    }

    None
}
