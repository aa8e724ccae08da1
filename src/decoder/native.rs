use super::{decode_frame, BackendKind, DecodeBackend};
use crate::error::Result;
use crate::frame_well::FrameWell;
use crate::scan::DedupGate;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

/// Native on-device detection path.
///
/// Runs a self-rescheduling sampling cycle at the camera frame interval and
/// performs a synchronous detect on the latest unseen frame. Detection is
/// skipped while a prior candidate is processing, but the loop itself keeps
/// running for the life of the session.
pub struct NativeDetector {
    fps: u32,
    is_running: Arc<AtomicBool>,
    loop_task: tokio::sync::Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl NativeDetector {
    pub fn new(fps: u32) -> Self {
        Self {
            fps: fps.max(1),
            is_running: Arc::new(AtomicBool::new(false)),
            loop_task: tokio::sync::Mutex::new(None),
        }
    }
}

#[async_trait]
impl DecodeBackend for NativeDetector {
    fn kind(&self) -> BackendKind {
        BackendKind::Native
    }

    async fn start(
        &self,
        well: Arc<FrameWell>,
        sink: mpsc::Sender<String>,
        gate: Arc<DedupGate>,
    ) -> Result<()> {
        if self.is_running.swap(true, Ordering::Relaxed) {
            warn!("Native detector is already running");
            return Ok(());
        }

        info!("Starting native detection loop ({} fps sampling)", self.fps);

        let is_running = Arc::clone(&self.is_running);
        let frame_interval = Duration::from_millis(1000 / self.fps as u64);

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(frame_interval);
            let mut last_seen_frame: Option<u64> = None;

            while is_running.load(Ordering::Relaxed) {
                interval.tick().await;

                // Keep sampling while a check-in is in flight; only skip the
                // detect call itself so the camera stays warm.
                if gate.is_processing() {
                    continue;
                }

                let frame = match well.latest().await {
                    Some(frame) if last_seen_frame != Some(frame.id) => frame,
                    _ => continue,
                };
                last_seen_frame = Some(frame.id);

                let decoded = {
                    let frame = frame.clone();
                    tokio::task::spawn_blocking(move || decode_frame(&frame)).await
                };

                match decoded {
                    Ok(Some(payload)) => {
                        trace!("Native detector decoded payload from frame {}", frame.id);
                        if sink.send(payload).await.is_err() {
                            debug!("Decode sink closed, stopping native loop");
                            break;
                        }
                    }
                    Ok(None) => {
                        // transient miss, keep looping
                    }
                    Err(e) => {
                        warn!("Detect task failed: {}", e);
                    }
                }
            }

            info!("Native detection loop stopped");
        });

        *self.loop_task.lock().await = Some(task);
        Ok(())
    }

    async fn stop(&self) {
        if !self.is_running.swap(false, Ordering::Relaxed) {
            return;
        }

        if let Some(task) = self.loop_task.lock().await.take() {
            match tokio::time::timeout(Duration::from_secs(2), task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("Native detection loop join error: {}", e),
                Err(_) => warn!("Native detection loop did not stop within timeout"),
            }
        }
    }
}
