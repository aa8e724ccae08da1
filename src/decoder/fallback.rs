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

/// Managed polling decode path used where no native detector exists.
///
/// Owns its own timing loop between `start` and `stop` and invokes the sink
/// once per decoded payload. Unlike the native path it does not consult the
/// gate; duplicate handling happens entirely downstream. It also performs
/// its own JPEG-to-luma conversion for compressed frames.
pub struct PollingDecoder {
    poll_interval: Duration,
    is_running: Arc<AtomicBool>,
    loop_task: tokio::sync::Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl PollingDecoder {
    pub fn new(poll_ms: u64) -> Self {
        Self {
            poll_interval: Duration::from_millis(poll_ms.max(1)),
            is_running: Arc::new(AtomicBool::new(false)),
            loop_task: tokio::sync::Mutex::new(None),
        }
    }
}

#[async_trait]
impl DecodeBackend for PollingDecoder {
    fn kind(&self) -> BackendKind {
        BackendKind::Fallback
    }

    async fn start(
        &self,
        well: Arc<FrameWell>,
        sink: mpsc::Sender<String>,
        _gate: Arc<DedupGate>,
    ) -> Result<()> {
        if self.is_running.swap(true, Ordering::Relaxed) {
            warn!("Polling decoder is already running");
            return Ok(());
        }

        info!(
            "Starting polling decoder (interval {:?})",
            self.poll_interval
        );

        let is_running = Arc::clone(&self.is_running);
        let poll_interval = self.poll_interval;

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(poll_interval);
            let mut last_seen_frame: Option<u64> = None;

            while is_running.load(Ordering::Relaxed) {
                interval.tick().await;

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
                        trace!("Polling decoder decoded payload from frame {}", frame.id);
                        if sink.send(payload).await.is_err() {
                            debug!("Decode sink closed, stopping polling loop");
                            break;
                        }
                    }
                    Ok(None) => {
                        // transient miss
                    }
                    Err(e) => {
                        warn!("Decode task failed: {}", e);
                    }
                }
            }

            info!("Polling decoder stopped");
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
                Ok(Err(e)) => warn!("Polling decoder join error: {}", e),
                Err(_) => warn!("Polling decoder did not stop within timeout"),
            }
        }
    }
}
