use crate::config::CameraConfig;
use crate::error::{CameraError, Result};
use crate::frame::{FrameData, FrameFormat};
use crate::frame_well::FrameWell;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing::{debug, error, info, trace, warn};

#[cfg(all(target_os = "linux", feature = "camera"))]
use gstreamer::prelude::*;
#[cfg(all(target_os = "linux", feature = "camera"))]
use gstreamer::Pipeline;
#[cfg(all(target_os = "linux", feature = "camera"))]
use gstreamer_app::AppSink;
#[cfg(all(target_os = "linux", feature = "camera"))]
use gstreamer_video::VideoInfo;

/// Synthetic devices available on development hosts without real capture
#[cfg(not(all(target_os = "linux", feature = "camera")))]
const MOCK_DEVICE_COUNT: u32 = 4;

/// Camera session manager: owns the capture device for the lifetime of one
/// scan session and feeds frames into the shared frame well.
///
/// `stop_capture` is idempotent and safe after a failed start; a missed
/// release permanently locks the device on many platforms, so every exit
/// path of the enclosing session must run it.
pub struct CameraSession {
    config: CameraConfig,
    frame_counter: Arc<AtomicU64>,
    is_running: Arc<AtomicBool>,
    #[cfg(all(target_os = "linux", feature = "camera"))]
    pipeline: Option<Pipeline>,
    capture_task: Arc<tokio::sync::Mutex<Option<tokio::task::JoinHandle<()>>>>,
}

impl CameraSession {
    /// Create a new camera session for the configured device
    pub async fn new(config: CameraConfig) -> Result<Self> {
        info!(
            "Initializing camera session for device {} ({}x{} @ {}fps)",
            config.index, config.resolution.0, config.resolution.1, config.fps
        );

        #[cfg(all(target_os = "linux", feature = "camera"))]
        {
            gstreamer::init().map_err(|e| CameraError::Configuration {
                details: format!("Failed to initialize GStreamer: {}", e),
            })?;
        }

        let mut session = Self {
            config,
            frame_counter: Arc::new(AtomicU64::new(0)),
            is_running: Arc::new(AtomicBool::new(false)),
            #[cfg(all(target_os = "linux", feature = "camera"))]
            pipeline: None,
            capture_task: Arc::new(tokio::sync::Mutex::new(None)),
        };

        session.initialize_pipeline().await?;

        Ok(session)
    }

    #[cfg(all(target_os = "linux", feature = "camera"))]
    async fn initialize_pipeline(&mut self) -> Result<()> {
        let pipeline_desc = self.build_pipeline_string();

        info!("Creating capture pipeline: {}", pipeline_desc);

        let pipeline = gstreamer::parse::launch(&pipeline_desc)
            .map_err(|e| CameraError::Configuration {
                details: format!("Failed to create pipeline: {}", e),
            })?
            .downcast::<Pipeline>()
            .map_err(|_| CameraError::Configuration {
                details: "Failed to downcast to Pipeline".to_string(),
            })?;

        self.pipeline = Some(pipeline);

        Ok(())
    }

    /// GRAY8 raw capture: the native detector reads luma directly, no
    /// per-frame decompression step.
    #[cfg(all(target_os = "linux", feature = "camera"))]
    fn build_pipeline_string(&self) -> String {
        let (width, height) = self.config.resolution;
        let fps = self.config.fps;
        let device_index = self.config.index;

        format!(
            "v4l2src device=/dev/video{} io-mode=mmap do-timestamp=true ! \
             videoconvert ! video/x-raw,format=GRAY8,width={},height={},framerate={}/1 ! \
             queue max-size-buffers=4 leaky=downstream ! \
             appsink name=sink sync=false max-buffers=4 drop=true enable-last-sample=false emit-signals=false",
            device_index, width, height, fps
        )
    }

    #[cfg(not(all(target_os = "linux", feature = "camera")))]
    async fn initialize_pipeline(&mut self) -> Result<()> {
        warn!("Hardware capture is only available on Linux with the camera feature; using synthetic frames");
        Ok(())
    }

    /// Start camera capture into the given frame well
    pub async fn start_capture(&self, well: Arc<FrameWell>) -> Result<()> {
        if self.is_running.load(Ordering::Relaxed) {
            warn!("Camera capture is already running");
            return Ok(());
        }

        info!("Starting camera capture");
        self.is_running.store(true, Ordering::Relaxed);

        let start_result = self.run_capture_loop(well).await;
        if start_result.is_err() {
            self.is_running.store(false, Ordering::Relaxed);
        }
        start_result
    }

    #[cfg(all(target_os = "linux", feature = "camera"))]
    async fn run_capture_loop(&self, well: Arc<FrameWell>) -> Result<()> {
        let pipeline = match &self.pipeline {
            Some(pipeline) => pipeline.clone(),
            None => {
                return Err(CameraError::Configuration {
                    details: "Pipeline not initialized".to_string(),
                }
                .into());
            }
        };

        let is_running = Arc::clone(&self.is_running);
        let capture_task = Arc::clone(&self.capture_task);
        let frame_counter = Arc::clone(&self.frame_counter);
        let device = format!("/dev/video{}", self.config.index);

        // A permission or missing-device problem shows up as a refusal to
        // enter the Playing state; surface that as a camera access error
        // before spawning the loop.
        if let Err(e) = pipeline.set_state(gstreamer::State::Playing) {
            let _ = pipeline.set_state(gstreamer::State::Null);
            return Err(CameraError::AccessDenied {
                device,
                details: e.to_string(),
            }
            .into());
        }

        let task = tokio::spawn(async move {
            let appsink = match pipeline.by_name("sink") {
                Some(sink) => match sink.downcast::<AppSink>() {
                    Ok(appsink) => appsink,
                    Err(_) => {
                        error!("Capture element is not an appsink");
                        return;
                    }
                },
                None => {
                    error!("Capture pipeline has no appsink");
                    return;
                }
            };

            let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
            let mut last_sample_time = tokio::time::Instant::now();
            let mut watchdog_interval = tokio::time::interval(Duration::from_secs(1));
            let watchdog_timeout = Duration::from_secs(5);

            appsink.set_callbacks(
                gstreamer_app::AppSinkCallbacks::builder()
                    .new_sample(move |appsink| {
                        let sample = appsink
                            .pull_sample()
                            .map_err(|_| gstreamer::FlowError::Eos)?;
                        let _ = tx.send(sample);
                        Ok(gstreamer::FlowSuccess::Ok)
                    })
                    .build(),
            );

            info!("Capture pipeline started");

            while is_running.load(Ordering::Relaxed) {
                tokio::select! {
                    sample = rx.recv() => {
                        if let Some(sample) = sample {
                            if let Err(e) = Self::process_sample(sample, &frame_counter, &well).await {
                                error!("Error processing capture sample: {}", e);
                            }
                            last_sample_time = tokio::time::Instant::now();
                        }
                    }
                    _ = watchdog_interval.tick() => {
                        if last_sample_time.elapsed() >= watchdog_timeout {
                            warn!(
                                "No camera frames received for {:?}; restarting pipeline",
                                watchdog_timeout
                            );
                            let _ = pipeline.set_state(gstreamer::State::Null);
                            if let Err(e) = pipeline.set_state(gstreamer::State::Playing) {
                                error!("Failed to restart capture pipeline: {}", e);
                            } else {
                                last_sample_time = tokio::time::Instant::now();
                            }
                        }
                    }
                    _ = tokio::time::sleep(Duration::from_millis(100)) => {
                        // periodic shutdown check
                    }
                }
            }

            let _ = pipeline.set_state(gstreamer::State::Null);
            info!("Capture loop stopped");
        });

        *capture_task.lock().await = Some(task);
        Ok(())
    }

    #[cfg(all(target_os = "linux", feature = "camera"))]
    async fn process_sample(
        sample: gstreamer::Sample,
        frame_counter: &Arc<AtomicU64>,
        well: &Arc<FrameWell>,
    ) -> Result<()> {
        let buffer = sample.buffer().ok_or_else(|| CameraError::CaptureStream {
            details: "No buffer in sample".to_string(),
        })?;

        let caps = sample.caps().ok_or_else(|| CameraError::CaptureStream {
            details: "No caps in sample".to_string(),
        })?;

        let video_info = VideoInfo::from_caps(caps).map_err(|e| CameraError::CaptureStream {
            details: format!("Failed to get video info: {}", e),
        })?;

        let width = video_info.width();
        let height = video_info.height();

        let map = buffer
            .map_readable()
            .map_err(|e| CameraError::CaptureStream {
                details: format!("Failed to map buffer: {}", e),
            })?;

        let frame_id = frame_counter.fetch_add(1, Ordering::Relaxed);
        let frame = FrameData::new(
            frame_id,
            SystemTime::now(),
            map.as_slice().to_vec(),
            width,
            height,
            FrameFormat::Gray8,
        );

        trace!(
            "Captured GRAY8 frame {} ({}x{}, {} bytes)",
            frame_id,
            width,
            height,
            map.len()
        );

        well.push_frame(frame).await;

        Ok(())
    }

    /// Synthetic capture loop for hosts without real camera hardware
    #[cfg(not(all(target_os = "linux", feature = "camera")))]
    async fn run_capture_loop(&self, well: Arc<FrameWell>) -> Result<()> {
        if self.config.index >= MOCK_DEVICE_COUNT {
            return Err(CameraError::DeviceOpen {
                device: format!("/dev/video{}", self.config.index),
                details: "no such device".to_string(),
            }
            .into());
        }

        let config = self.config.clone();
        let is_running = Arc::clone(&self.is_running);
        let capture_task = Arc::clone(&self.capture_task);
        let frame_counter = Arc::clone(&self.frame_counter);

        let task = tokio::spawn(async move {
            let frame_interval = Duration::from_millis(1000 / config.fps.max(1) as u64);
            let mut interval_timer = tokio::time::interval(frame_interval);

            info!("Synthetic capture loop started");

            while is_running.load(Ordering::Relaxed) {
                interval_timer.tick().await;

                if !is_running.load(Ordering::Relaxed) {
                    break;
                }

                let frame_id = frame_counter.fetch_add(1, Ordering::Relaxed);
                let (width, height) = config.resolution;

                // Flat gray field with a per-frame brightness ramp; contains
                // no code, so decoders treat every frame as a miss.
                let shade = (frame_id % 200) as u8 + 20;
                let data = vec![shade; (width * height) as usize];

                let frame = FrameData::new(
                    frame_id,
                    SystemTime::now(),
                    data,
                    width,
                    height,
                    FrameFormat::Gray8,
                );

                trace!("Generated synthetic frame {} ({}x{})", frame_id, width, height);
                well.push_frame(frame).await;
            }

            info!("Synthetic capture loop stopped");
        });

        *capture_task.lock().await = Some(task);
        Ok(())
    }

    /// Stop camera capture and release the device.
    /// Idempotent; never fails, including after a failed start.
    pub async fn stop_capture(&self) {
        if !self.is_running.swap(false, Ordering::Relaxed) {
            debug!("Camera capture is not running");
            // A failed start may still have spawned nothing; fall through to
            // clear any stale task handle.
        } else {
            info!("Stopping camera capture");
        }

        if let Some(task) = self.capture_task.lock().await.take() {
            match tokio::time::timeout(Duration::from_secs(3), task).await {
                Ok(Ok(())) => {
                    info!("Capture task completed");
                }
                Ok(Err(e)) => {
                    error!("Error waiting for capture task: {}", e);
                }
                Err(_) => {
                    warn!("Capture task did not complete within timeout");
                }
            }
        }

        #[cfg(all(target_os = "linux", feature = "camera"))]
        {
            if let Some(pipeline) = &self.pipeline {
                let _ = pipeline.set_state(gstreamer::State::Null);
            }
        }
    }

    /// Check if the camera is currently capturing
    pub fn is_capturing(&self) -> bool {
        self.is_running.load(Ordering::Relaxed)
    }

    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    /// Frames captured so far in this session
    pub fn frame_count(&self) -> u64 {
        self.frame_counter.load(Ordering::Relaxed)
    }
}
