use crate::camera::CameraSession;
use crate::checkin::{CheckInApi, CheckInResult, EventDetail};
use crate::config::GatescanConfig;
use crate::decoder::{create_backend, BackendKind, DecodeBackend};
use crate::error::{GatescanError, Result};
use crate::events::{EventBus, GatescanEvent};
use crate::feedback::{Cue, FeedbackEmitter};
use crate::frame_well::FrameWell;
use crate::overlay::OverlayController;
use crate::scan::gate::{Admission, DedupGate};
use crate::scan::token::ScanToken;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

/// Token-processing stage of a scan session: normalize, gate, check in,
/// route the outcome. Holds no camera or decoder state, so it is driven the
/// same way by either backend (and by tests).
pub struct ScanPipeline {
    gate: Arc<DedupGate>,
    api: Arc<dyn CheckInApi>,
    feedback: Arc<FeedbackEmitter>,
    overlay: Arc<OverlayController>,
    event_bus: Arc<EventBus>,
    session_running: Arc<AtomicBool>,
    already_checked_in_cooldown: Duration,
    failure_cooldown: Duration,
}

impl ScanPipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        gate: Arc<DedupGate>,
        api: Arc<dyn CheckInApi>,
        feedback: Arc<FeedbackEmitter>,
        overlay: Arc<OverlayController>,
        event_bus: Arc<EventBus>,
        session_running: Arc<AtomicBool>,
        already_checked_in_cooldown: Duration,
        failure_cooldown: Duration,
    ) -> Self {
        Self {
            gate,
            api,
            feedback,
            overlay,
            event_bus,
            session_running,
            already_checked_in_cooldown,
            failure_cooldown,
        }
    }

    pub fn gate(&self) -> Arc<DedupGate> {
        Arc::clone(&self.gate)
    }

    /// Process one decoded payload. Admission (including the processing-flag
    /// commit) happens synchronously here; the network call runs on its own
    /// task so the caller's loop is never held up.
    pub async fn handle_payload(self: Arc<Self>, raw: String) {
        let token = ScanToken::normalize(&raw);
        if token.is_empty() {
            trace!("Dropping payload that normalized to nothing");
            return;
        }

        let _ = self
            .event_bus
            .publish(GatescanEvent::TokenDecoded {
                token: token.as_str().to_string(),
                timestamp: SystemTime::now(),
            })
            .await;

        let now = tokio::time::Instant::now().into_std();
        match self.gate.admit(&token, now) {
            Admission::Suppressed(reason) => {
                // duplicates are dropped with no side effects
                trace!("Suppressed {} ({:?})", token, reason);
            }
            Admission::Admitted => {
                let _ = self
                    .event_bus
                    .publish(GatescanEvent::TokenAdmitted {
                        token: token.as_str().to_string(),
                        timestamp: SystemTime::now(),
                    })
                    .await;

                // immediate confirmation that a code was read, ahead of the
                // server outcome
                self.feedback.emit(Cue::ScanRead);

                let pipeline = Arc::clone(&self);
                tokio::spawn(async move {
                    pipeline.drive_check_in(token).await;
                });
            }
        }
    }

    /// Run the check-in call for an admitted token and route the outcome.
    /// Releases the gate exactly once, after the outcome-specific cool-down.
    async fn drive_check_in(self: Arc<Self>, token: ScanToken) {
        let result = self.api.check_in(&token).await;
        // A session stop does not cancel this task; the server has already
        // committed its state. User-facing effects are dropped instead.
        let live = self.session_running.load(Ordering::SeqCst);

        match result {
            CheckInResult::Success { guest, event } => {
                let event: Option<EventDetail> = match (event, guest.event_id) {
                    (Some(event), _) => Some(event),
                    (None, Some(event_id)) => self.api.event_detail(event_id).await,
                    (None, None) => None,
                };

                if live {
                    let _ = self
                        .event_bus
                        .publish(GatescanEvent::CheckInSucceeded {
                            guest_name: guest.name.clone(),
                            plus_ones: guest.plus_ones,
                            timestamp: SystemTime::now(),
                        })
                        .await;
                    self.feedback.emit(Cue::Success);
                    self.overlay.show(&guest, event.as_ref()).await;
                } else {
                    debug!("Discarding check-in result for {} after session stop", token);
                }

                self.gate.release();
            }
            CheckInResult::AlreadyCheckedIn { guest } => {
                if live {
                    let _ = self
                        .event_bus
                        .publish(GatescanEvent::CheckInAlreadyDone {
                            guest_name: guest.name.clone(),
                            timestamp: SystemTime::now(),
                        })
                        .await;
                    self.feedback.emit(Cue::AlreadyCheckedIn);
                } else {
                    debug!("Discarding repeat check-in for {} after session stop", token);
                }

                tokio::time::sleep(self.already_checked_in_cooldown).await;
                self.gate.release();
            }
            CheckInResult::Failure { message } => {
                if live {
                    let _ = self
                        .event_bus
                        .publish(GatescanEvent::CheckInFailed {
                            message,
                            timestamp: SystemTime::now(),
                        })
                        .await;
                    self.feedback.emit(Cue::Failure);
                } else {
                    debug!("Discarding failed check-in for {} after session stop", token);
                }

                tokio::time::sleep(self.failure_cooldown).await;
                self.gate.release();
            }
        }
    }
}

/// One active camera-to-decode pipeline instance.
///
/// Owns the camera for its lifetime. At most one session may be running per
/// scanner; `start` refuses while a previous run has not been fully torn
/// down, and `stop` is idempotent and infallible so it can sit on every
/// exit path.
pub struct ScanSession {
    id: Uuid,
    config: GatescanConfig,
    pipeline: Arc<ScanPipeline>,
    event_bus: Arc<EventBus>,
    well: Arc<FrameWell>,
    is_running: Arc<AtomicBool>,
    camera: tokio::sync::Mutex<Option<CameraSession>>,
    backend: tokio::sync::Mutex<Option<Box<dyn DecodeBackend>>>,
    backend_override: parking_lot::Mutex<Option<Box<dyn DecodeBackend>>>,
    process_task: tokio::sync::Mutex<Option<JoinHandle<()>>>,
    injector: tokio::sync::Mutex<Option<mpsc::Sender<String>>>,
    active_kind: parking_lot::Mutex<Option<BackendKind>>,
}

impl ScanSession {
    pub fn builder() -> ScanSessionBuilder {
        ScanSessionBuilder::new()
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::SeqCst)
    }

    /// Backend chosen for the current run, if any
    pub fn backend_kind(&self) -> Option<BackendKind> {
        *self.active_kind.lock()
    }

    pub fn pipeline(&self) -> Arc<ScanPipeline> {
        Arc::clone(&self.pipeline)
    }

    /// Start capture, select the decode backend, and run the pipeline.
    pub async fn start(&self) -> Result<()> {
        if self.is_running.swap(true, Ordering::SeqCst) {
            return Err(GatescanError::session(
                "scan session already active; stop it before starting a new one",
            ));
        }

        info!("Starting scan session {}", self.id);

        // Camera first: exclusive ownership for the life of the run.
        let camera = match CameraSession::new(self.config.camera.clone()).await {
            Ok(camera) => camera,
            Err(e) => {
                self.is_running.store(false, Ordering::SeqCst);
                return Err(e);
            }
        };

        if let Err(e) = camera.start_capture(Arc::clone(&self.well)).await {
            camera.stop_capture().await;
            self.is_running.store(false, Ordering::SeqCst);
            let _ = self
                .event_bus
                .publish(GatescanEvent::CameraStatusChanged {
                    connected: false,
                    timestamp: SystemTime::now(),
                })
                .await;
            return Err(e);
        }

        let _ = self
            .event_bus
            .publish(GatescanEvent::CameraStatusChanged {
                connected: true,
                timestamp: SystemTime::now(),
            })
            .await;
        *self.camera.lock().await = Some(camera);

        // One-time backend branch for this session.
        let backend = match self.backend_override.lock().take() {
            Some(backend) => backend,
            None => create_backend(&self.config.decoder, self.config.camera.fps),
        };
        let kind = backend.kind();
        *self.active_kind.lock() = Some(kind);

        let (payload_tx, mut payload_rx) = mpsc::channel::<String>(16);

        if let Err(e) = backend
            .start(
                Arc::clone(&self.well),
                payload_tx.clone(),
                self.pipeline.gate(),
            )
            .await
        {
            error!("Decode backend failed to start: {}", e);
            self.teardown().await;
            return Err(e);
        }

        *self.backend.lock().await = Some(backend);
        *self.injector.lock().await = Some(payload_tx);

        let pipeline = Arc::clone(&self.pipeline);
        let task = tokio::spawn(async move {
            while let Some(raw) = payload_rx.recv().await {
                Arc::clone(&pipeline).handle_payload(raw).await;
            }
            debug!("Payload pipeline drained");
        });
        *self.process_task.lock().await = Some(task);

        info!("Scan session {} running on {:?} backend", self.id, kind);
        Ok(())
    }

    /// Stop the session and release the camera. Idempotent; safe after a
    /// failed start. An in-flight check-in call is left to finish on its
    /// own task and its result is discarded.
    pub async fn stop(&self) {
        let was_running = self.is_running.swap(false, Ordering::SeqCst);
        if was_running {
            info!("Stopping scan session {}", self.id);
        }

        self.teardown().await;

        if was_running {
            let _ = self
                .event_bus
                .publish(GatescanEvent::CameraStatusChanged {
                    connected: false,
                    timestamp: SystemTime::now(),
                })
                .await;
        }
    }

    async fn teardown(&self) {
        self.is_running.store(false, Ordering::SeqCst);

        if let Some(backend) = self.backend.lock().await.take() {
            backend.stop().await;
        }

        // dropping the injector closes the channel and lets the pipeline
        // task drain out
        self.injector.lock().await.take();

        if let Some(task) = self.process_task.lock().await.take() {
            match tokio::time::timeout(Duration::from_secs(2), task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!("Pipeline task join error: {}", e),
                Err(_) => warn!("Pipeline task did not drain within timeout"),
            }
        }

        if let Some(camera) = self.camera.lock().await.take() {
            camera.stop_capture().await;
        }

        *self.active_kind.lock() = None;
    }

    /// Feed a raw payload into the running pipeline, as a decode would.
    /// Used by the operator console on development hosts.
    pub async fn inject_payload(&self, raw: &str) -> bool {
        let injector = self.injector.lock().await.clone();
        match injector {
            Some(tx) => tx.send(raw.to_string()).await.is_ok(),
            None => false,
        }
    }
}

/// Builder for [`ScanSession`]
pub struct ScanSessionBuilder {
    config: Option<GatescanConfig>,
    api: Option<Arc<dyn CheckInApi>>,
    event_bus: Option<Arc<EventBus>>,
    feedback: Option<Arc<FeedbackEmitter>>,
    overlay: Option<Arc<OverlayController>>,
    backend: Option<Box<dyn DecodeBackend>>,
}

impl ScanSessionBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            api: None,
            event_bus: None,
            feedback: None,
            overlay: None,
            backend: None,
        }
    }

    pub fn config(mut self, config: GatescanConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn api(mut self, api: Arc<dyn CheckInApi>) -> Self {
        self.api = Some(api);
        self
    }

    pub fn event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn feedback(mut self, feedback: Arc<FeedbackEmitter>) -> Self {
        self.feedback = Some(feedback);
        self
    }

    pub fn overlay(mut self, overlay: Arc<OverlayController>) -> Self {
        self.overlay = Some(overlay);
        self
    }

    /// Replace the selected backend for this session (tests)
    pub fn backend(mut self, backend: Box<dyn DecodeBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn build(self) -> Result<ScanSession> {
        let config = self
            .config
            .ok_or_else(|| GatescanError::component("scan_session_builder", "Config is required"))?;
        let api = self
            .api
            .ok_or_else(|| GatescanError::component("scan_session_builder", "Check-in API is required"))?;
        let event_bus = self.event_bus.ok_or_else(|| {
            GatescanError::component("scan_session_builder", "Event bus is required")
        })?;

        let feedback = self
            .feedback
            .unwrap_or_else(|| Arc::new(FeedbackEmitter::from_config(&config.feedback)));
        let overlay = self
            .overlay
            .unwrap_or_else(|| Arc::new(OverlayController::new(&config.overlay, Arc::clone(&event_bus))));

        let is_running = Arc::new(AtomicBool::new(false));
        let gate = Arc::new(DedupGate::new(Duration::from_millis(
            config.gate.duplicate_window_ms,
        )));

        let pipeline = Arc::new(ScanPipeline::new(
            gate,
            api,
            feedback,
            overlay,
            Arc::clone(&event_bus),
            Arc::clone(&is_running),
            Duration::from_millis(config.gate.already_checked_in_cooldown_ms),
            Duration::from_millis(config.gate.failure_cooldown_ms),
        ));

        let well = Arc::new(FrameWell::new(config.system.frame_well_capacity));

        Ok(ScanSession {
            id: Uuid::new_v4(),
            config,
            pipeline,
            event_bus,
            well,
            is_running,
            camera: tokio::sync::Mutex::new(None),
            backend: tokio::sync::Mutex::new(None),
            backend_override: parking_lot::Mutex::new(self.backend),
            process_task: tokio::sync::Mutex::new(None),
            injector: tokio::sync::Mutex::new(None),
            active_kind: parking_lot::Mutex::new(None),
        })
    }
}

impl Default for ScanSessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}
