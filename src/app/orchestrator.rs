use super::types::ComponentState;
use crate::checkin::CheckInClient;
use crate::config::GatescanConfig;
use crate::console::KeyboardConsole;
use crate::error::Result;
use crate::events::EventBus;
use crate::feedback::FeedbackEmitter;
use crate::overlay::OverlayController;
use crate::scan::ScanSession;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};
use tokio_util::sync::CancellationToken;

/// Main application coordinator that manages all system components
pub struct GatescanOrchestrator {
    pub(super) config: GatescanConfig,
    pub(super) event_bus: Arc<EventBus>,

    // Components
    pub(super) scan_session: Arc<ScanSession>,
    pub(super) overlay: Arc<OverlayController>,
    pub(super) console: Option<KeyboardConsole>,
    pub(super) console_enabled: bool,

    // Lifecycle management
    pub(super) component_states: Arc<Mutex<HashMap<String, ComponentState>>>,
    pub(super) shutdown_sender: Option<oneshot::Sender<super::types::ShutdownReason>>,
    pub(super) shutdown_receiver: Option<oneshot::Receiver<super::types::ShutdownReason>>,
    pub(super) cancellation_token: CancellationToken,
}

impl GatescanOrchestrator {
    /// Create a new orchestrator with the given configuration
    pub async fn new(config: GatescanConfig) -> Result<Self> {
        let event_bus = Arc::new(EventBus::new(config.system.event_bus_capacity));
        let (shutdown_sender, shutdown_receiver) = oneshot::channel();

        let overlay = Arc::new(OverlayController::new(
            &config.overlay,
            Arc::clone(&event_bus),
        ));
        let feedback = Arc::new(FeedbackEmitter::from_config(&config.feedback));
        let api = Arc::new(CheckInClient::new(&config.checkin)?);

        let scan_session = Arc::new(
            ScanSession::builder()
                .config(config.clone())
                .api(api)
                .event_bus(Arc::clone(&event_bus))
                .feedback(feedback)
                .overlay(Arc::clone(&overlay))
                .build()?,
        );

        let console_enabled = config.system.console_enabled;
        let console = if console_enabled {
            Some(KeyboardConsole::new(Arc::clone(&event_bus)))
        } else {
            None
        };

        Ok(Self {
            config,
            event_bus,
            scan_session,
            overlay,
            console,
            console_enabled,
            component_states: Arc::new(Mutex::new(HashMap::new())),
            shutdown_sender: Some(shutdown_sender),
            shutdown_receiver: Some(shutdown_receiver),
            cancellation_token: CancellationToken::new(),
        })
    }

    /// Enable or disable the operator console after construction
    pub fn set_console_enabled(&mut self, enabled: bool) {
        self.console_enabled = enabled;
        if enabled && self.console.is_none() {
            self.console = Some(KeyboardConsole::new(Arc::clone(&self.event_bus)));
        } else if !enabled {
            self.console = None;
        }
    }

    pub fn config(&self) -> &GatescanConfig {
        &self.config
    }
}
