use super::{ComponentState, GatescanOrchestrator};
use crate::error::Result;
use crate::events::GatescanEvent;
use tracing::{error, info, warn};

impl GatescanOrchestrator {
    /// Initialize all system components
    pub async fn initialize(&mut self) -> Result<()> {
        info!("Initializing Gatescan system components");

        let mut states = self.component_states.lock().await;
        states.insert("scanner".to_string(), ComponentState::Stopped);
        states.insert("overlay".to_string(), ComponentState::Stopped);

        if self.console_enabled {
            states.insert("console".to_string(), ComponentState::Stopped);
        }

        drop(states);

        info!("All components initialized successfully");
        Ok(())
    }

    /// Start all system components
    pub async fn start(&mut self) -> Result<()> {
        info!("Starting Gatescan system");

        // Overlay has no background work of its own; it is live as soon as
        // the session can route results into it.
        self.set_component_state("overlay", ComponentState::Running)
            .await;

        // Start the scan session (camera + decode backend + pipeline)
        self.set_component_state("scanner", ComponentState::Starting)
            .await;

        match self.scan_session.start().await {
            Ok(()) => {
                self.set_component_state("scanner", ComponentState::Running)
                    .await;
                info!("Scan session started successfully");
            }
            Err(e) if e.is_retryable() => {
                // Camera trouble is operator-visible but never fatal; the
                // console can retry the scanner once the camera is back.
                warn!("Scan session failed to start: {}", e);
                self.set_component_state("scanner", ComponentState::Failed)
                    .await;
                let _ = self
                    .event_bus
                    .publish(GatescanEvent::SystemError {
                        component: "scanner".to_string(),
                        error: e.to_string(),
                    })
                    .await;
            }
            Err(e) => {
                error!("Failed to start scan session: {}", e);
                self.set_component_state("scanner", ComponentState::Failed)
                    .await;
                return Err(e);
            }
        }

        // Start the operator console last so every earlier failure is
        // already visible on it
        if self.console_enabled {
            if let Some(console) = &self.console {
                self.set_component_state("console", ComponentState::Starting)
                    .await;

                console.start().await.map_err(|e| {
                    error!("Failed to start operator console: {}", e);
                    e
                })?;

                self.set_component_state("console", ComponentState::Running)
                    .await;
                info!("Operator console started");
            }
        }

        info!("Gatescan system started");
        Ok(())
    }
}
