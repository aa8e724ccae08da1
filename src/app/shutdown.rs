use super::{ComponentState, GatescanOrchestrator};
use crate::error::GatescanError;
use crate::error::Result;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{error, info};

impl GatescanOrchestrator {
    /// Perform graceful shutdown of all components
    pub async fn shutdown(&mut self) -> Result<i32> {
        info!("Beginning graceful shutdown");

        // Cancel background tasks (operator event loop, console poller)
        self.cancellation_token.cancel();

        let mut exit_code = 0;

        // Stop components in reverse dependency order
        if self.console_enabled {
            if let Err(e) = self.stop_component("console").await {
                error!("Error stopping console: {}", e);
                exit_code = 1;
            }
        }

        if let Err(e) = self.stop_component("scanner").await {
            error!("Error stopping scanner: {}", e);
            exit_code = 1;
        }

        if let Err(e) = self.stop_component("overlay").await {
            error!("Error stopping overlay: {}", e);
            exit_code = 1;
        }

        info!("Graceful shutdown completed with exit code: {}", exit_code);
        Ok(exit_code)
    }

    /// Stop a specific component
    async fn stop_component(&mut self, component: &str) -> Result<()> {
        info!("Stopping {} component", component);
        self.set_component_state(component, ComponentState::Stopping)
            .await;

        match component {
            "scanner" => {
                // The session releases the camera before returning; an
                // in-flight check-in is left to finish and be discarded.
                match timeout(Duration::from_secs(10), self.scan_session.stop()).await {
                    Ok(()) => {
                        self.set_component_state(component, ComponentState::Stopped)
                            .await;
                        info!("{} component stopped", component);
                        Ok(())
                    }
                    Err(_) => {
                        self.set_component_state(component, ComponentState::Failed)
                            .await;
                        error!("{} component stop timeout", component);
                        Err(GatescanError::system(format!(
                            "{} component stop timeout",
                            component
                        )))
                    }
                }
            }
            "overlay" => {
                self.overlay.dismiss().await;
                self.set_component_state(component, ComponentState::Stopped)
                    .await;
                info!("{} component stopped", component);
                Ok(())
            }
            "console" => {
                if let Some(console) = &self.console {
                    console.stop().await;
                }
                self.set_component_state(component, ComponentState::Stopped)
                    .await;
                info!("{} component stopped", component);
                Ok(())
            }
            other => {
                self.set_component_state(other, ComponentState::Stopped)
                    .await;
                Ok(())
            }
        }
    }
}
