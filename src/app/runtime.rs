use super::{ComponentState, GatescanOrchestrator, ShutdownReason};
use crate::error::{GatescanError, Result};
use crate::events::GatescanEvent;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::{broadcast, oneshot, Mutex};
use tracing::{info, warn};

impl GatescanOrchestrator {
    /// Run the main application loop with signal handling
    pub async fn run(&mut self) -> Result<i32> {
        info!("Gatescan system is running");

        let shutdown_sender = self
            .shutdown_sender
            .take()
            .ok_or_else(|| GatescanError::system("Shutdown sender already taken"))?;

        let shutdown_receiver = self
            .shutdown_receiver
            .take()
            .ok_or_else(|| GatescanError::system("Shutdown receiver already taken"))?;

        self.setup_signal_handlers(shutdown_sender).await;
        self.spawn_operator_event_loop();

        // Wait for a signal or an operator shutdown request off the bus
        let mut bus_rx = self.event_bus.subscribe();
        let shutdown_reason = tokio::select! {
            reason = shutdown_receiver => {
                reason.map_err(|_| GatescanError::system("Shutdown channel closed unexpectedly"))?
            }
            reason = Self::wait_for_bus_shutdown(&mut bus_rx) => reason,
        };

        info!("Shutdown initiated: {:?}", shutdown_reason);

        let exit_code = self.shutdown().await?;

        info!("Gatescan system shutdown complete");
        Ok(exit_code)
    }

    async fn wait_for_bus_shutdown(
        rx: &mut broadcast::Receiver<GatescanEvent>,
    ) -> ShutdownReason {
        loop {
            match rx.recv().await {
                Ok(GatescanEvent::ShutdownRequested { reason, .. }) => {
                    return ShutdownReason::UserRequest(reason);
                }
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Runtime receiver lagged behind by {} events", n);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => {
                    return ShutdownReason::Error("event bus closed".to_string());
                }
            }
        }
    }

    /// Route operator console events to the session and overlay
    fn spawn_operator_event_loop(&self) {
        let session = Arc::clone(&self.scan_session);
        let overlay = Arc::clone(&self.overlay);
        let event_bus = Arc::clone(&self.event_bus);
        let component_states = Arc::clone(&self.component_states);
        let cancellation_token = self.cancellation_token.clone();

        tokio::spawn(async move {
            let mut rx = event_bus.subscribe();

            loop {
                tokio::select! {
                    _ = cancellation_token.cancelled() => break,
                    event = rx.recv() => match event {
                        Ok(GatescanEvent::ScannerToggleRequested { .. }) => {
                            if session.is_running() {
                                info!("Operator stop: tearing down scan session");
                                session.stop().await;
                                component_states
                                    .lock()
                                    .await
                                    .insert("scanner".to_string(), ComponentState::Stopped);
                            } else {
                                info!("Operator start: bringing up scan session");
                                match session.start().await {
                                    Ok(()) => {
                                        component_states
                                            .lock()
                                            .await
                                            .insert("scanner".to_string(), ComponentState::Running);
                                    }
                                    Err(e) => {
                                        warn!("Scanner restart failed: {}", e);
                                        component_states
                                            .lock()
                                            .await
                                            .insert("scanner".to_string(), ComponentState::Failed);
                                        let _ = event_bus
                                            .publish(GatescanEvent::SystemError {
                                                component: "scanner".to_string(),
                                                error: e.to_string(),
                                            })
                                            .await;
                                    }
                                }
                            }
                        }
                        Ok(GatescanEvent::DismissRequested { .. }) => {
                            overlay.dismiss().await;
                        }
                        Ok(GatescanEvent::ManualScanRequested { token, .. }) => {
                            if !session.inject_payload(&token).await {
                                warn!("Manual scan dropped: no active session");
                            }
                        }
                        Ok(_) => {}
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            warn!("Operator event loop lagged behind by {} events", n);
                            continue;
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            }
        });
    }

    /// Set up signal handlers for graceful shutdown
    async fn setup_signal_handlers(&self, shutdown_sender: oneshot::Sender<ShutdownReason>) {
        let shutdown_sender = Arc::new(Mutex::new(Some(shutdown_sender)));

        // Handle SIGTERM (systemd stop) - Unix only
        #[cfg(unix)]
        {
            let shutdown_sender_sigterm = Arc::clone(&shutdown_sender);
            tokio::spawn(async move {
                if let Some(()) = signal::unix::signal(signal::unix::SignalKind::terminate())
                    .expect("Failed to register SIGTERM handler")
                    .recv()
                    .await
                {
                    info!("Received SIGTERM signal");
                    if let Some(sender) = shutdown_sender_sigterm.lock().await.take() {
                        let _ = sender.send(ShutdownReason::Signal("SIGTERM".to_string()));
                    }
                }
            });
        }

        // Handle SIGINT (Ctrl+C) - Cross-platform
        let shutdown_sender_sigint = Arc::clone(&shutdown_sender);
        tokio::spawn(async move {
            if let Ok(()) = tokio::signal::ctrl_c().await {
                info!("Received SIGINT signal (Ctrl+C)");
                if let Some(sender) = shutdown_sender_sigint.lock().await.take() {
                    let _ = sender.send(ShutdownReason::Signal("SIGINT".to_string()));
                }
            }
        });
    }
}
