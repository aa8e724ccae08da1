use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// Events that can occur in the gatescan system
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum GatescanEvent {
    /// A QR payload was decoded from a camera frame
    TokenDecoded {
        token: String,
        timestamp: SystemTime,
    },
    /// The dedup gate admitted a token for check-in
    TokenAdmitted {
        token: String,
        timestamp: SystemTime,
    },
    /// Check-in completed: the guest is now checked in
    CheckInSucceeded {
        guest_name: String,
        plus_ones: u32,
        timestamp: SystemTime,
    },
    /// Check-in reported the guest was already checked in (soft warning)
    CheckInAlreadyDone {
        guest_name: String,
        timestamp: SystemTime,
    },
    /// Check-in was rejected or the call failed
    CheckInFailed {
        message: String,
        timestamp: SystemTime,
    },
    /// The success overlay became visible
    OverlayShown {
        guest_name: String,
        timestamp: SystemTime,
    },
    /// The success overlay was cleared (auto-dismiss or operator close)
    OverlayDismissed { auto: bool, timestamp: SystemTime },
    /// Camera connection status changed
    CameraStatusChanged {
        connected: bool,
        timestamp: SystemTime,
    },
    /// Operator requested a scanner stop/restart from the console
    ScannerToggleRequested { timestamp: SystemTime },
    /// Operator dismissed the overlay from the console
    DismissRequested { timestamp: SystemTime },
    /// Operator injected a token manually (console simulation / dev hosts)
    ManualScanRequested {
        token: String,
        timestamp: SystemTime,
    },
    /// A system error occurred in a component
    SystemError { component: String, error: String },
    /// System shutdown requested
    ShutdownRequested {
        timestamp: SystemTime,
        reason: String,
    },
}

impl GatescanEvent {
    /// Get the timestamp of the event
    pub fn timestamp(&self) -> SystemTime {
        match self {
            GatescanEvent::TokenDecoded { timestamp, .. } => *timestamp,
            GatescanEvent::TokenAdmitted { timestamp, .. } => *timestamp,
            GatescanEvent::CheckInSucceeded { timestamp, .. } => *timestamp,
            GatescanEvent::CheckInAlreadyDone { timestamp, .. } => *timestamp,
            GatescanEvent::CheckInFailed { timestamp, .. } => *timestamp,
            GatescanEvent::OverlayShown { timestamp, .. } => *timestamp,
            GatescanEvent::OverlayDismissed { timestamp, .. } => *timestamp,
            GatescanEvent::CameraStatusChanged { timestamp, .. } => *timestamp,
            GatescanEvent::ScannerToggleRequested { timestamp } => *timestamp,
            GatescanEvent::DismissRequested { timestamp } => *timestamp,
            GatescanEvent::ManualScanRequested { timestamp, .. } => *timestamp,
            GatescanEvent::SystemError { .. } => SystemTime::now(),
            GatescanEvent::ShutdownRequested { timestamp, .. } => *timestamp,
        }
    }

    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            GatescanEvent::TokenDecoded { token, .. } => {
                format!("Token decoded: {}", token)
            }
            GatescanEvent::TokenAdmitted { token, .. } => {
                format!("Token admitted: {}", token)
            }
            GatescanEvent::CheckInSucceeded {
                guest_name,
                plus_ones,
                ..
            } => {
                format!("Checked in {} (+{})", guest_name, plus_ones)
            }
            GatescanEvent::CheckInAlreadyDone { guest_name, .. } => {
                format!("{} already checked in", guest_name)
            }
            GatescanEvent::CheckInFailed { message, .. } => {
                format!("Check-in failed: {}", message)
            }
            GatescanEvent::OverlayShown { guest_name, .. } => {
                format!("Overlay shown for {}", guest_name)
            }
            GatescanEvent::OverlayDismissed { auto, .. } => {
                format!(
                    "Overlay dismissed ({})",
                    if *auto { "auto" } else { "operator" }
                )
            }
            GatescanEvent::CameraStatusChanged { connected, .. } => {
                format!(
                    "Camera {}",
                    if *connected {
                        "connected"
                    } else {
                        "disconnected"
                    }
                )
            }
            GatescanEvent::ScannerToggleRequested { .. } => {
                "Scanner toggle requested".to_string()
            }
            GatescanEvent::DismissRequested { .. } => "Overlay dismiss requested".to_string(),
            GatescanEvent::ManualScanRequested { token, .. } => {
                format!("Manual scan requested: {}", token)
            }
            GatescanEvent::SystemError { component, error } => {
                format!("Error in {}: {}", component, error)
            }
            GatescanEvent::ShutdownRequested { reason, .. } => {
                format!("Shutdown requested: {}", reason)
            }
        }
    }

    /// Get the event type as a string for filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            GatescanEvent::TokenDecoded { .. } => "token_decoded",
            GatescanEvent::TokenAdmitted { .. } => "token_admitted",
            GatescanEvent::CheckInSucceeded { .. } => "checkin_succeeded",
            GatescanEvent::CheckInAlreadyDone { .. } => "checkin_already_done",
            GatescanEvent::CheckInFailed { .. } => "checkin_failed",
            GatescanEvent::OverlayShown { .. } => "overlay_shown",
            GatescanEvent::OverlayDismissed { .. } => "overlay_dismissed",
            GatescanEvent::CameraStatusChanged { .. } => "camera_status_changed",
            GatescanEvent::ScannerToggleRequested { .. } => "scanner_toggle_requested",
            GatescanEvent::DismissRequested { .. } => "dismiss_requested",
            GatescanEvent::ManualScanRequested { .. } => "manual_scan_requested",
            GatescanEvent::SystemError { .. } => "system_error",
            GatescanEvent::ShutdownRequested { .. } => "shutdown_requested",
        }
    }
}

#[derive(Error, Debug)]
pub enum EventBusError {
    #[error("Failed to publish event: {details}")]
    PublishFailed { details: String },

    #[error("Event channel closed")]
    ChannelClosed,
}

/// Async event bus for component coordination using broadcast channels
pub struct EventBus {
    sender: broadcast::Sender<GatescanEvent>,
    debug_logging: bool,
}

impl EventBus {
    /// Create a new event bus with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            debug_logging: false,
        }
    }

    /// Create a new event bus with debug logging enabled
    pub fn with_debug_logging(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            debug_logging: true,
        }
    }

    /// Subscribe to events and get a receiver
    pub fn subscribe(&self) -> broadcast::Receiver<GatescanEvent> {
        self.sender.subscribe()
    }

    /// Publish an event to all subscribers
    pub async fn publish(&self, event: GatescanEvent) -> Result<usize, EventBusError> {
        if self.debug_logging {
            debug!("Publishing event: {}", event.description());
        }

        match &event {
            GatescanEvent::CheckInSucceeded {
                guest_name,
                plus_ones,
                ..
            } => {
                info!("Checked in {} (+{})", guest_name, plus_ones);
            }
            GatescanEvent::CheckInAlreadyDone { guest_name, .. } => {
                warn!("{} is already checked in", guest_name);
            }
            GatescanEvent::CheckInFailed { message, .. } => {
                warn!("Check-in failed: {}", message);
            }
            GatescanEvent::SystemError { component, error } => {
                error!("System error in {}: {}", component, error);
            }
            GatescanEvent::CameraStatusChanged { connected, .. } => {
                if *connected {
                    info!("Camera connected");
                } else {
                    warn!("Camera disconnected");
                }
            }
            GatescanEvent::ShutdownRequested { reason, .. } => {
                info!("Shutdown requested: {}", reason);
            }
            _ => {
                if self.debug_logging {
                    debug!("Event: {}", event.description());
                }
            }
        }

        self.sender
            .send(event)
            .map_err(|e| EventBusError::PublishFailed {
                details: e.to_string(),
            })
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    pub fn has_subscribers(&self) -> bool {
        self.sender.receiver_count() > 0
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            debug_logging: self.debug_logging,
        }
    }
}

/// Event filter for selective event handling
#[derive(Debug, Clone)]
pub enum EventFilter {
    /// Accept all events
    All,
    /// Accept only specific event types
    EventTypes(Vec<&'static str>),
}

impl EventFilter {
    /// Check if an event passes this filter
    pub fn matches(&self, event: &GatescanEvent) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::EventTypes(types) => types.contains(&event.event_type()),
        }
    }
}

/// Event receiver that applies a filter before delivering events
pub struct EventReceiver {
    receiver: broadcast::Receiver<GatescanEvent>,
    filter: EventFilter,
    name: String,
}

impl EventReceiver {
    pub fn new(
        receiver: broadcast::Receiver<GatescanEvent>,
        filter: EventFilter,
        name: String,
    ) -> Self {
        Self {
            receiver,
            filter,
            name,
        }
    }

    /// Receive the next filtered event
    pub async fn recv(&mut self) -> Result<GatescanEvent, EventBusError> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => {
                    if self.filter.matches(&event) {
                        return Ok(event);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Receiver '{}' lagged behind by {} events", self.name, n);
                    return Err(EventBusError::PublishFailed {
                        details: format!("Receiver lagged behind by {} events", n),
                    });
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("Event bus closed for receiver '{}'", self.name);
                    return Err(EventBusError::ChannelClosed);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_reaches_subscribers() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.publish(GatescanEvent::TokenAdmitted {
            token: "ABC123".to_string(),
            timestamp: SystemTime::now(),
        })
        .await
        .expect("publish");

        let event = rx.recv().await.expect("recv");
        assert_eq!(event.event_type(), "token_admitted");
    }

    #[tokio::test]
    async fn publish_without_subscribers_fails() {
        let bus = EventBus::new(16);
        let result = bus
            .publish(GatescanEvent::DismissRequested {
                timestamp: SystemTime::now(),
            })
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn filtered_receiver_skips_other_events() {
        let bus = EventBus::new(16);
        let mut rx = EventReceiver::new(
            bus.subscribe(),
            EventFilter::EventTypes(vec!["checkin_failed"]),
            "test".to_string(),
        );

        bus.publish(GatescanEvent::TokenDecoded {
            token: "X".to_string(),
            timestamp: SystemTime::now(),
        })
        .await
        .unwrap();
        bus.publish(GatescanEvent::CheckInFailed {
            message: "bad token".to_string(),
            timestamp: SystemTime::now(),
        })
        .await
        .unwrap();

        let event = rx.recv().await.expect("filtered recv");
        assert_eq!(event.event_type(), "checkin_failed");
    }
}
