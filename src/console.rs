use crate::error::Result;
use crate::events::{EventBus, GatescanEvent};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::runtime::Handle;
use tokio::task;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Token injected by the console on development hosts without a camera
const DEMO_TOKEN: &str = "DEMO-0001";

/// Operator keyboard console.
///
/// s = stop/restart scanner, d = dismiss overlay, SPACE = simulate a scan,
/// q/ESC = shut down. Runs in raw mode on a blocking task and talks to the
/// rest of the system through the event bus only.
pub struct KeyboardConsole {
    event_bus: Arc<EventBus>,
    cancellation_token: CancellationToken,
}

impl KeyboardConsole {
    pub fn new(event_bus: Arc<EventBus>) -> Self {
        Self {
            event_bus,
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Start listening for operator input
    pub async fn start(&self) -> Result<()> {
        info!("Starting operator console - s: scanner, d: dismiss, SPACE: simulate scan, q: quit");

        let event_bus = Arc::clone(&self.event_bus);
        let cancellation_token = self.cancellation_token.clone();
        let runtime_handle = Handle::current();

        task::spawn_blocking(move || {
            if let Err(e) = enable_raw_mode() {
                error!("Failed to enable raw mode for console input: {}", e);
                return;
            }

            debug!("Raw mode enabled - console active");

            loop {
                if cancellation_token.is_cancelled() {
                    debug!("Console input handler stopping");
                    break;
                }

                match event::poll(Duration::from_millis(100)) {
                    Ok(true) => {
                        if let Ok(Event::Key(key_event)) = event::read() {
                            if key_event.kind != KeyEventKind::Press {
                                continue;
                            }

                            let outgoing = match key_event.code {
                                KeyCode::Char('s') => Some(GatescanEvent::ScannerToggleRequested {
                                    timestamp: SystemTime::now(),
                                }),
                                KeyCode::Char('d') => Some(GatescanEvent::DismissRequested {
                                    timestamp: SystemTime::now(),
                                }),
                                KeyCode::Char(' ') => Some(GatescanEvent::ManualScanRequested {
                                    token: DEMO_TOKEN.to_string(),
                                    timestamp: SystemTime::now(),
                                }),
                                KeyCode::Char('q') | KeyCode::Esc => {
                                    Some(GatescanEvent::ShutdownRequested {
                                        timestamp: SystemTime::now(),
                                        reason: "Operator requested via console".to_string(),
                                    })
                                }
                                other => {
                                    debug!("Ignoring key: {:?}", other);
                                    None
                                }
                            };

                            let quitting = matches!(
                                outgoing,
                                Some(GatescanEvent::ShutdownRequested { .. })
                            );

                            if let Some(event) = outgoing {
                                let event_bus = Arc::clone(&event_bus);
                                runtime_handle.spawn(async move {
                                    if let Err(e) = event_bus.publish(event).await {
                                        warn!("Failed to publish console event: {}", e);
                                    }
                                });
                            }

                            if quitting {
                                break;
                            }
                        }
                    }
                    Ok(false) => {}
                    Err(e) => {
                        error!("Console poll error: {}", e);
                        break;
                    }
                }
            }

            if let Err(e) = disable_raw_mode() {
                warn!("Failed to disable raw mode: {}", e);
            }
            debug!("Console input handler exited");
        });

        Ok(())
    }

    /// Stop the console input handler
    pub async fn stop(&self) {
        self.cancellation_token.cancel();
    }
}
