
use crate::checkin::{EventDetail, Guest};
use crate::config::OverlayConfig;
use crate::events::{EventBus, GatescanEvent};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Wristband color precedence: guest override, then event default, then the
/// configured fallback.
pub fn resolve_wristband(guest: &Guest, event: Option<&EventDetail>, fallback: &str) -> String {
    guest
        .wristband_color
        .clone()
        .or_else(|| event.and_then(|e| e.wristband_color.clone()))
        .unwrap_or_else(|| fallback.to_string())
}

/// Transient success card shown after a fresh check-in
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayCard {
    pub guest_name: String,
    pub category: Option<String>,
    pub plus_ones: u32,
    pub wristband: String,
    pub event_name: Option<String>,
    pub shown_at: DateTime<Utc>,
}

/// Result presentation controller.
///
/// Holds at most one visible card. Each card gets an auto-dismiss timer;
/// the timer captures the card's generation so a stale timer can never
/// clear a newer card that replaced it. Manual dismissal bumps the
/// generation, cancelling any pending timer.
pub struct OverlayController {
    card: Arc<RwLock<Option<OverlayCard>>>,
    generation: Arc<AtomicU64>,
    dismiss_after: Duration,
    fallback_wristband: String,
    event_bus: Arc<EventBus>,
}

impl OverlayController {
    pub fn new(config: &OverlayConfig, event_bus: Arc<EventBus>) -> Self {
        Self {
            card: Arc::new(RwLock::new(None)),
            generation: Arc::new(AtomicU64::new(0)),
            dismiss_after: Duration::from_millis(config.dismiss_ms),
            fallback_wristband: config.fallback_wristband.clone(),
            event_bus,
        }
    }

    /// Show the success card for a guest, replacing any visible card and
    /// scheduling auto-dismiss. Never blocks the scan pipeline.
    pub async fn show(&self, guest: &Guest, event: Option<&EventDetail>) {
        let card = OverlayCard {
            guest_name: guest.name.clone(),
            category: guest.category.clone(),
            plus_ones: guest.plus_ones,
            wristband: resolve_wristband(guest, event, &self.fallback_wristband),
            event_name: event.map(|e| e.name.clone()),
            shown_at: Utc::now(),
        };

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        *self.card.write().await = Some(card.clone());

        info!(
            "Overlay: {} ({}) +{} wristband {}",
            card.guest_name,
            card.category.as_deref().unwrap_or("-"),
            card.plus_ones,
            card.wristband
        );
        let _ = self
            .event_bus
            .publish(GatescanEvent::OverlayShown {
                guest_name: card.guest_name.clone(),
                timestamp: SystemTime::now(),
            })
            .await;

        let card_slot = Arc::clone(&self.card);
        let generation_counter = Arc::clone(&self.generation);
        let event_bus = Arc::clone(&self.event_bus);
        let dismiss_after = self.dismiss_after;

        tokio::spawn(async move {
            tokio::time::sleep(dismiss_after).await;

            if generation_counter.load(Ordering::SeqCst) != generation {
                debug!("Auto-dismiss timer superseded, ignoring");
                return;
            }

            let mut slot = card_slot.write().await;
            if slot.take().is_some() {
                let _ = event_bus
                    .publish(GatescanEvent::OverlayDismissed {
                        auto: true,
                        timestamp: SystemTime::now(),
                    })
                    .await;
            }
        });
    }

    /// Operator close. Returns whether a card was visible.
    pub async fn dismiss(&self) -> bool {
        // bump the generation first so a pending timer stands down
        self.generation.fetch_add(1, Ordering::SeqCst);

        let was_visible = self.card.write().await.take().is_some();
        if was_visible {
            let _ = self
                .event_bus
                .publish(GatescanEvent::OverlayDismissed {
                    auto: false,
                    timestamp: SystemTime::now(),
                })
                .await;
        }
        was_visible
    }

    /// Currently visible card, if any
    pub async fn current(&self) -> Option<OverlayCard> {
        self.card.read().await.clone()
    }

    pub fn dismiss_after(&self) -> Duration {
        self.dismiss_after
    }
}
