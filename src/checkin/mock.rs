use super::{CheckInApi, CheckInResult, EventDetail, Guest, GENERIC_FAILURE_MESSAGE};
use crate::scan::ScanToken;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tracing::debug;

/// Scripted check-in collaborator for tests and development hosts.
///
/// Outcomes are consumed in FIFO order; when the script runs dry every token
/// fails with the generic message. An optional latency simulates the
/// in-flight window of a real network call.
pub struct MockCheckInApi {
    outcomes: Mutex<VecDeque<CheckInResult>>,
    calls: Mutex<Vec<ScanToken>>,
    events: Mutex<HashMap<i64, EventDetail>>,
    latency: Mutex<Duration>,
}

impl MockCheckInApi {
    pub fn new() -> Self {
        Self {
            outcomes: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            events: Mutex::new(HashMap::new()),
            latency: Mutex::new(Duration::ZERO),
        }
    }

    /// Queue the outcome for the next check-in call
    pub fn push_outcome(&self, outcome: CheckInResult) {
        self.outcomes.lock().push_back(outcome);
    }

    /// Register an event for `event_detail` lookups
    pub fn set_event(&self, event: EventDetail) {
        self.events.lock().insert(event.id, event);
    }

    /// Delay every check-in response by `latency`
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = latency;
    }

    /// Tokens received so far, in call order
    pub fn calls(&self) -> Vec<ScanToken> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Convenience: a success outcome for a named guest
    pub fn success(name: &str, plus_ones: u32, event_id: Option<i64>) -> CheckInResult {
        CheckInResult::Success {
            guest: Guest {
                id: 1,
                name: name.to_string(),
                category: Some("General".to_string()),
                plus_ones,
                checked_in: true,
                checked_in_at: None,
                wristband_color: None,
                event_id,
            },
            event: None,
        }
    }
}

impl Default for MockCheckInApi {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CheckInApi for MockCheckInApi {
    async fn check_in(&self, token: &ScanToken) -> CheckInResult {
        self.calls.lock().push(token.clone());

        let latency = *self.latency.lock();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        match self.outcomes.lock().pop_front() {
            Some(outcome) => outcome,
            None => {
                debug!("Mock check-in script exhausted for {}", token);
                CheckInResult::Failure {
                    message: GENERIC_FAILURE_MESSAGE.to_string(),
                }
            }
        }
    }

    async fn event_detail(&self, event_id: i64) -> Option<EventDetail> {
        self.events.lock().get(&event_id).cloned()
    }
}
