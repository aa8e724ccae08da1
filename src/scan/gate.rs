use crate::scan::token::ScanToken;
use parking_lot::Mutex;
use std::time::{Duration, Instant};
use tracing::trace;

/// Why the gate dropped a candidate. Suppressed candidates produce no side
/// effects and no operator feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppressReason {
    /// A check-in call is in flight; nothing is admitted until it resolves
    InFlight,
    /// Same token as the last admission, inside the duplicate window
    DuplicateWithinWindow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    Suppressed(SuppressReason),
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted)
    }
}

/// Last-admission record plus the processing flag, kept in one value so the
/// admission check and the admission commit happen under a single lock.
#[derive(Debug)]
struct GateState {
    processing: bool,
    last_token: Option<ScanToken>,
    last_admitted_at: Option<Instant>,
}

/// Debounce and dedup gate in front of the check-in invoker.
///
/// Admits a token iff no check-in is in flight AND the token either differs
/// from the last admitted one or repeats it outside the duplicate window.
/// The caller releases the gate when the check-in resolves; outcome-specific
/// cool-downs are applied by delaying that release.
pub struct DedupGate {
    state: Mutex<GateState>,
    duplicate_window: Duration,
}

impl DedupGate {
    pub fn new(duplicate_window: Duration) -> Self {
        Self {
            state: Mutex::new(GateState {
                processing: false,
                last_token: None,
                last_admitted_at: None,
            }),
            duplicate_window,
        }
    }

    /// Decide whether a token may proceed to the check-in call.
    ///
    /// On admission the processing flag and last-admission record are updated
    /// before the lock is dropped; two near-simultaneous candidates can never
    /// both pass.
    pub fn admit(&self, token: &ScanToken, now: Instant) -> Admission {
        let mut state = self.state.lock();

        if state.processing {
            trace!("Gate: {} suppressed, check-in in flight", token);
            return Admission::Suppressed(SuppressReason::InFlight);
        }

        if let (Some(last), Some(at)) = (&state.last_token, state.last_admitted_at) {
            if last == token && now.duration_since(at) < self.duplicate_window {
                trace!("Gate: {} suppressed, duplicate within window", token);
                return Admission::Suppressed(SuppressReason::DuplicateWithinWindow);
            }
        }

        state.processing = true;
        state.last_token = Some(token.clone());
        state.last_admitted_at = Some(now);
        trace!("Gate: {} admitted", token);
        Admission::Admitted
    }

    /// Release the processing lock after a check-in resolves.
    /// Safe to call when not processing.
    pub fn release(&self) {
        self.state.lock().processing = false;
    }

    /// Whether a check-in call is currently in flight.
    pub fn is_processing(&self) -> bool {
        self.state.lock().processing
    }

    pub fn duplicate_window(&self) -> Duration {
        self.duplicate_window
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(s: &str) -> ScanToken {
        ScanToken::normalize(s)
    }

    fn gate() -> DedupGate {
        DedupGate::new(Duration::from_millis(1500))
    }

    #[test]
    fn first_token_is_admitted() {
        let g = gate();
        assert!(g.admit(&token("ABC123"), Instant::now()).is_admitted());
        assert!(g.is_processing());
    }

    #[test]
    fn repeat_within_window_is_suppressed_and_beyond_is_admitted() {
        let g = gate();
        let t0 = Instant::now();
        assert!(g.admit(&token("ABC123"), t0).is_admitted());
        g.release();

        // 500ms later: inside the window
        assert_eq!(
            g.admit(&token("ABC123"), t0 + Duration::from_millis(500)),
            Admission::Suppressed(SuppressReason::DuplicateWithinWindow)
        );
        // 1499ms: still inside
        assert_eq!(
            g.admit(&token("ABC123"), t0 + Duration::from_millis(1499)),
            Admission::Suppressed(SuppressReason::DuplicateWithinWindow)
        );
        // 1500ms: window elapsed
        assert!(g
            .admit(&token("ABC123"), t0 + Duration::from_millis(1500))
            .is_admitted());
    }

    #[test]
    fn nothing_is_admitted_while_processing() {
        let g = gate();
        let t0 = Instant::now();
        assert!(g.admit(&token("AAA"), t0).is_admitted());

        // distinct token is also blocked while a call is in flight
        assert_eq!(
            g.admit(&token("BBB"), t0 + Duration::from_millis(10)),
            Admission::Suppressed(SuppressReason::InFlight)
        );

        g.release();
        assert!(g
            .admit(&token("BBB"), t0 + Duration::from_millis(20))
            .is_admitted());
    }

    #[test]
    fn distinct_token_passes_the_duplicate_window() {
        let g = gate();
        let t0 = Instant::now();
        assert!(g.admit(&token("AAA"), t0).is_admitted());
        g.release();
        assert!(g
            .admit(&token("BBB"), t0 + Duration::from_millis(100))
            .is_admitted());
    }

    #[test]
    fn release_when_idle_is_harmless() {
        let g = gate();
        g.release();
        g.release();
        assert!(!g.is_processing());
        assert!(g.admit(&token("AAA"), Instant::now()).is_admitted());
    }

    #[test]
    fn delayed_release_models_failure_cooldown() {
        // After a failure the release is scheduled ~2000ms out; until then the
        // processing flag rejects the same token, afterwards the duplicate
        // window (already elapsed) lets it straight back in.
        let g = gate();
        let t0 = Instant::now();
        assert!(g.admit(&token("ABC123"), t0).is_admitted());

        // before the cool-down release fires
        assert_eq!(
            g.admit(&token("ABC123"), t0 + Duration::from_millis(1900)),
            Admission::Suppressed(SuppressReason::InFlight)
        );

        g.release(); // cool-down elapsed
        assert!(g
            .admit(&token("ABC123"), t0 + Duration::from_millis(2000))
            .is_admitted());
    }
}
