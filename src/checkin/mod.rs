mod client;
pub mod mock;

#[cfg(test)]
mod tests;

pub use client::CheckInClient;

use crate::scan::ScanToken;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fallback message when the server does not provide one
pub const GENERIC_FAILURE_MESSAGE: &str = "Check-in failed. Please try again.";

/// Guest record as returned by the guest-management API. Owned by the
/// backend; this core only reads it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Guest {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub plus_ones: u32,
    #[serde(default)]
    pub checked_in: bool,
    #[serde(default)]
    pub checked_in_at: Option<DateTime<Utc>>,
    /// Guest-level wristband override
    #[serde(default)]
    pub wristband_color: Option<String>,
    #[serde(default)]
    pub event_id: Option<i64>,
}

/// Event record used to enrich the success overlay
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventDetail {
    pub id: i64,
    pub name: String,
    /// Event-level wristband default
    #[serde(default)]
    pub wristband_color: Option<String>,
}

/// Outcome of invoking the remote check-in endpoint for a token
#[derive(Debug, Clone, PartialEq)]
pub enum CheckInResult {
    /// The guest transitioned to checked-in
    Success {
        guest: Guest,
        event: Option<EventDetail>,
    },
    /// The guest was already checked in (soft warning, not an error)
    AlreadyCheckedIn { guest: Guest },
    /// The server rejected the token or the call failed
    Failure { message: String },
}

impl CheckInResult {
    pub fn is_success(&self) -> bool {
        matches!(self, CheckInResult::Success { .. })
    }
}

/// Remote check-in collaborator. The production implementation talks to the
/// guest-management API over HTTP; tests substitute a scripted mock.
#[async_trait]
pub trait CheckInApi: Send + Sync {
    /// Send a normalized token to the check-in endpoint and interpret the
    /// response. Transport and server errors surface as
    /// [`CheckInResult::Failure`]; this call itself never fails.
    async fn check_in(&self, token: &ScanToken) -> CheckInResult;

    /// Read-only event lookup for overlay enrichment. Best-effort: any
    /// failure degrades to `None`.
    async fn event_detail(&self, event_id: i64) -> Option<EventDetail>;
}

/// Wire shape of `POST /checkin/token`
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct CheckInRequest {
    pub token: String,
}

/// Wire shape of a successful check-in response
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct CheckInResponse {
    pub guest: Guest,
    pub already_checked_in: bool,
}

/// Wire shape of a non-2xx error body
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct ApiErrorBody {
    pub error: String,
}
