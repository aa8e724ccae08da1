use super::{
    ApiErrorBody, CheckInApi, CheckInRequest, CheckInResponse, CheckInResult, EventDetail,
    GENERIC_FAILURE_MESSAGE,
};
use crate::config::CheckInConfig;
use crate::scan::ScanToken;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// HTTP client for the guest-management check-in API
pub struct CheckInClient {
    client: reqwest::Client,
    base_url: String,
    /// Event lookups are immutable for the life of a scanning shift; cache
    /// them so the overlay does not refetch per scan.
    event_cache: RwLock<HashMap<i64, EventDetail>>,
}

impl CheckInClient {
    pub fn new(config: &CheckInConfig) -> crate::error::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            event_cache: RwLock::new(HashMap::new()),
        })
    }

    fn checkin_url(&self) -> String {
        format!("{}/checkin/token", self.base_url)
    }

    fn event_url(&self, event_id: i64) -> String {
        format!("{}/events/{}", self.base_url, event_id)
    }

    async fn perform_check_in(&self, token: &ScanToken) -> CheckInResult {
        let request = CheckInRequest {
            token: token.as_str().to_string(),
        };

        let response = match self
            .client
            .post(self.checkin_url())
            .json(&request)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!("Check-in request failed: {}", e);
                return CheckInResult::Failure {
                    message: GENERIC_FAILURE_MESSAGE.to_string(),
                };
            }
        };

        let status = response.status();
        if !status.is_success() {
            // Surface the server-provided message verbatim when there is one
            let message = match response.json::<ApiErrorBody>().await {
                Ok(body) if !body.error.is_empty() => body.error,
                _ => GENERIC_FAILURE_MESSAGE.to_string(),
            };
            debug!("Check-in rejected ({}): {}", status, message);
            return CheckInResult::Failure { message };
        }

        match response.json::<CheckInResponse>().await {
            Ok(body) if body.already_checked_in => {
                CheckInResult::AlreadyCheckedIn { guest: body.guest }
            }
            Ok(body) => CheckInResult::Success {
                guest: body.guest,
                event: None,
            },
            Err(e) => {
                warn!("Malformed check-in response: {}", e);
                CheckInResult::Failure {
                    message: GENERIC_FAILURE_MESSAGE.to_string(),
                }
            }
        }
    }
}

#[async_trait]
impl CheckInApi for CheckInClient {
    async fn check_in(&self, token: &ScanToken) -> CheckInResult {
        self.perform_check_in(token).await
    }

    async fn event_detail(&self, event_id: i64) -> Option<EventDetail> {
        if let Some(cached) = self.event_cache.read().await.get(&event_id) {
            return Some(cached.clone());
        }

        let response = match self.client.get(self.event_url(event_id)).send().await {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                debug!("Event {} lookup returned {}", event_id, response.status());
                return None;
            }
            Err(e) => {
                debug!("Event {} lookup failed: {}", event_id, e);
                return None;
            }
        };

        match response.json::<EventDetail>().await {
            Ok(detail) => {
                self.event_cache
                    .write()
                    .await
                    .insert(event_id, detail.clone());
                Some(detail)
            }
            Err(e) => {
                debug!("Malformed event detail for {}: {}", event_id, e);
                None
            }
        }
    }
}
