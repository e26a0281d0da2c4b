use super::IngestClient;
use crate::config::TrackerConfig;
use crate::error::TrackerError;
use crate::kernel::consent::{CONSENT_ACCEPTED, CONSENT_COOKIE};
use crate::kernel::event::TrackedEvent;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, COOKIE};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::future::Future;
use tracing::debug;

const SESSION_ROUTE: &str = "/api/analytics/session";
const EVENT_ROUTE: &str = "/api/analytics/event";
const BEACON_CONTENT_TYPE: &str = "text/plain;charset=UTF-8";

#[derive(Clone)]
pub struct HttpIngestClient {
    client: Client,
    base_url: String,
}

#[derive(Deserialize)]
struct SessionResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    session_id: Option<String>,
}

impl HttpIngestClient {
    pub fn new(config: &TrackerConfig) -> Self {
        // The endpoint drops reports from clients without the consent cookie.
        let mut headers = HeaderMap::new();
        if let Ok(cookie) = HeaderValue::from_str(&format!("{CONSENT_COOKIE}={CONSENT_ACCEPTED}")) {
            headers.insert(COOKIE, cookie);
        }

        Self {
            client: Client::builder()
                .timeout(config.request_timeout)
                .default_headers(headers)
                .build()
                .unwrap_or_else(|_| Client::new()),
            base_url: config.endpoint.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, route: &str) -> String {
        format!("{}{}", self.base_url, route)
    }
}

impl IngestClient for HttpIngestClient {
    fn create_session(&self) -> impl Future<Output = Result<String, TrackerError>> + Send + 'static {
        let request = self.client.post(self.url(SESSION_ROUTE)).json(&json!({}));
        async move {
            let response = request.send().await?;
            if !response.status().is_success() {
                return Err(TrackerError::Status(response.status()));
            }
            let body: SessionResponse = response.json().await?;
            match body.session_id.filter(|id| !id.is_empty()) {
                Some(id) => Ok(id),
                None => {
                    debug!("Session refused by endpoint (status: {:?})", body.status);
                    Err(TrackerError::MissingSessionId)
                }
            }
        }
    }

    fn record_event(
        &self,
        event: TrackedEvent,
    ) -> impl Future<Output = Result<(), TrackerError>> + Send + 'static {
        let request = self.client.post(self.url(EVENT_ROUTE)).json(&event);
        async move {
            let response = request.send().await?;
            if !response.status().is_success() {
                return Err(TrackerError::Status(response.status()));
            }
            Ok(())
        }
    }

    fn send_beacon(
        &self,
        event: TrackedEvent,
    ) -> impl Future<Output = Result<(), TrackerError>> + Send + 'static {
        // Same wire shape as navigator.sendBeacon with a JSON string body.
        let body = serde_json::to_vec(&event);
        let request = self
            .client
            .post(self.url(EVENT_ROUTE))
            .header(CONTENT_TYPE, BEACON_CONTENT_TYPE);
        async move {
            let response = request.body(body?).send().await?;
            if !response.status().is_success() {
                return Err(TrackerError::Status(response.status()));
            }
            Ok(())
        }
    }
}
