#![allow(dead_code)]

use reqwest::{StatusCode, Url};
use serde_json::Value;
use std::future::Future;
use std::sync::{Arc, Mutex};
use trexim_analytics::env::SimulatedPage;
use trexim_analytics::kernel::event::TrackedEvent;
use trexim_analytics::services::ingest::IngestClient;
use trexim_analytics::TrackerError;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CreateSession,
    Record(Value),
    Beacon(Value),
}

/// Ingest double that records every call at the moment it is made.
#[derive(Clone)]
pub struct RecordingIngest {
    calls: Arc<Mutex<Vec<Call>>>,
    session: Option<String>,
}

impl RecordingIngest {
    pub fn granting(session_id: &str) -> Self {
        Self {
            calls: Arc::default(),
            session: Some(session_id.to_string()),
        }
    }

    /// Every create-session call fails as an unreachable endpoint would.
    pub fn refusing() -> Self {
        Self {
            calls: Arc::default(),
            session: None,
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn records(&self) -> Vec<Value> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Record(v) => Some(v),
                _ => None,
            })
            .collect()
    }

    pub fn beacons(&self) -> Vec<Value> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Beacon(v) => Some(v),
                _ => None,
            })
            .collect()
    }

    fn push(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

impl IngestClient for RecordingIngest {
    fn create_session(&self) -> impl Future<Output = Result<String, TrackerError>> + Send + 'static {
        self.push(Call::CreateSession);
        let session = self.session.clone();
        async move { session.ok_or(TrackerError::Status(StatusCode::SERVICE_UNAVAILABLE)) }
    }

    fn record_event(
        &self,
        event: TrackedEvent,
    ) -> impl Future<Output = Result<(), TrackerError>> + Send + 'static {
        self.push(Call::Record(serde_json::to_value(&event).unwrap()));
        async { Ok(()) }
    }

    fn send_beacon(
        &self,
        event: TrackedEvent,
    ) -> impl Future<Output = Result<(), TrackerError>> + Send + 'static {
        self.push(Call::Beacon(serde_json::to_value(&event).unwrap()));
        async { Ok(()) }
    }
}

pub fn page(url: &str) -> SimulatedPage {
    SimulatedPage::new(Url::parse(url).unwrap())
}

pub fn consented_page(url: &str) -> SimulatedPage {
    let page = page(url);
    page.grant_consent();
    page
}

/// Let spawned tasks and the driver catch up.
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}
