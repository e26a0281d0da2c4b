pub mod client;

pub use client::HttpIngestClient;

use crate::error::TrackerError;
use crate::kernel::event::TrackedEvent;
use std::future::Future;

/// The analytics ingestion endpoint as the tracker sees it.
///
/// Futures are `'static` so the tracker can hand them to `tokio::spawn`
/// without waiting on them.
pub trait IngestClient: Send + Sync + 'static {
    /// Resolves to the new session id.
    fn create_session(&self) -> impl Future<Output = Result<String, TrackerError>> + Send + 'static;

    fn record_event(
        &self,
        event: TrackedEvent,
    ) -> impl Future<Output = Result<(), TrackerError>> + Send + 'static;

    /// Delivery used while the page tears down; the caller awaits it.
    fn send_beacon(
        &self,
        event: TrackedEvent,
    ) -> impl Future<Output = Result<(), TrackerError>> + Send + 'static;
}
