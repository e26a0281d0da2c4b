//! Page environment capability.
//!
//! Everything the tracker knows about the page it runs in comes through
//! [`PageEnvironment`]: location, scroll geometry, the two storage areas, and
//! a stream of [`PageSignal`]s. Subscribing to that stream is the tracker's
//! only listener registration.

pub mod simulated;
pub mod storage;

pub use simulated::SimulatedPage;
pub use storage::{KeyValueStore, MemoryStore};

use crate::kernel::clicks::ClickedElement;
use crate::kernel::scroll::ScrollMetrics;
use reqwest::Url;
use tokio::sync::mpsc;

/// Notifications the page pushes to a subscribed tracker.
#[derive(Debug, Clone, PartialEq)]
pub enum PageSignal {
    /// The document scrolled. Cheap; evaluation waits for the next frame.
    Scroll,
    /// An animation frame the tracker asked for is being painted.
    AnimationFrame,
    /// A click bubbled up to the document.
    Click(ClickedElement),
    /// The page started tearing down.
    Unload,
}

pub trait PageEnvironment: Send + Sync {
    fn location(&self) -> Url;

    fn scroll_metrics(&self) -> ScrollMetrics;

    /// Cross-session, per-origin storage. Holds the consent flag.
    fn durable_storage(&self) -> &dyn KeyValueStore;

    /// Storage that lives as long as the browser tab. Holds the session id.
    fn tab_storage(&self) -> &dyn KeyValueStore;

    /// Ask for one [`PageSignal::AnimationFrame`] before the next paint.
    fn request_animation_frame(&self);

    /// Register for scroll, click, frame and unload notifications.
    fn subscribe(&self) -> mpsc::UnboundedReceiver<PageSignal>;

    fn path(&self) -> String {
        self.location().path().to_string()
    }
}
