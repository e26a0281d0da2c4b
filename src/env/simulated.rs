use super::storage::{KeyValueStore, MemoryStore};
use super::{PageEnvironment, PageSignal};
use crate::config::DEFAULT_CONSENT_KEY;
use crate::kernel::clicks::ClickedElement;
use crate::kernel::consent::CONSENT_ACCEPTED;
use crate::kernel::scroll::ScrollMetrics;
use reqwest::Url;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::debug;

#[derive(Debug)]
struct PageState {
    location: Url,
    scroll: ScrollMetrics,
    frame_requests: usize,
    listeners: Vec<mpsc::UnboundedSender<PageSignal>>,
}

/// Headless page used by the harness binary and by tests.
///
/// Clones share state, so one copy can be handed to the tracker while the
/// other drives scrolling, clicks and consent changes.
#[derive(Debug, Clone)]
pub struct SimulatedPage {
    state: Arc<Mutex<PageState>>,
    durable: MemoryStore,
    tab: MemoryStore,
    consent_key: String,
}

impl SimulatedPage {
    pub fn new(location: Url) -> Self {
        Self {
            state: Arc::new(Mutex::new(PageState {
                location,
                scroll: ScrollMetrics::default(),
                frame_requests: 0,
                listeners: Vec::new(),
            })),
            durable: MemoryStore::new(),
            tab: MemoryStore::new(),
            consent_key: DEFAULT_CONSENT_KEY.to_string(),
        }
    }

    /// Keep consent under `key`, matching `TrackerConfig::consent_key`.
    pub fn with_consent_key(mut self, key: impl Into<String>) -> Self {
        self.consent_key = key.into();
        self
    }

    /// A fresh page load in the same tab: new listeners and geometry, same storage.
    pub fn navigate(&self, location: Url) -> Self {
        let next = Self::new(location);
        Self {
            durable: self.durable.clone(),
            tab: self.tab.clone(),
            consent_key: self.consent_key.clone(),
            ..next
        }
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut PageState) -> R) -> R {
        let mut guard = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }

    /// Stand-in for the consent banner's "accept" button.
    pub fn grant_consent(&self) {
        let _ = self.durable.set(&self.consent_key, CONSENT_ACCEPTED);
    }

    pub fn revoke_consent(&self) {
        self.durable.remove(&self.consent_key);
    }

    pub fn durable(&self) -> &MemoryStore {
        &self.durable
    }

    pub fn tab(&self) -> &MemoryStore {
        &self.tab
    }

    pub fn set_scroll(&self, metrics: ScrollMetrics) {
        self.with_state(|s| s.scroll = metrics);
    }

    /// Move to `scroll_top` and notify listeners.
    pub fn scroll_to(&self, scroll_top: f64) -> usize {
        self.with_state(|s| s.scroll.scroll_top = scroll_top);
        self.emit(PageSignal::Scroll)
    }

    pub fn frame(&self) -> usize {
        self.emit(PageSignal::AnimationFrame)
    }

    pub fn click(&self, element: ClickedElement) -> usize {
        self.emit(PageSignal::Click(element))
    }

    pub fn unload(&self) -> usize {
        self.emit(PageSignal::Unload)
    }

    /// Deliver a signal to every live listener; returns how many received it.
    pub fn emit(&self, signal: PageSignal) -> usize {
        self.with_state(|s| {
            s.listeners.retain(|tx| !tx.is_closed());
            let mut delivered = 0;
            for tx in &s.listeners {
                if tx.send(signal.clone()).is_ok() {
                    delivered += 1;
                }
            }
            delivered
        })
    }

    pub fn listener_count(&self) -> usize {
        self.with_state(|s| s.listeners.iter().filter(|tx| !tx.is_closed()).count())
    }

    pub fn frame_requests(&self) -> usize {
        self.with_state(|s| s.frame_requests)
    }
}

impl PageEnvironment for SimulatedPage {
    fn location(&self) -> Url {
        self.with_state(|s| s.location.clone())
    }

    fn scroll_metrics(&self) -> ScrollMetrics {
        self.with_state(|s| s.scroll)
    }

    fn durable_storage(&self) -> &dyn KeyValueStore {
        &self.durable
    }

    fn tab_storage(&self) -> &dyn KeyValueStore {
        &self.tab
    }

    fn request_animation_frame(&self) {
        self.with_state(|s| s.frame_requests += 1);
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<PageSignal> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.with_state(|s| s.listeners.push(tx));
        debug!("Listener registered on simulated page");
        rx
    }
}
