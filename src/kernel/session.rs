use crate::env::KeyValueStore;
use tracing::{info, warn};

/// Session id known to this page view.
///
/// The in-memory value is authoritative; the per-tab store is only a fallback
/// so that a later navigation in the same tab keeps reporting under the same id.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    key: String,
    current: Option<String>,
}

impl SessionState {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            current: None,
        }
    }

    /// Adopt an id an earlier page view in this tab already obtained.
    pub fn resume(key: impl Into<String>, tab: &dyn KeyValueStore) -> Self {
        let mut state = Self::new(key);
        state.current = tab.get(&state.key).filter(|id| !id.is_empty());
        state
    }

    pub fn in_memory(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Best-known id: memory first, then the per-tab store. Never invented.
    pub fn best_known(&self, tab: &dyn KeyValueStore) -> Option<String> {
        self.current
            .clone()
            .or_else(|| tab.get(&self.key).filter(|id| !id.is_empty()))
    }

    pub fn store(&mut self, id: String, tab: &dyn KeyValueStore) {
        if let Err(e) = tab.set(&self.key, &id) {
            warn!("Session {} kept in memory only: {}", id, e);
        }
        info!("Analytics session established: {}", id);
        self.current = Some(id);
    }
}
