use crate::env::KeyValueStore;

/// Literal value the consent banner writes once the visitor opts in.
pub const CONSENT_ACCEPTED: &str = "accepted";

/// Cookie the ingestion endpoint checks. Fixed server-side, independent of
/// the storage key the page keeps consent under.
pub const CONSENT_COOKIE: &str = "analytics_consent";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsentState {
    Accepted,
    NotGiven,
}

impl ConsentState {
    /// Anything other than the exact `accepted` literal counts as no consent.
    pub fn read(store: &dyn KeyValueStore, key: &str) -> Self {
        match store.get(key) {
            Some(value) if value == CONSENT_ACCEPTED => ConsentState::Accepted,
            _ => ConsentState::NotGiven,
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, ConsentState::Accepted)
    }
}
