use tokio::time::{Duration, Instant};

pub const HEARTBEAT_MS: u64 = 30_000;

pub const HEARTBEAT_INTERVAL: Duration = Duration::from_millis(HEARTBEAT_MS);

/// Page-load anchored clock. All reported durations are whole seconds since load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageClock {
    loaded_at: Instant,
}

impl PageClock {
    pub fn new(loaded_at: Instant) -> Self {
        Self { loaded_at }
    }

    pub fn loaded_at(&self) -> Instant {
        self.loaded_at
    }

    pub fn elapsed_secs(&self, now: Instant) -> u64 {
        now.saturating_duration_since(self.loaded_at).as_secs()
    }
}
