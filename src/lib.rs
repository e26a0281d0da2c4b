pub mod config;
pub mod env;
pub mod error;
pub mod kernel;
pub mod services;

// Re-export specific items for convenient access
pub use config::TrackerConfig;
pub use error::TrackerError;
pub use kernel::tracker::{start, Tracker, TrackerHandle};
