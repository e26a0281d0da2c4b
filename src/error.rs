use thiserror::Error;

/// Reasons a single report did not happen. Logged and dropped, never surfaced to the page.
#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("ingestion request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("ingestion endpoint answered {0}")]
    Status(reqwest::StatusCode),

    #[error("create-session response carried no session id")]
    MissingSessionId,

    #[error("could not encode event: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("storage unavailable: {0}")]
    Storage(String),

    #[error("beacon not delivered within {0:?}")]
    BeaconTimeout(std::time::Duration),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid {key} value {value:?}: {reason}")]
    Invalid {
        key: String,
        value: String,
        reason: String,
    },
}
