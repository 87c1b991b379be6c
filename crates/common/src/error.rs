use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("SSH connection failed: {0}")]
    Connection(String),

    #[error("SSH authentication failed: {0}")]
    Auth(String),

    #[error("SSH channel error: {0}")]
    Channel(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("session lost: {0}")]
    SessionLost(String),

    #[error("echo probe failed: {0}")]
    Probe(String),

    #[error("invalid settings: {0}")]
    Config(String),

    #[error("interface '{interface}' not found (available: {})", available.join(", "))]
    InterfaceNotFound {
        interface: String,
        available: Vec<String>,
    },
}
