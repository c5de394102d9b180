//! Error types for heise-feed.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A start trigger arrived while a run was in flight. The message is
    /// what ends up in the outbound error event.
    #[error("Already running")]
    AlreadyRunning,

    #[error("feed fetch failed: {0}")]
    Fetch(String),

    #[error("store request failed: {0}")]
    Store(String),

    #[error("event bus error: {0}")]
    Bus(String),

    #[error("{operation} timed out after {}ms", .after.as_millis())]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
