//! Typed configuration from environment variables.
//!
//! Loads once at startup, fails fast on malformed values.
//! The GraphQL token is wrapped in secrecy::SecretString to keep it out of logs.

pub mod secrets;

use std::time::Duration;

use crate::error::{Error, Result};
use secrecy::SecretString;

pub const DEFAULT_FEED_URL: &str = "https://www.heise.de/rss/heise-atom.xml";
pub const DEFAULT_GRAPHQL_HTTP_URL: &str = "http://localhost:3421/graphql";
pub const DEFAULT_GRAPHQL_WS_URL: &str = "ws://localhost:3421/graphql";
pub const DEFAULT_NAMESPACE: &str = "heise-feed";
pub const DEFAULT_STORE_TAG: &str = "heise";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug)]
pub struct Config {
    pub feed_url: String,
    pub graphql_http_url: String,
    pub graphql_ws_url: String,
    pub graphql_token: Option<SecretString>,
    /// Prefix of every event name this service reacts to or emits.
    pub namespace: String,
    pub store_tag: String,
    /// Upper bound for every fetch, store and publish call.
    pub request_timeout: Duration,
    pub otel_endpoint: Option<String>,
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// In local dev, call `dotenvy::dotenv().ok()` before this.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            feed_url: var_or("FEED_URL", DEFAULT_FEED_URL),
            graphql_http_url: var_or("GRAPHQL_HTTP_URL", DEFAULT_GRAPHQL_HTTP_URL),
            graphql_ws_url: var_or("GRAPHQL_WS_URL", DEFAULT_GRAPHQL_WS_URL),
            graphql_token: std::env::var("GRAPHQL_TOKEN").ok().map(SecretString::from),
            namespace: var_or("EVENT_NAMESPACE", DEFAULT_NAMESPACE),
            store_tag: var_or("STORE_TAG", DEFAULT_STORE_TAG),
            request_timeout: timeout_var("REQUEST_TIMEOUT_SECS")?,
            otel_endpoint: std::env::var("OTEL_ENDPOINT").ok(),
            log_level: var_or("LOG_LEVEL", "info"),
        })
    }
}

fn var_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn timeout_var(name: &str) -> Result<Duration> {
    let Ok(raw) = std::env::var(name) else {
        return Ok(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS));
    };
    match raw.trim().parse::<u64>() {
        Ok(0) => Err(Error::Config(format!("{name} must be greater than zero"))),
        Ok(secs) => Ok(Duration::from_secs(secs)),
        Err(_) => Err(Error::Config(format!(
            "{name} must be a whole number of seconds, got {raw:?}"
        ))),
    }
}
