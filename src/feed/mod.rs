//! Feed fetching and filtering.
//!
//! [`FeedSource`] is the seam the sync workflow depends on; [`HttpFeed`] is
//! the production implementation that downloads the document with reqwest
//! and parses it with feed-rs.

pub mod filter;
pub mod parser;

pub use filter::select_newer;
pub use parser::parse_feed;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument};

use crate::error::{Error, Result};
use crate::model::FeedEntry;

/// Something that yields the current entries of a feed.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Where the entries come from, for logs.
    fn source(&self) -> &str;

    /// Fetch and parse the feed. No retries.
    async fn fetch(&self) -> Result<Vec<FeedEntry>>;
}

/// A feed served over HTTP.
#[derive(Clone)]
pub struct HttpFeed {
    client: Client,
    url: String,
}

impl HttpFeed {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Config(format!("cannot build feed http client: {e}")))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl FeedSource for HttpFeed {
    fn source(&self) -> &str {
        &self.url
    }

    #[instrument(level = "debug", skip(self), fields(url = %self.url))]
    async fn fetch(&self) -> Result<Vec<FeedEntry>> {
        let resp = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::Fetch(format!("GET {}: {e}", self.url)))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Fetch(format!("GET {} answered {status}", self.url)));
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| Error::Fetch(format!("reading {}: {e}", self.url)))?;

        let entries = parse_feed(&body)?;
        debug!(entries = entries.len(), "feed parsed");
        Ok(entries)
    }
}
