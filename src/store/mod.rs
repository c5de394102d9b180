//! Store gateway: where feed entries end up and where the watermark comes from.
//!
//! The store is remote and speaks GraphQL. Entries are tagged so several
//! feeds can share one store; the watermark is read per tag.

pub mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::error::{Error, Result};
use crate::graphql::GraphqlClient;
use crate::model::{FeedEntry, StoredRecord, Watermark};

/// Read/write access to the entry store.
#[async_trait]
pub trait StoreGateway: Send + Sync {
    /// Publish time of the newest stored entry, or [`Watermark::default`].
    async fn read_watermark(&self) -> Result<Watermark>;

    /// Persist one entry. Does not deduplicate.
    async fn write_entry(&self, entry: &FeedEntry) -> Result<StoredRecord>;
}

const LATEST_ITEM_QUERY: &str = r#"
query LatestItem($tag: String!) {
  items(where: { tag: $tag }, orderBy: publishedAt_DESC, first: 1) {
    publishedAt
  }
}
"#;

const CREATE_ITEM_MUTATION: &str = r#"
mutation CreateItem($title: String!, $url: String!, $content: String, $publishedAt: DateTime!, $tag: String!) {
  createItem(data: { title: $title, url: $url, content: $content, publishedAt: $publishedAt, tag: $tag }) {
    id
    createdAt
  }
}
"#;

#[derive(Debug, Deserialize)]
struct LatestItemData {
    #[serde(default)]
    items: Vec<LatestItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LatestItem {
    published_at: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateItemData {
    create_item: StoredRecord,
}

/// Decode a raw latest-item response body into a watermark.
pub fn watermark_from_response(body: serde_json::Value) -> Result<Watermark> {
    let data: LatestItemData =
        crate::graphql::decode_response(body).map_err(|e| Error::Store(e.to_string()))?;
    latest_watermark(data)
}

fn latest_watermark(data: LatestItemData) -> Result<Watermark> {
    match data.items.into_iter().next().and_then(|i| i.published_at) {
        Some(raw) => Watermark::parse(raw.clone())
            .map_err(|e| Error::Store(format!("stored publishedAt {raw:?} is not a timestamp: {e}"))),
        None => Ok(Watermark::default()),
    }
}

/// Store backed by a GraphQL endpoint.
pub struct GraphqlStore {
    client: GraphqlClient,
    tag: String,
}

impl GraphqlStore {
    pub fn new(client: GraphqlClient, tag: impl Into<String>) -> Self {
        Self {
            client,
            tag: tag.into(),
        }
    }
}

#[async_trait]
impl StoreGateway for GraphqlStore {
    #[instrument(level = "debug", skip(self), fields(tag = %self.tag))]
    async fn read_watermark(&self) -> Result<Watermark> {
        let data: LatestItemData = self
            .client
            .execute(LATEST_ITEM_QUERY, serde_json::json!({ "tag": self.tag }))
            .await
            .map_err(|e| Error::Store(format!("reading watermark: {e}")))?;
        let watermark = latest_watermark(data)?;
        debug!(%watermark, "watermark read");
        Ok(watermark)
    }

    #[instrument(level = "debug", skip(self, entry), fields(url = %entry.url))]
    async fn write_entry(&self, entry: &FeedEntry) -> Result<StoredRecord> {
        let published_at = entry
            .published_at_rfc3339()
            .ok_or_else(|| Error::Store(format!("entry {} has no publish time", entry.url)))?;

        let data: CreateItemData = self
            .client
            .execute(
                CREATE_ITEM_MUTATION,
                serde_json::json!({
                    "title": entry.title,
                    "url": entry.url,
                    "content": entry.content,
                    "publishedAt": published_at,
                    "tag": self.tag,
                }),
            )
            .await
            .map_err(|e| Error::Store(format!("inserting {}: {e}", entry.url)))?;
        Ok(data.create_item)
    }
}
