//! RSS/Atom parsing via `feed-rs`.

use feed_rs::model::Entry;

use crate::error::{Error, Result};
use crate::model::FeedEntry;

/// Parse a raw RSS 2.0 or Atom document into entries, in document order.
pub fn parse_feed(body: &[u8]) -> Result<Vec<FeedEntry>> {
    let feed = feed_rs::parser::parse(body)
        .map_err(|e| Error::Fetch(format!("unparsable feed: {e}")))?;
    Ok(feed.entries.into_iter().map(into_entry).collect())
}

fn into_entry(entry: Entry) -> FeedEntry {
    let url = entry
        .links
        .into_iter()
        .next()
        .map(|link| link.href)
        .unwrap_or(entry.id);
    let title = entry.title.map(|t| t.content).unwrap_or_default();
    let content = entry
        .content
        .and_then(|c| c.body)
        .or_else(|| entry.summary.map(|s| s.content));

    FeedEntry {
        url,
        title,
        content,
        published_at: entry.published.or(entry.updated),
    }
}
