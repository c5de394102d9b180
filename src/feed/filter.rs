//! Freshness filter: which entries are newer than what the store already has.

use crate::model::{FeedEntry, Watermark};

/// Entries published strictly after `watermark`, in source order.
///
/// Entries without a publish time are never newer.
pub fn select_newer(entries: Vec<FeedEntry>, watermark: &Watermark) -> Vec<FeedEntry> {
    let cutoff = watermark.at();
    entries
        .into_iter()
        .filter(|entry| entry.published_at.is_some_and(|at| at > cutoff))
        .collect()
}
