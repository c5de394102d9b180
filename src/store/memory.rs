//! In-process store for tests and dry runs.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use super::StoreGateway;
use crate::error::{Error, Result};
use crate::model::{FeedEntry, StoredRecord, Watermark};

#[derive(Default)]
struct Inner {
    seed: Option<Watermark>,
    entries: Vec<(StoredRecord, FeedEntry)>,
    rejected_urls: HashSet<String>,
    read_failure: Option<String>,
    next_id: u64,
}

/// A store that keeps everything in memory.
///
/// The watermark is the newest of the seeded watermark and every stored
/// entry's publish time.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pretend an entry published at `raw` is already stored.
    pub fn with_watermark(raw: &str) -> Result<Self> {
        let seed = Watermark::parse(raw)
            .map_err(|e| Error::Store(format!("bad seed watermark {raw:?}: {e}")))?;
        let store = Self::default();
        store.lock().seed = Some(seed);
        Ok(store)
    }

    /// Make every write of an entry with this url fail.
    pub fn reject_url(&self, url: impl Into<String>) {
        self.lock().rejected_urls.insert(url.into());
    }

    /// Make every watermark read fail with `message`.
    pub fn fail_reads(&self, message: impl Into<String>) {
        self.lock().read_failure = Some(message.into());
    }

    /// Entries stored so far, in insertion order.
    pub fn entries(&self) -> Vec<FeedEntry> {
        self.lock().entries.iter().map(|(_, e)| e.clone()).collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl StoreGateway for MemoryStore {
    async fn read_watermark(&self) -> Result<Watermark> {
        let inner = self.lock();
        if let Some(ref message) = inner.read_failure {
            return Err(Error::Store(message.clone()));
        }
        let newest_entry = inner
            .entries
            .iter()
            .filter_map(|(_, e)| e.published_at)
            .max()
            .map(Watermark::from);

        let watermark = match (inner.seed.clone(), newest_entry) {
            (Some(seed), Some(entry)) if entry.at() > seed.at() => entry,
            (Some(seed), _) => seed,
            (None, Some(entry)) => entry,
            (None, None) => Watermark::default(),
        };
        Ok(watermark)
    }

    async fn write_entry(&self, entry: &FeedEntry) -> Result<StoredRecord> {
        let mut inner = self.lock();
        if inner.rejected_urls.contains(&entry.url) {
            return Err(Error::Store(format!("insert of {} rejected", entry.url)));
        }
        inner.next_id += 1;
        let record = StoredRecord {
            id: inner.next_id.to_string(),
            created_at: Some(Utc::now()),
        };
        inner.entries.push((record.clone(), entry.clone()));
        Ok(record)
    }
}
