//! Core data model.
//!
//! A feed entry is one item of the upstream feed. The watermark is the publish
//! time of the newest entry already in the store; everything strictly newer is
//! a candidate for insertion.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Feed Entry
// ---------------------------------------------------------------------------

/// One entry of the upstream feed. Produced fresh on every fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedEntry {
    /// Link to the article.
    pub url: String,

    pub title: String,

    /// Full content or summary, whichever the feed provides.
    pub content: Option<String>,

    /// None when the feed omits the date or it cannot be parsed. Such entries
    /// are never considered newer than any watermark.
    pub published_at: Option<DateTime<Utc>>,
}

impl FeedEntry {
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            content: None,
            published_at: None,
        }
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn published_at(mut self, at: DateTime<Utc>) -> Self {
        self.published_at = Some(at);
        self
    }

    /// Publish time in the form the store expects (RFC 3339, millisecond precision).
    pub fn published_at_rfc3339(&self) -> Option<String> {
        self.published_at
            .map(|at| at.to_rfc3339_opts(SecondsFormat::Millis, true))
    }
}

// ---------------------------------------------------------------------------
// Watermark
// ---------------------------------------------------------------------------

/// Publish time of the newest stored entry.
///
/// Keeps the text it was read from so the result event reports the store's
/// value verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Watermark {
    at: DateTime<Utc>,
    raw: String,
}

impl Watermark {
    /// Used when the store holds no entry for this feed yet.
    pub const DEFAULT: &'static str = "2000-01-01T00:00:00.000Z";

    pub fn parse(raw: impl Into<String>) -> Result<Self, chrono::ParseError> {
        let raw = raw.into();
        let at = DateTime::parse_from_rfc3339(raw.trim())?.with_timezone(&Utc);
        Ok(Self { at, raw })
    }

    pub fn at(&self) -> DateTime<Utc> {
        self.at
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl Default for Watermark {
    fn default() -> Self {
        Self {
            at: DateTime::<Utc>::from_timestamp(946_684_800, 0).unwrap_or_default(),
            raw: Self::DEFAULT.to_string(),
        }
    }
}

impl From<DateTime<Utc>> for Watermark {
    fn from(at: DateTime<Utc>) -> Self {
        Self {
            at,
            raw: at.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

impl std::fmt::Display for Watermark {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Serialize for Watermark {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

// ---------------------------------------------------------------------------
// Stored Record
// ---------------------------------------------------------------------------

/// What the store hands back after inserting an entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredRecord {
    pub id: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Run State
// ---------------------------------------------------------------------------

/// Lifecycle state of the feed sync workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    #[default]
    Idle,
    Running,
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RunState::Idle => "idle",
            RunState::Running => "running",
        };
        write!(f, "{s}")
    }
}

/// Newtype for sync run IDs. Only used to correlate logs and spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Short display: first 8 chars of UUID
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}
