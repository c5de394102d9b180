//! Events travelling over the bus.
//!
//! Inbound events arrive as `{ name, data, time }` from the subscription and
//! are classified into an [`EventKind`] by name. Outbound events are the
//! workflow's voice: an error or a result, named under the service namespace.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

use crate::model::Watermark;

/// An event as delivered by the bus subscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub name: String,
    /// Arbitrary payload. Opaque to the bus.
    #[serde(default)]
    pub data: serde_json::Value,
    /// RFC 3339 string or epoch milliseconds, depending on the emitter.
    #[serde(default)]
    pub time: Option<serde_json::Value>,
}

impl Event {
    pub fn new(name: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            data,
            time: None,
        }
    }

    /// When the event happened, or now if the emitter did not say.
    pub fn occurred_at(&self) -> DateTime<Utc> {
        let parsed = match &self.time {
            Some(serde_json::Value::String(s)) => DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|t| t.with_timezone(&Utc)),
            Some(serde_json::Value::Number(n)) => {
                n.as_i64().and_then(DateTime::<Utc>::from_timestamp_millis)
            }
            _ => None,
        };
        parsed.unwrap_or_else(Utc::now)
    }

    /// One console line: `HH:MM:SS-mmm - name - data`, in local time.
    pub fn display_line(&self) -> String {
        let data = match &self.data {
            serde_json::Value::Null => "%".to_string(),
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        format!(
            "{} - {} - {}",
            self.occurred_at()
                .with_timezone(&Local)
                .format("%H:%M:%S-%3f"),
            self.name,
            data
        )
    }
}

// ---------------------------------------------------------------------------
// Names
// ---------------------------------------------------------------------------

/// Event names under one namespace (`<namespace>:start` and friends).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventNames {
    namespace: String,
}

impl EventNames {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn start(&self) -> String {
        format!("{}:start", self.namespace)
    }

    pub fn error(&self) -> String {
        format!("{}:error", self.namespace)
    }

    pub fn result(&self) -> String {
        format!("{}:result", self.namespace)
    }

    /// Classify an inbound event name.
    pub fn kind_of(&self, name: &str) -> EventKind {
        match name.strip_prefix(self.namespace.as_str()) {
            Some(":start") => EventKind::Start,
            _ => EventKind::Other,
        }
    }
}

/// What an inbound event means to the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Start,
    Other,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EventKind::Start => "start",
            EventKind::Other => "other",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// An event the workflow publishes back onto the bus.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Outbound {
    Error {
        error: String,
    },
    Result {
        items: usize,
        from: Watermark,
        #[serde(skip_serializing_if = "is_zero")]
        failed: usize,
    },
}

impl Outbound {
    pub fn error(message: impl Into<String>) -> Self {
        Outbound::Error {
            error: message.into(),
        }
    }

    pub fn name(&self, names: &EventNames) -> String {
        match self {
            Outbound::Error { .. } => names.error(),
            Outbound::Result { .. } => names.result(),
        }
    }

    pub fn payload(&self) -> serde_json::Value {
        // Only strings and integers inside; serialization cannot fail.
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

fn is_zero(n: &usize) -> bool {
    *n == 0
}
