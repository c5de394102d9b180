//! Wire messages of the `graphql-ws` subscription protocol.
//!
//! The client opens with `connection_init`, waits for `connection_ack`, then
//! sends `start` with the subscription document. Results arrive as `data`
//! messages; `ka` is a keep-alive with no content.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::event::Event;

/// Subprotocol name sent in `Sec-WebSocket-Protocol`.
pub const SUBPROTOCOL: &str = "graphql-ws";

/// Subscription to every event whose name matches `$name` (`*` for all).
pub const EVENT_SUBSCRIPTION: &str = r#"
subscription Events($name: String!) {
  eventListener(name: $name) {
    name
    data
    time
  }
}
"#;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    ConnectionInit {
        payload: serde_json::Value,
    },
    Start {
        id: String,
        payload: OperationPayload,
    },
    Stop {
        id: String,
    },
    ConnectionTerminate,
}

impl ClientMessage {
    /// `start` for the event subscription with the given name pattern.
    pub fn subscribe_events(id: impl Into<String>, pattern: &str) -> Self {
        ClientMessage::Start {
            id: id.into(),
            payload: OperationPayload {
                query: EVENT_SUBSCRIPTION.to_string(),
                variables: serde_json::json!({ "name": pattern }),
                operation_name: Some("Events".to_string()),
            },
        }
    }

    pub fn to_text(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationPayload {
    pub query: String,
    pub variables: serde_json::Value,
    #[serde(
        rename = "operationName",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub operation_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    ConnectionAck,
    ConnectionError {
        #[serde(default)]
        payload: serde_json::Value,
    },
    #[serde(rename = "ka")]
    KeepAlive,
    Data {
        id: String,
        payload: DataPayload,
    },
    Error {
        id: String,
        #[serde(default)]
        payload: serde_json::Value,
    },
    Complete {
        id: String,
    },
}

impl ServerMessage {
    pub fn parse(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPayload {
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    #[serde(default)]
    pub errors: Vec<serde_json::Value>,
}

impl DataPayload {
    /// The event carried by an `eventListener` result, if any.
    pub fn into_event(self) -> Result<Option<Event>> {
        if !self.errors.is_empty() {
            let messages: Vec<String> = self
                .errors
                .iter()
                .map(|e| {
                    e.get("message")
                        .and_then(|m| m.as_str())
                        .map(str::to_string)
                        .unwrap_or_else(|| e.to_string())
                })
                .collect();
            return Err(Error::Bus(format!(
                "subscription error: {}",
                messages.join("; ")
            )));
        }

        match self.data.and_then(|mut d| d.get_mut("eventListener").map(|v| v.take())) {
            Some(serde_json::Value::Null) | None => Ok(None),
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
        }
    }
}
