//! Event bus client.
//!
//! Events come in over a `graphql-ws` subscription ([`listener`]) and go out
//! as a GraphQL `emit` mutation ([`GraphqlPublisher`]).

pub mod listener;
pub mod protocol;

pub use listener::{EventListener, ListenerConfig, ListenerStatus};

use async_trait::async_trait;
use opentelemetry::KeyValue;
use tracing::{debug, instrument};

use crate::error::{Error, Result};
use crate::graphql::GraphqlClient;
use crate::telemetry::metrics;

/// Outbound half of the bus.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, name: &str, payload: serde_json::Value) -> Result<()>;
}

const EMIT_MUTATION: &str = r#"
mutation Emit($name: String!, $data: JSON) {
  emit(name: $name, data: $data)
}
"#;

/// Publishes events through the bus server's `emit` mutation.
pub struct GraphqlPublisher {
    client: GraphqlClient,
}

impl GraphqlPublisher {
    pub fn new(client: GraphqlClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl EventPublisher for GraphqlPublisher {
    #[instrument(level = "debug", skip(self, payload))]
    async fn publish(&self, name: &str, payload: serde_json::Value) -> Result<()> {
        let result = self
            .client
            .execute::<serde_json::Value>(
                EMIT_MUTATION,
                serde_json::json!({ "name": name, "data": payload }),
            )
            .await;

        let outcome = if result.is_ok() { "ok" } else { "error" };
        metrics::bus_publishes().add(
            1,
            &[
                KeyValue::new("name", name.to_string()),
                KeyValue::new("result", outcome),
            ],
        );

        result.map_err(|e| Error::Bus(format!("publish {name}: {e}")))?;
        debug!(name, "event published");
        Ok(())
    }
}
