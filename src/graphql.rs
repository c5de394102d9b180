//! Minimal GraphQL-over-HTTP client.
//!
//! Posts `{ query, variables }` and decodes the `data` member of the reply.
//! Shared by the store gateway and the bus publisher; each maps failures into
//! its own error kind.

use std::time::Duration;

use reqwest::Client;
use secrecy::SecretString;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use crate::config::secrets::bearer;

#[derive(Debug, Error)]
pub enum GraphqlError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server answered {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("{}", .0.join("; "))]
    Errors(Vec<String>),

    #[error("response carried no data")]
    MissingData,

    #[error("unexpected response shape: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct Response {
    #[serde(default)]
    data: Option<serde_json::Value>,
    #[serde(default)]
    errors: Vec<ResponseError>,
}

#[derive(Debug, Deserialize)]
struct ResponseError {
    message: String,
}

/// Decode a raw GraphQL response body into `T`.
///
/// Any entry in `errors` fails the whole call, even when partial data came
/// back alongside it.
pub fn decode_response<T: DeserializeOwned>(body: serde_json::Value) -> Result<T, GraphqlError> {
    let response: Response = serde_json::from_value(body)?;
    if !response.errors.is_empty() {
        return Err(GraphqlError::Errors(
            response.errors.into_iter().map(|e| e.message).collect(),
        ));
    }
    let data = response.data.ok_or(GraphqlError::MissingData)?;
    Ok(serde_json::from_value(data)?)
}

#[derive(Clone)]
pub struct GraphqlClient {
    client: Client,
    endpoint: String,
    token: Option<SecretString>,
}

impl GraphqlClient {
    pub fn new(
        endpoint: impl Into<String>,
        token: Option<SecretString>,
        timeout: Duration,
    ) -> Result<Self, GraphqlError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            token,
        })
    }

    /// Run one query or mutation.
    pub async fn execute<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<T, GraphqlError> {
        let mut request = self.client.post(&self.endpoint).json(&serde_json::json!({
            "query": query,
            "variables": variables,
        }));
        if let Some(ref token) = self.token {
            request = request.header(reqwest::header::AUTHORIZATION, bearer(token));
        }

        let resp = request.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GraphqlError::Status { status, body });
        }

        let body: serde_json::Value = resp.json().await?;
        debug!(endpoint = %self.endpoint, "graphql response received");
        decode_response(body)
    }
}
