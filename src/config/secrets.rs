//! Secret handling utilities.
//!
//! Re-exports secrecy types and renders the GraphQL token into the two
//! places it travels: the HTTP `Authorization` header and the
//! `connection_init` payload of a subscription.

pub use secrecy::{ExposeSecret, SecretString};

/// `Bearer <token>` value for an `Authorization` header.
pub fn bearer(token: &SecretString) -> String {
    format!("Bearer {}", token.expose_secret())
}

/// `connection_init` payload for the subscription socket.
pub fn connection_params(token: Option<&SecretString>) -> serde_json::Value {
    match token {
        Some(token) => serde_json::json!({ "Authorization": bearer(token) }),
        None => serde_json::json!({}),
    }
}
