//! # heise-feed
//!
//! Feed sync service driven by a GraphQL event bus.
//!
//! Listens for `<namespace>:start` on a `graphql-ws` subscription, diffs an
//! RSS/Atom feed against the newest entry in a GraphQL-backed store, inserts
//! what is new and reports back on the bus. Also ships a plain bus listener
//! that prints every event.

pub mod bus;
pub mod config;
pub mod error;
pub mod event;
pub mod feed;
pub mod graphql;
pub mod model;
pub mod store;
pub mod sync;
pub mod telemetry;
