//! Tests for the store gateway: response decoding and the in-memory store.

mod common;

use common::entry;
use heise_feed::error::Error;
use heise_feed::store::{MemoryStore, StoreGateway, watermark_from_response};
use serde_json::json;

#[test]
fn watermark_from_latest_item() {
    let body = json!({ "data": { "items": [{ "publishedAt": "2020-01-01T00:00:00Z" }] } });
    let w = watermark_from_response(body).unwrap();
    assert_eq!(w.as_str(), "2020-01-01T00:00:00Z");
}

#[test]
fn watermark_defaults_when_store_is_empty() {
    let w = watermark_from_response(json!({ "data": { "items": [] } })).unwrap();
    assert_eq!(w.as_str(), "2000-01-01T00:00:00.000Z");
}

#[test]
fn watermark_rejects_garbled_timestamp() {
    let body = json!({ "data": { "items": [{ "publishedAt": "yesterday" }] } });
    assert!(matches!(watermark_from_response(body), Err(Error::Store(_))));
}

#[test]
fn graphql_errors_surface_as_store_errors() {
    let body = json!({ "data": null, "errors": [{ "message": "permission denied" }] });
    match watermark_from_response(body) {
        Err(Error::Store(message)) => assert!(message.contains("permission denied")),
        other => panic!("expected store error, got {other:?}"),
    }
}

#[tokio::test]
async fn memory_store_does_not_deduplicate() {
    let store = MemoryStore::new();
    let e = entry("dup", "2020-01-02T00:00:00Z");

    let first = store.write_entry(&e).await.unwrap();
    let second = store.write_entry(&e).await.unwrap();

    assert_ne!(first.id, second.id);
    assert_eq!(store.entries(), vec![e.clone(), e]);
}

#[tokio::test]
async fn memory_store_watermark_advances_with_writes() {
    let store = MemoryStore::with_watermark("2020-01-01T00:00:00Z").unwrap();
    assert_eq!(
        store.read_watermark().await.unwrap().as_str(),
        "2020-01-01T00:00:00Z"
    );

    store
        .write_entry(&entry("older", "2019-01-01T00:00:00Z"))
        .await
        .unwrap();
    assert_eq!(
        store.read_watermark().await.unwrap().as_str(),
        "2020-01-01T00:00:00Z"
    );

    store
        .write_entry(&entry("newer", "2020-03-01T12:00:00Z"))
        .await
        .unwrap();
    assert_eq!(
        store.read_watermark().await.unwrap().as_str(),
        "2020-03-01T12:00:00.000Z"
    );
}

#[tokio::test]
async fn rejected_urls_fail_to_store() {
    let store = MemoryStore::new();
    store.reject_url("https://example.org/nope");

    let err = store
        .write_entry(&entry("nope", "2020-01-02T00:00:00Z"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Store(_)));
    assert!(store.entries().is_empty());
}
