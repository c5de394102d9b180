//! Shared fakes for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use heise_feed::bus::EventPublisher;
use heise_feed::error::{Error, Result};
use heise_feed::feed::FeedSource;
use heise_feed::model::FeedEntry;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

pub fn at(rfc3339: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(rfc3339)
        .expect("valid test timestamp")
        .with_timezone(&Utc)
}

pub fn entry(slug: &str, published: &str) -> FeedEntry {
    FeedEntry::new(format!("https://example.org/{slug}"), slug).published_at(at(published))
}

/// A feed with fixed content, optionally failing or blocking until released.
#[derive(Default)]
pub struct StaticFeed {
    entries: Vec<FeedEntry>,
    gate: Option<Arc<Notify>>,
    failure: Option<String>,
    fetches: AtomicUsize,
}

impl StaticFeed {
    pub fn new(entries: Vec<FeedEntry>) -> Self {
        Self {
            entries,
            ..Self::default()
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::default()
        }
    }

    /// Block every fetch until `gate` is notified.
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// How many times the feed was fetched.
    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeedSource for StaticFeed {
    fn source(&self) -> &str {
        "static"
    }

    async fn fetch(&self) -> Result<Vec<FeedEntry>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(ref gate) = self.gate {
            gate.notified().await;
        }
        match self.failure {
            Some(ref message) => Err(Error::Fetch(message.clone())),
            None => Ok(self.entries.clone()),
        }
    }
}

/// Remembers every published event.
#[derive(Default)]
pub struct RecordingBus {
    published: Mutex<Vec<(String, serde_json::Value)>>,
}

impl RecordingBus {
    pub fn all(&self) -> Vec<(String, serde_json::Value)> {
        self.published.lock().unwrap().clone()
    }

    /// Payloads of every event published under `name`, in order.
    pub fn payloads(&self, name: &str) -> Vec<serde_json::Value> {
        self.all()
            .into_iter()
            .filter(|(n, _)| n == name)
            .map(|(_, p)| p)
            .collect()
    }
}

#[async_trait]
impl EventPublisher for RecordingBus {
    async fn publish(&self, name: &str, payload: serde_json::Value) -> Result<()> {
        self.published
            .lock()
            .unwrap()
            .push((name.to_string(), payload));
        Ok(())
    }
}

/// Answer exactly one HTTP request on a local port with `status` and `body`.
///
/// Returns the base url and a handle yielding the raw request text.
pub async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&chunk[..n]);
            if request_complete(&request) {
                break;
            }
        }

        let response = format!(
            "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
        String::from_utf8_lossy(&request).into_owned()
    });

    (format!("http://{addr}"), handle)
}

fn request_complete(request: &[u8]) -> bool {
    let Some(end) = request.windows(4).position(|w| w == b"\r\n\r\n") else {
        return false;
    };
    let head = String::from_utf8_lossy(&request[..end]).to_lowercase();
    let body_len = head
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);
    request.len() >= end + 4 + body_len
}
