//! Integration tests for telemetry initialization and span helpers.

use std::io;
use std::sync::{Arc, Mutex};

use heise_feed::model::{RunId, RunState};
use heise_feed::telemetry::sync::{record_outcome, record_state_transition, start_sync_span};

#[test]
fn telemetry_initializes_without_endpoint() {
    let config = heise_feed::telemetry::TelemetryConfig {
        endpoint: None,
        service_name: "heise-feed-test".to_string(),
        log_level: "debug".to_string(),
    };
    // Err if another test already installed a global subscriber; that is fine.
    if let Ok(guard) = heise_feed::telemetry::init_telemetry(config) {
        assert!(!guard.is_exporting());
    }
}

/// Collects formatted log output in memory.
#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl Captured {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn sync_span_records_transitions_and_outcome() {
    let captured = Captured::default();
    let writer = captured.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();

    tracing::subscriber::with_default(subscriber, || {
        let span = start_sync_span("heise-feed", RunId::new());
        record_state_transition(&span, RunState::Idle, RunState::Running);
        record_outcome(&span, 3, 1);
        record_state_transition(&span, RunState::Running, RunState::Idle);
    });

    let output = captured.text();
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines.len(), 2, "got {output}");

    assert!(lines[0].contains("feed.sync{"), "got {}", lines[0]);
    assert!(lines[0].contains("sync.namespace=\"heise-feed\""));
    assert!(lines[0].contains("from=idle to=running"));

    // The second transition sees the recorded outcome on its span.
    assert!(lines[1].contains("sync.stored=3"), "got {}", lines[1]);
    assert!(lines[1].contains("sync.failed=1"));
    assert!(lines[1].contains("from=running to=idle"));
}
