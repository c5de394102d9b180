//! Sync run span helpers.

use tracing::Span;

use crate::model::{RunId, RunState};

/// Start a span covering one sync run.
///
/// `sync.state`, `sync.stored` and `sync.failed` are declared empty and filled
/// in as the run progresses.
pub fn start_sync_span(namespace: &str, run_id: RunId) -> Span {
    tracing::info_span!(
        "feed.sync",
        "sync.namespace" = namespace,
        "sync.run_id" = %run_id.0,
        "sync.state" = tracing::field::Empty,
        "sync.stored" = tracing::field::Empty,
        "sync.failed" = tracing::field::Empty,
    )
}

/// Record a run state transition on the span.
pub fn record_state_transition(span: &Span, from: RunState, to: RunState) {
    span.record("sync.state", to.to_string().as_str());
    span.in_scope(|| {
        tracing::info!(%from, %to, "state_transition");
    });
}

/// Record insert outcomes on the span.
pub fn record_outcome(span: &Span, stored: usize, failed: usize) {
    span.record("sync.stored", stored as u64);
    span.record("sync.failed", failed as u64);
}
