//! Metric instruments, created from the globally registered `MeterProvider`.
//!
//! Without an OTLP endpoint the global provider is a no-op, so recording is
//! always safe.

use opentelemetry::metrics::{Counter, Histogram, Meter};

fn meter() -> Meter {
    opentelemetry::global::meter("heise-feed")
}

/// Counter: sync runs.
/// Labels: `result` ("ok" | "partial" | "failed" | "refused").
pub fn sync_runs() -> Counter<u64> {
    meter()
        .u64_counter("feed.sync.runs")
        .with_description("Number of feed sync runs")
        .build()
}

/// Counter: entry inserts.
/// Labels: `result` ("ok" | "error").
pub fn entries_stored() -> Counter<u64> {
    meter()
        .u64_counter("feed.entries.stored")
        .with_description("Number of feed entry inserts")
        .build()
}

/// Counter: inbound bus events seen by the workflow.
/// Labels: `kind`.
pub fn events_received() -> Counter<u64> {
    meter()
        .u64_counter("feed.bus.events_received")
        .with_description("Number of inbound bus events")
        .build()
}

/// Counter: outbound bus events.
/// Labels: `name`, `result` ("ok" | "error").
pub fn bus_publishes() -> Counter<u64> {
    meter()
        .u64_counter("feed.bus.publishes")
        .with_description("Number of events published to the bus")
        .build()
}

/// Histogram: sync run duration in milliseconds.
pub fn run_duration_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("feed.sync.duration_ms")
        .with_description("Feed sync run duration in milliseconds")
        .with_unit("ms")
        .build()
}
