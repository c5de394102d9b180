//! The feed sync workflow: watermark → fetch → diff → insert → report.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use opentelemetry::KeyValue;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, error, info, warn};

use super::state::{RunGuard, RunSlot};
use crate::bus::EventPublisher;
use crate::config::DEFAULT_REQUEST_TIMEOUT_SECS;
use crate::error::{Error, Result};
use crate::event::{Event, EventKind, EventNames, Outbound};
use crate::feed::{FeedSource, select_newer};
use crate::model::{RunId, RunState, StoredRecord, Watermark};
use crate::store::StoreGateway;
use crate::telemetry::metrics;
use crate::telemetry::sync::{record_outcome, record_state_transition, start_sync_span};

/// What one run did.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncReport {
    pub run_id: RunId,
    /// Watermark the diff was computed against.
    pub from: Watermark,
    /// Entries in the feed.
    pub fetched: usize,
    /// Entries newer than the watermark.
    pub selected: usize,
    pub stored: Vec<StoredRecord>,
    /// One message per entry that failed to store.
    pub failures: Vec<String>,
}

impl SyncReport {
    fn result_event(&self) -> Outbound {
        Outbound::Result {
            items: self.stored.len(),
            from: self.from.clone(),
            failed: self.failures.len(),
        }
    }
}

/// Mirrors new feed entries into the store when asked to over the bus.
pub struct FeedSync {
    feed: Arc<dyn FeedSource>,
    store: Arc<dyn StoreGateway>,
    bus: Arc<dyn EventPublisher>,
    names: EventNames,
    timeout: Duration,
    slot: RunSlot,
}

impl FeedSync {
    pub fn new(
        feed: Arc<dyn FeedSource>,
        store: Arc<dyn StoreGateway>,
        bus: Arc<dyn EventPublisher>,
        names: EventNames,
    ) -> Self {
        Self {
            feed,
            store,
            bus,
            names,
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            slot: RunSlot::new(),
        }
    }

    /// Bound every fetch, store and publish call by `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn state(&self) -> RunState {
        self.slot.current()
    }

    /// Feed inbound events to [`dispatch`](Self::dispatch) until the channel
    /// closes, then wait for any run still in flight.
    pub async fn serve(self: Arc<Self>, mut events: mpsc::Receiver<Event>) {
        info!(namespace = %self.names.namespace(), "feed sync listening for triggers");
        let mut in_flight: Option<JoinHandle<Result<SyncReport>>> = None;

        while let Some(event) = events.recv().await {
            if let Some(handle) = self.dispatch(&event).await {
                in_flight = Some(handle);
            }
        }

        if let Some(handle) = in_flight {
            if let Err(e) = handle.await {
                error!("sync task aborted: {e}");
            }
        }
        info!("feed sync stopped");
    }

    /// Route one inbound event.
    ///
    /// A start trigger either spawns a run (returned so callers can await it)
    /// or, while a run is in flight, is refused with an error event. Every
    /// other event is ignored.
    pub async fn dispatch(
        self: &Arc<Self>,
        event: &Event,
    ) -> Option<JoinHandle<Result<SyncReport>>> {
        let kind = self.names.kind_of(&event.name);
        metrics::events_received().add(1, &[KeyValue::new("kind", kind.to_string())]);

        match kind {
            EventKind::Start => {
                let guard = self.begin().await?;
                let this = Arc::clone(self);
                Some(tokio::spawn(async move { this.run(guard).await }))
            }
            EventKind::Other => {
                debug!(name = %event.name, "ignoring event");
                None
            }
        }
    }

    /// Run one sync in the caller's task.
    pub async fn trigger(&self) -> Result<SyncReport> {
        let guard = self.begin().await.ok_or(Error::AlreadyRunning)?;
        self.run(guard).await
    }

    /// Idle → Running. On refusal the error event is already published.
    async fn begin(&self) -> Option<RunGuard> {
        match self.slot.try_begin() {
            Ok(guard) => Some(guard),
            Err(e) => {
                warn!("start refused: a sync run is already in flight");
                metrics::sync_runs().add(1, &[KeyValue::new("result", "refused")]);
                self.emit(Outbound::error(e.to_string())).await;
                None
            }
        }
    }

    /// Execute a run the caller already holds the guard for.
    pub async fn run(&self, guard: RunGuard) -> Result<SyncReport> {
        let run_id = RunId::new();
        let span = start_sync_span(self.names.namespace(), run_id);

        async {
            record_state_transition(&span, RunState::Idle, RunState::Running);
            let started = Instant::now();

            let result = self.execute(run_id).await;

            metrics::run_duration_ms().record(started.elapsed().as_secs_f64() * 1000.0, &[]);
            match &result {
                Ok(report) => {
                    record_outcome(&span, report.stored.len(), report.failures.len());
                    info!(
                        stored = report.stored.len(),
                        failed = report.failures.len(),
                        from = %report.from,
                        "sync finished"
                    );
                    self.emit(report.result_event()).await;

                    let outcome = if report.failures.is_empty() {
                        "ok"
                    } else {
                        self.emit(Outbound::error(format!(
                            "{} of {} entries failed to store: {}",
                            report.failures.len(),
                            report.selected,
                            report.failures.join("; ")
                        )))
                        .await;
                        "partial"
                    };
                    metrics::sync_runs().add(1, &[KeyValue::new("result", outcome)]);
                }
                Err(e) => {
                    error!(error = %e, "sync failed");
                    metrics::sync_runs().add(1, &[KeyValue::new("result", "failed")]);
                    self.emit(Outbound::error(e.to_string())).await;
                }
            }

            drop(guard);
            record_state_transition(&span, RunState::Running, RunState::Idle);
            result
        }
        .instrument(span.clone())
        .await
    }

    async fn execute(&self, run_id: RunId) -> Result<SyncReport> {
        let watermark = self
            .bounded("watermark read", self.store.read_watermark())
            .await?;
        let entries = self.bounded("feed fetch", self.feed.fetch()).await?;
        let fetched = entries.len();

        let fresh = select_newer(entries, &watermark);
        info!(
            source = self.feed.source(),
            fetched,
            fresh = fresh.len(),
            %watermark,
            "feed diffed against watermark"
        );

        // Distinct new records, so inserts need no ordering among themselves.
        let outcomes = join_all(
            fresh
                .iter()
                .map(|entry| self.bounded("entry insert", self.store.write_entry(entry))),
        )
        .await;

        let mut stored = Vec::with_capacity(fresh.len());
        let mut failures = Vec::new();
        for (entry, outcome) in fresh.iter().zip(outcomes) {
            match outcome {
                Ok(record) => {
                    debug!(url = %entry.url, id = %record.id, "entry stored");
                    metrics::entries_stored().add(1, &[KeyValue::new("result", "ok")]);
                    stored.push(record);
                }
                Err(e) => {
                    warn!(url = %entry.url, error = %e, "entry insert failed");
                    metrics::entries_stored().add(1, &[KeyValue::new("result", "error")]);
                    failures.push(format!("{}: {e}", entry.url));
                }
            }
        }

        Ok(SyncReport {
            run_id,
            from: watermark,
            fetched,
            selected: fresh.len(),
            stored,
            failures,
        })
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| Error::Timeout {
                operation,
                after: self.timeout,
            })?
    }

    /// Publish an outbound event. Failures are logged, never propagated.
    async fn emit(&self, outbound: Outbound) {
        let name = outbound.name(&self.names);
        if let Err(e) = self
            .bounded("publish", self.bus.publish(&name, outbound.payload()))
            .await
        {
            warn!(%name, error = %e, "failed to publish event");
        }
    }
}
