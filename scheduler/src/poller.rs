//! Recurring price poll.
//!
//! Data flow per tick:
//! PriceSource → HistoryStore (append) → AlertEngine (evaluate) → PriceBook
//!
//! Responsibilities:
//! - Fetch every registered instrument once per tick.
//! - Isolate failures: a failed or timed-out fetch skips that instrument only.
//! - Apply each result synchronously (append, then evaluate) so a trade or a
//!   threshold update running between two fetches never sees a half-applied
//!   instrument.
//! - Guarantee that once `stop()` returns no result is applied, even one whose
//!   fetch started earlier and resolves later.
//!
//! Non-responsibilities:
//! - Statistics (computed on demand from the history store).
//! - Trade pricing (the ledger reads the price book).

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval, timeout};
use tracing::{Instrument, debug, info, warn};

use common::logger::{TraceId, annotate_span, child_span, root_span, warn_if_slow};
use market::{
    AlertEngine, AlertEvent, Amount, AppendOutcome, FeedDescriptor, FeedRegistry, FetchError,
    HistoryStore, InstrumentId, PricePoint, PriceSource,
};

use crate::book::PriceBook;
use crate::counters::{CounterSnapshot, PollCounters};
use crate::types::{FetchMode, SchedulerConfig, TickReport};

type InstrumentOutcome = (InstrumentId, Result<Applied, FetchError>);

enum Applied {
    Updated(Option<AlertEvent>),
    Skipped,
    /// Arrived after `stop()`.
    Discarded,
}

struct TickCore {
    config: SchedulerConfig,
    registry: Arc<FeedRegistry>,
    source: Arc<dyn PriceSource>,
    history: Arc<HistoryStore>,
    alerts: Arc<AlertEngine>,
    book: Arc<PriceBook>,
    counters: PollCounters,
    reports: broadcast::Sender<TickReport>,

    /// Bumped by `stop()`. Every apply runs under this lock and checks the
    /// epoch it was started with.
    epoch: Mutex<u64>,
    tick_seq: AtomicU64,
}

/// Owns the recurring poll task. Dropping the scheduler stops it.
pub struct PollScheduler {
    core: Arc<TickCore>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl PollScheduler {
    pub fn new(
        config: SchedulerConfig,
        registry: Arc<FeedRegistry>,
        source: Arc<dyn PriceSource>,
        history: Arc<HistoryStore>,
        alerts: Arc<AlertEngine>,
    ) -> Self {
        let (reports, _) = broadcast::channel(config.report_capacity.max(1));

        Self {
            core: Arc::new(TickCore {
                config,
                registry,
                source,
                history,
                alerts,
                book: Arc::new(PriceBook::new()),
                counters: PollCounters::default(),
                reports,
                epoch: Mutex::new(0),
                tick_seq: AtomicU64::new(0),
            }),
            task: Mutex::new(None),
        }
    }

    /// Starts the recurring cycle; the first tick fires immediately.
    ///
    /// No-op while already running. Must be called within a Tokio runtime.
    pub fn start(&self) {
        let mut task = self.task.lock();
        if task.as_ref().is_some_and(|h| !h.is_finished()) {
            debug!("poll scheduler already running");
            return;
        }

        let epoch = *self.core.epoch.lock();
        let core = Arc::clone(&self.core);
        let span = tracing::info_span!("poll_loop", epoch);
        *task = Some(tokio::spawn(core.run(epoch).instrument(span)));

        info!(
            every_ms = self.core.config.poll_every.as_millis() as u64,
            mode = ?self.core.config.fetch_mode,
            source = self.core.source.name(),
            instruments = self.core.registry.len(),
            "poll scheduler started"
        );
    }

    /// Cancels the cycle. Once this returns no further result is applied.
    pub fn stop(&self) {
        let handle = self.task.lock().take();

        {
            // Blocks until an in-progress apply finishes.
            let mut epoch = self.core.epoch.lock();
            *epoch += 1;
        }

        if let Some(handle) = handle {
            handle.abort();
            info!("poll scheduler stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    /// Runs one tick right away, outside the cadence.
    ///
    /// Returns `None` when `stop()` ran while the tick was in flight.
    pub async fn refresh_now(&self) -> Option<TickReport> {
        let epoch = *self.core.epoch.lock();
        self.core.tick(epoch).await
    }

    /// Most recent successfully fetched point.
    pub fn last_snapshot(&self, id: &InstrumentId) -> Option<PricePoint> {
        self.core.book.get(id)
    }

    pub fn price_book(&self) -> Arc<PriceBook> {
        Arc::clone(&self.core.book)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TickReport> {
        self.core.reports.subscribe()
    }

    pub fn counters(&self) -> CounterSnapshot {
        self.core.counters.snapshot()
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

impl TickCore {
    async fn run(self: Arc<Self>, epoch: u64) {
        let mut ticker = interval(self.config.poll_every.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            if !self.is_current(epoch) {
                break;
            }
            self.tick(epoch).await;
        }

        debug!("poll loop exited");
    }

    fn is_current(&self, epoch: u64) -> bool {
        *self.epoch.lock() == epoch
    }

    async fn tick(&self, epoch: u64) -> Option<TickReport> {
        let tick = self.tick_seq.fetch_add(1, Ordering::Relaxed) + 1;
        let trace_id = TraceId::default();
        let span = root_span("poll_tick", &trace_id);

        self.run_tick(epoch, tick, trace_id).instrument(span).await
    }

    async fn run_tick(&self, epoch: u64, tick: u64, trace_id: TraceId) -> Option<TickReport> {
        PollCounters::bump(&self.counters.ticks);
        let mut report = TickReport::new(tick, trace_id.to_string(), Utc::now());

        let feeds: Vec<FeedDescriptor> = self.registry.instruments().cloned().collect();
        let outcomes = match self.config.fetch_mode {
            FetchMode::PerInstrument => self.poll_each(epoch, &feeds).await,
            FetchMode::Batch => self.poll_batch(epoch, &feeds).await,
        };

        let mut discarded = false;
        for (id, outcome) in outcomes {
            match outcome {
                Ok(Applied::Updated(alert)) => {
                    report.updated.push(id);
                    report.alerts.extend(alert);
                }
                Ok(Applied::Skipped) => report.skipped.push(id),
                Ok(Applied::Discarded) => discarded = true,
                Err(e) => report.failed.push((id, e.to_string())),
            }
        }

        if discarded || !self.is_current(epoch) {
            debug!(tick, "tick finished after stop; report dropped");
            return None;
        }

        info!(
            tick,
            updated = report.updated.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            alerts = report.alerts.len(),
            "poll tick complete"
        );

        // Nobody listening is fine.
        let _ = self.reports.send(report.clone());
        Some(report)
    }

    async fn poll_each(&self, epoch: u64, feeds: &[FeedDescriptor]) -> Vec<InstrumentOutcome> {
        let fetches = feeds.iter().map(|feed| {
            let span = child_span("fetch_price");
            async move {
                annotate_span(feed.id().as_str());

                let fetched = timeout(
                    self.config.fetch_timeout,
                    warn_if_slow(
                        "fetch_price",
                        self.config.slow_fetch,
                        self.source.fetch_price(feed),
                    ),
                )
                .await
                .unwrap_or_else(|_| {
                    Err(FetchError::Timeout {
                        instrument: feed.id().clone(),
                    })
                });

                let outcome = fetched.map(|value| self.apply(epoch, feed.id(), value));
                if let Err(e) = &outcome {
                    self.on_fetch_failure(feed.id(), e);
                }
                (feed.id().clone(), outcome)
            }
            .instrument(span)
        });

        join_all(fetches).await
    }

    async fn poll_batch(&self, epoch: u64, feeds: &[FeedDescriptor]) -> Vec<InstrumentOutcome> {
        let batch = timeout(
            self.config.fetch_timeout,
            warn_if_slow(
                "fetch_all_prices",
                self.config.slow_fetch,
                self.source.fetch_all_prices(feeds),
            ),
        )
        .await
        .unwrap_or_else(|_| {
            Err(FetchError::Batch {
                reason: format!("timed out after {:?}", self.config.fetch_timeout),
            })
        });

        let mut prices = match batch {
            Ok(prices) => prices,
            Err(e) => {
                warn!(
                    error = %e,
                    instruments = feeds.len(),
                    "batch price fetch failed; no instrument updated this tick"
                );
                return feeds
                    .iter()
                    .map(|feed| {
                        PollCounters::bump(&self.counters.fetch_failed);
                        (feed.id().clone(), Err(e.clone()))
                    })
                    .collect();
            }
        };

        feeds
            .iter()
            .map(|feed| {
                let outcome = match prices.remove(feed.id()) {
                    Some(value) => Ok(self.apply(epoch, feed.id(), value)),
                    None => Err(FetchError::Unavailable {
                        instrument: feed.id().clone(),
                        reason: "missing from batch response".to_string(),
                    }),
                };
                if let Err(e) = &outcome {
                    self.on_fetch_failure(feed.id(), e);
                }
                (feed.id().clone(), outcome)
            })
            .collect()
    }

    fn on_fetch_failure(&self, id: &InstrumentId, error: &FetchError) {
        PollCounters::bump(&self.counters.fetch_failed);
        warn!(
            instrument_id = %id,
            error = %error,
            "price fetch failed; skipping instrument this tick"
        );
    }

    /// append → evaluate → record, as one step under the epoch lock.
    fn apply(&self, epoch: u64, id: &InstrumentId, value: Amount) -> Applied {
        let current = self.epoch.lock();
        if *current != epoch {
            PollCounters::bump(&self.counters.results_discarded);
            debug!(instrument_id = %id, "late fetch result discarded");
            return Applied::Discarded;
        }
        PollCounters::bump(&self.counters.fetch_ok);

        let point = PricePoint::new(id.clone(), value, Utc::now());
        match self.history.append(id, point.clone()) {
            Ok(AppendOutcome::Stored { .. }) => {}
            Ok(outcome) => {
                PollCounters::bump(&self.counters.readings_skipped);
                debug!(instrument_id = %id, ?outcome, "reading not stored");
                return Applied::Skipped;
            }
            Err(e) => {
                PollCounters::bump(&self.counters.readings_skipped);
                warn!(instrument_id = %id, error = %e, "history rejected price point");
                return Applied::Skipped;
            }
        }

        let alert = self.alerts.evaluate(id, &point);
        self.book.record(point);
        drop(current);

        Applied::Updated(alert)
    }
}
