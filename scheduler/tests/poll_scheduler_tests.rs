
use std::sync::Arc;
use std::time::Duration;

use tracing_test::traced_test;

use market::{AlertEngine, Amount, BoundKind, FeedRegistry, HistoryStore, InstrumentId};
use mock_source::{FetchGate, MockSource};
use scheduler::{FetchMode, PollScheduler, SchedulerConfig};

struct Harness {
    scheduler: PollScheduler,
    history: Arc<HistoryStore>,
    alerts: Arc<AlertEngine>,
}

fn mk_config(mode: FetchMode) -> SchedulerConfig {
    SchedulerConfig {
        poll_every: Duration::from_secs(30),
        fetch_mode: mode,
        ..SchedulerConfig::default()
    }
}

fn harness(source: MockSource, mode: FetchMode) -> Harness {
    let registry = Arc::new(FeedRegistry::oracle_defaults());
    let history = Arc::new(HistoryStore::new(Arc::clone(&registry)));
    let alerts = Arc::new(AlertEngine::new(Arc::clone(&registry)));

    let scheduler = PollScheduler::new(
        mk_config(mode),
        registry,
        Arc::new(source),
        Arc::clone(&history),
        Arc::clone(&alerts),
    );

    Harness {
        scheduler,
        history,
        alerts,
    }
}

fn priced_source() -> MockSource {
    let source = MockSource::new();
    source.set_price("BTC_USD", "43250.5");
    source.set_price("ETH_USD", "2300.25");
    source.set_price("EUR_USD", "1.0842");
    source
}

fn id(s: &str) -> InstrumentId {
    s.into()
}

fn amt(s: &str) -> Amount {
    s.parse().unwrap()
}

#[tokio::test(start_paused = true)]
async fn first_tick_fires_immediately_then_on_cadence() {
    let h = harness(priced_source(), FetchMode::PerInstrument);
    let mut reports = h.scheduler.subscribe();
    let started = tokio::time::Instant::now();

    h.scheduler.start();
    assert!(h.scheduler.is_running());

    let first = reports.recv().await.unwrap();
    assert_eq!(first.tick, 1);
    assert_eq!(first.updated.len(), 3);
    assert!(started.elapsed() < Duration::from_secs(1));

    let second = reports.recv().await.unwrap();
    assert_eq!(second.tick, 2);
    assert!(started.elapsed() >= Duration::from_secs(30));

    assert_eq!(h.history.snapshot(&id("BTC_USD")).unwrap().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn start_twice_runs_a_single_loop() {
    let source = priced_source();
    let h = harness(source.clone(), FetchMode::PerInstrument);
    let mut reports = h.scheduler.subscribe();
    let started = tokio::time::Instant::now();

    h.scheduler.start();
    h.scheduler.start();

    reports.recv().await.unwrap();
    let second = reports.recv().await.unwrap();

    // A second loop would have produced another report at t=0.
    assert!(started.elapsed() >= Duration::from_secs(30));
    assert_eq!(second.tick, 2);
    assert_eq!(source.calls(), 6);
}

#[tokio::test(start_paused = true)]
async fn stop_halts_further_ticks() {
    let source = priced_source();
    let h = harness(source.clone(), FetchMode::PerInstrument);
    let mut reports = h.scheduler.subscribe();

    h.scheduler.start();
    reports.recv().await.unwrap();

    h.scheduler.stop();
    assert!(!h.scheduler.is_running());

    tokio::time::sleep(Duration::from_secs(300)).await;

    assert_eq!(source.calls(), 3);
    assert_eq!(h.scheduler.counters().ticks, 1);
    assert_eq!(h.history.snapshot(&id("ETH_USD")).unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn dropping_the_scheduler_stops_polling() {
    let source = priced_source();
    let h = harness(source.clone(), FetchMode::PerInstrument);
    let mut reports = h.scheduler.subscribe();

    h.scheduler.start();
    reports.recv().await.unwrap();
    drop(h.scheduler);

    tokio::time::sleep(Duration::from_secs(300)).await;

    assert_eq!(source.calls(), 3);
    assert_eq!(h.history.snapshot(&id("BTC_USD")).unwrap().len(), 1);
}

#[tokio::test]
#[traced_test]
async fn failed_fetch_only_skips_that_instrument() {
    let source = priced_source();
    source.fail("ETH_USD");
    let h = harness(source, FetchMode::PerInstrument);

    let report = h.scheduler.refresh_now().await.unwrap();

    assert_eq!(report.updated.len(), 2);
    assert!(report.updated.contains(&id("BTC_USD")));
    assert!(report.updated.contains(&id("EUR_USD")));
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, id("ETH_USD"));

    assert!(h.history.snapshot(&id("ETH_USD")).unwrap().is_empty());
    assert!(h.scheduler.last_snapshot(&id("ETH_USD")).is_none());
    assert_eq!(
        h.scheduler.last_snapshot(&id("BTC_USD")).unwrap().value,
        amt("43250.5")
    );

    let counters = h.scheduler.counters();
    assert_eq!(counters.fetch_ok, 2);
    assert_eq!(counters.fetch_failed, 1);
    assert!(logs_contain("price fetch failed; skipping instrument this tick"));
}

#[tokio::test]
async fn zero_reading_is_skipped_everywhere() {
    let source = priced_source();
    source.set_price("EUR_USD", "0");
    let h = harness(source, FetchMode::PerInstrument);
    h.alerts
        .set_threshold(&id("EUR_USD"), None, Some(amt("1")))
        .unwrap();

    let report = h.scheduler.refresh_now().await.unwrap();

    assert_eq!(report.skipped, vec![id("EUR_USD")]);
    assert!(report.alerts.is_empty());
    assert!(h.history.snapshot(&id("EUR_USD")).unwrap().is_empty());
    assert!(h.scheduler.last_snapshot(&id("EUR_USD")).is_none());
    assert_eq!(h.scheduler.counters().readings_skipped, 1);
}

#[tokio::test]
async fn batch_mode_applies_the_whole_batch() {
    let source = priced_source();
    let h = harness(source.clone(), FetchMode::Batch);

    let report = h.scheduler.refresh_now().await.unwrap();

    assert_eq!(report.updated.len(), 3);
    assert_eq!(source.calls(), 1);
    assert_eq!(
        h.scheduler.last_snapshot(&id("EUR_USD")).unwrap().value,
        amt("1.0842")
    );
}

#[tokio::test]
#[traced_test]
async fn failed_batch_updates_nothing() {
    let source = priced_source();
    source.fail_batches();
    let h = harness(source, FetchMode::Batch);

    let report = h.scheduler.refresh_now().await.unwrap();

    assert!(report.updated.is_empty());
    assert_eq!(report.failed.len(), 3);
    for name in ["BTC_USD", "ETH_USD", "EUR_USD"] {
        assert!(h.history.snapshot(&id(name)).unwrap().is_empty());
        assert!(h.scheduler.last_snapshot(&id(name)).is_none());
    }
    assert!(logs_contain("batch price fetch failed"));
}

#[tokio::test]
async fn instrument_missing_from_batch_is_reported_as_failed() {
    let source = MockSource::new();
    source.set_price("BTC_USD", "43000");
    let h = harness(source, FetchMode::Batch);

    let report = h.scheduler.refresh_now().await.unwrap();

    assert_eq!(report.updated, vec![id("BTC_USD")]);
    assert_eq!(report.failed.len(), 2);
}

#[tokio::test]
async fn ticks_feed_the_alert_engine() {
    let source = priced_source();
    let h = harness(source.clone(), FetchMode::PerInstrument);
    h.alerts
        .set_threshold(&id("BTC_USD"), Some(amt("40000")), Some(amt("30000")))
        .unwrap();

    let report = h.scheduler.refresh_now().await.unwrap();
    assert_eq!(report.alerts.len(), 1);
    assert_eq!(report.alerts[0].bound, BoundKind::Upper);
    assert_eq!(report.alerts[0].triggering_price, amt("43250.5"));

    source.set_price("BTC_USD", "35000");
    let report = h.scheduler.refresh_now().await.unwrap();
    assert!(report.alerts.is_empty());

    source.set_price("BTC_USD", "29000");
    let report = h.scheduler.refresh_now().await.unwrap();
    assert_eq!(report.alerts[0].bound, BoundKind::Lower);

    let log = h.alerts.recent_alerts();
    assert_eq!(log.len(), 2);
    assert_eq!(log[1].bound_value, amt("30000"));
}

#[tokio::test]
async fn refresh_now_publishes_to_subscribers() {
    let h = harness(priced_source(), FetchMode::PerInstrument);
    let mut reports = h.scheduler.subscribe();

    let returned = h.scheduler.refresh_now().await.unwrap();
    let published = reports.recv().await.unwrap();

    assert_eq!(returned, published);
    assert!(!returned.trace_id.is_empty());
}

#[tokio::test]
async fn result_landing_after_stop_is_discarded() {
    let gate = Arc::new(FetchGate::new());
    let source = MockSource::with_gate(Arc::clone(&gate));
    source.set_price("BTC_USD", "43250.5");
    source.set_price("ETH_USD", "2300.25");
    source.set_price("EUR_USD", "1.0842");

    let h = harness(source, FetchMode::PerInstrument);
    h.alerts
        .set_threshold(&id("BTC_USD"), Some(amt("40000")), None)
        .unwrap();

    let scheduler = Arc::new(h.scheduler);
    let in_flight = {
        let scheduler = Arc::clone(&scheduler);
        tokio::spawn(async move { scheduler.refresh_now().await })
    };

    gate.entered.notified().await;
    scheduler.stop();
    gate.release_all();

    let report = in_flight.await.unwrap();
    assert!(report.is_none());

    for name in ["BTC_USD", "ETH_USD", "EUR_USD"] {
        assert!(h.history.snapshot(&id(name)).unwrap().is_empty());
        assert!(scheduler.last_snapshot(&id(name)).is_none());
    }
    assert!(h.alerts.recent_alerts().is_empty());
    let counters = scheduler.counters();
    assert_eq!(counters.results_discarded, 3);
    assert_eq!(counters.fetch_ok, 0);
}

#[tokio::test(start_paused = true)]
async fn hung_feed_times_out_without_blocking_siblings() {
    let source = priced_source();
    source.hang("ETH_USD");
    let h = harness(source, FetchMode::PerInstrument);

    let report = h.scheduler.refresh_now().await.unwrap();

    assert_eq!(report.updated.len(), 2);
    assert!(report.updated.contains(&id("BTC_USD")));
    assert!(report.updated.contains(&id("EUR_USD")));
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, id("ETH_USD"));
    assert!(report.failed[0].1.contains("timed out"));
}

#[tokio::test(start_paused = true)]
async fn hung_feed_does_not_stall_the_cadence() {
    let source = priced_source();
    source.hang("ETH_USD");
    let h = harness(source, FetchMode::PerInstrument);

    h.scheduler.start();
    tokio::time::sleep(Duration::from_secs(300)).await;

    let counters = h.scheduler.counters();
    assert!(counters.ticks >= 9, "ticks = {}", counters.ticks);
    assert!(counters.fetch_failed >= 9);
    assert!(h.history.snapshot(&id("BTC_USD")).unwrap().len() >= 9);
    assert!(h.history.snapshot(&id("ETH_USD")).unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn hung_batch_fails_the_tick() {
    let source = priced_source();
    source.hang_batches();
    let h = harness(source, FetchMode::Batch);

    let report = h.scheduler.refresh_now().await.unwrap();

    assert!(report.updated.is_empty());
    assert_eq!(report.failed.len(), 3);
    assert!(report.failed.iter().all(|(_, e)| e.contains("timed out")));
}
