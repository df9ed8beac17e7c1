use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use common::logger::init_tracing;
use desk::config::{AppConfig, Cli};
use desk::replay::ReplaySource;
use desk::reporter::Reporter;
use ledger::PortfolioLedger;
use market::{AlertEngine, FeedRegistry, HistoryStore, PriceSource, StatsEngine};
use scheduler::PollScheduler;

/// Loads the configured replay tape, or the demo tape when none is given.
fn build_source(cfg: &AppConfig) -> anyhow::Result<Arc<dyn PriceSource>> {
    let source = match &cfg.replay {
        Some(path) => ReplaySource::from_path(path)?,
        None => ReplaySource::demo()?,
    };
    Ok(Arc::new(source))
}

fn install_alerts(alerts: &AlertEngine, cfg: &AppConfig) -> anyhow::Result<()> {
    for alert in &cfg.alerts {
        alerts
            .set_threshold(&alert.instrument, alert.upper, alert.lower)
            .with_context(|| format!("invalid --alert for {}", alert.instrument))?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = AppConfig::from_cli(Cli::parse());
    init_tracing("oracle-desk", cfg.json_logs);

    tracing::info!("Starting oracle desk...");

    let registry = Arc::new(FeedRegistry::oracle_defaults());
    let history = Arc::new(HistoryStore::new(Arc::clone(&registry)));
    let alerts = Arc::new(AlertEngine::new(Arc::clone(&registry)));
    install_alerts(&alerts, &cfg)?;

    let scheduler = PollScheduler::new(
        cfg.scheduler.clone(),
        Arc::clone(&registry),
        build_source(&cfg)?,
        Arc::clone(&history),
        Arc::clone(&alerts),
    );

    let ledger = Arc::new(PortfolioLedger::new(
        Arc::clone(&registry),
        scheduler.price_book(),
        cfg.starting_cash,
    ));

    let reporter = Reporter::new(
        Arc::clone(&registry),
        StatsEngine::new(Arc::clone(&history)),
        Arc::clone(&alerts),
        Arc::clone(&ledger),
        cfg.trades.clone(),
    );
    let reporter_task = tokio::spawn(reporter.run(scheduler.subscribe()));

    scheduler.start();

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    tracing::info!("Shutdown signal received");

    scheduler.stop();
    reporter_task.abort();

    let counters = scheduler.counters();
    tracing::info!(
        ticks = counters.ticks,
        fetch_ok = counters.fetch_ok,
        fetch_failed = counters.fetch_failed,
        valuation = %ledger.valuation().to_display_string(),
        "oracle desk stopped"
    );

    Ok(())
}
