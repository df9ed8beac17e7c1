//! Presentation side of the desk: turns each tick report into log lines and
//! places the trades queued on the command line once prices are known.

use std::sync::Arc;

use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};

use ledger::{LedgerError, PortfolioLedger};
use market::{AlertEngine, AlertEvent, FeedRegistry, StatsEngine};
use scheduler::TickReport;

use crate::config::TradeArg;

pub struct Reporter {
    registry: Arc<FeedRegistry>,
    stats: StatsEngine,
    alerts: Arc<AlertEngine>,
    ledger: Arc<PortfolioLedger>,
    pending_trades: Vec<TradeArg>,
}

impl Reporter {
    pub fn new(
        registry: Arc<FeedRegistry>,
        stats: StatsEngine,
        alerts: Arc<AlertEngine>,
        ledger: Arc<PortfolioLedger>,
        pending_trades: Vec<TradeArg>,
    ) -> Self {
        Self {
            registry,
            stats,
            alerts,
            ledger,
            pending_trades,
        }
    }

    pub async fn run(mut self, mut reports: broadcast::Receiver<TickReport>) {
        loop {
            match reports.recv().await {
                Ok(report) => self.on_report(&report),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "reporter lagging; tick reports dropped");
                }
                Err(RecvError::Closed) => break,
            }
        }
        debug!("report channel closed");
    }

    pub fn on_report(&mut self, report: &TickReport) {
        for feed in self.registry.instruments() {
            let Ok(stats) = self.stats.summary(feed.id()) else {
                continue;
            };
            let Some(latest) = stats.latest else {
                continue;
            };

            info!(
                tick = report.tick,
                instrument_id = %feed.id(),
                symbol = %feed.instrument.symbol,
                price = %latest.to_display_string(),
                average = %stats.average.to_display_string(),
                volatility = %stats.volatility.to_display_string(),
                samples = stats.samples,
                "price update"
            );
        }

        for alert in &report.alerts {
            warn!(
                instrument_id = %alert.instrument_id,
                bound = ?alert.bound,
                price = %alert.triggering_price.to_display_string(),
                bound_value = %alert.bound_value.to_display_string(),
                "price alert"
            );
        }
        if !report.alerts.is_empty() {
            let log = self.alerts.recent_alerts();
            info!(
                entries = log.len(),
                recent = %format_alert_log(&log),
                "alert log"
            );
        }

        self.place_pending_trades();

        info!(
            tick = report.tick,
            cash = %self.ledger.cash().to_display_string(),
            valuation = %self.ledger.valuation().to_display_string(),
            "portfolio"
        );
    }

    /// Trades without a quote yet stay queued for the next tick.
    fn place_pending_trades(&mut self) {
        let ledger = Arc::clone(&self.ledger);

        self.pending_trades.retain(|trade| {
            match ledger.trade(trade.side, &trade.instrument, trade.quantity) {
                Ok(receipt) => {
                    info!(
                        side = %receipt.side,
                        instrument_id = %receipt.instrument_id,
                        quantity = %receipt.quantity,
                        price = %receipt.price.to_display_string(),
                        notional = %receipt.notional.to_display_string(),
                        "trade filled"
                    );
                    false
                }
                Err(LedgerError::NoPriceAvailable(_)) => true,
                Err(e) => {
                    warn!(error = %e, side = %trade.side, instrument_id = %trade.instrument, "trade rejected");
                    false
                }
            }
        });
    }

    pub fn pending_trades(&self) -> &[TradeArg] {
        &self.pending_trades
    }
}

/// Oldest first, e.g. `BTC_USD Upper 43,251 vs 40,000 @ 12:00:30`.
fn format_alert_log(log: &[AlertEvent]) -> String {
    log.iter()
        .map(|event| {
            format!(
                "{} {:?} {} vs {} @ {}",
                event.instrument_id,
                event.bound,
                event.triggering_price.to_display_string(),
                event.bound_value.to_display_string(),
                event.fired_at.format("%H:%M:%S"),
            )
        })
        .collect::<Vec<_>>()
        .join("; ")
}
