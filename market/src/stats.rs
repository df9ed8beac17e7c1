//! Statistics over the current history snapshot.
//!
//! Nothing is cached: every call reads a fresh snapshot, so results always
//! reflect the latest append.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::amount::Amount;
use crate::error::MarketError;
use crate::history::HistoryStore;
use crate::types::{InstrumentId, PricePoint};

/// Everything derived from one snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriceStats {
    pub samples: usize,
    pub latest: Option<Amount>,
    pub min: Option<Amount>,
    pub max: Option<Amount>,
    pub average: Amount,
    pub volatility: Amount,
}

pub struct StatsEngine {
    history: Arc<HistoryStore>,
}

impl StatsEngine {
    pub fn new(history: Arc<HistoryStore>) -> Self {
        Self { history }
    }

    /// Arithmetic mean; zero when nothing has been observed.
    pub fn average(&self, id: &InstrumentId) -> Result<Amount, MarketError> {
        let snapshot = self.history.snapshot(id)?;
        Ok(Amount::clamped(mean(&values(&snapshot))))
    }

    /// Sample standard deviation (n - 1); zero below two samples.
    pub fn volatility(&self, id: &InstrumentId) -> Result<Amount, MarketError> {
        let snapshot = self.history.snapshot(id)?;
        Ok(std_dev(&values(&snapshot)))
    }

    pub fn summary(&self, id: &InstrumentId) -> Result<PriceStats, MarketError> {
        let snapshot = self.history.snapshot(id)?;
        let values = values(&snapshot);

        Ok(PriceStats {
            samples: snapshot.len(),
            latest: snapshot.last().map(|p| p.value),
            min: snapshot.iter().map(|p| p.value).min(),
            max: snapshot.iter().map(|p| p.value).max(),
            average: Amount::clamped(mean(&values)),
            volatility: std_dev(&values),
        })
    }
}

fn values(snapshot: &[PricePoint]) -> Vec<Decimal> {
    snapshot.iter().map(|p| p.value.as_decimal()).collect()
}

fn mean(values: &[Decimal]) -> Decimal {
    if values.is_empty() {
        return Decimal::ZERO;
    }
    let n = Decimal::from(values.len());

    match values
        .iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(*v))
    {
        Some(sum) => sum / n,
        // Sum overflowed the mantissa; divide first.
        None => values.iter().map(|v| *v / n).sum(),
    }
}

fn std_dev(values: &[Decimal]) -> Amount {
    if values.len() < 2 {
        return Amount::ZERO;
    }

    let avg = mean(values);
    let mut sum_sq = Decimal::ZERO;
    for v in values {
        let d = *v - avg;
        sum_sq = sum_sq.saturating_add(d.saturating_mul(d));
    }

    let variance = Amount::clamped(sum_sq / Decimal::from(values.len() - 1));
    variance.sqrt().unwrap_or(Amount::ZERO)
}
