//! Upper/lower price alerts.
//!
//! The engine is purely reactive: the poll scheduler feeds every new price
//! through [`AlertEngine::evaluate`]. Fired events land in a bounded log that
//! keeps the last [`ALERT_LOG_CAPACITY`] entries.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::amount::Amount;
use crate::error::MarketError;
use crate::registry::FeedRegistry;
use crate::types::{InstrumentId, PricePoint};

pub const ALERT_LOG_CAPACITY: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundKind {
    Upper,
    Lower,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertThreshold {
    pub instrument_id: InstrumentId,
    pub upper: Option<Amount>,
    pub lower: Option<Amount>,
}

impl AlertThreshold {
    pub fn new(
        instrument_id: InstrumentId,
        upper: Option<Amount>,
        lower: Option<Amount>,
    ) -> Result<Self, MarketError> {
        if let (Some(upper), Some(lower)) = (upper, lower) {
            if upper <= lower {
                return Err(MarketError::InvalidThreshold { upper, lower });
            }
        }

        Ok(Self {
            instrument_id,
            upper,
            lower,
        })
    }

    /// The bound crossed by `price`, if any. Upper wins when both would fire.
    pub fn crossed_by(&self, price: Amount) -> Option<(BoundKind, Amount)> {
        if let Some(upper) = self.upper {
            if price >= upper {
                return Some((BoundKind::Upper, upper));
            }
        }
        if let Some(lower) = self.lower {
            if price <= lower {
                return Some((BoundKind::Lower, lower));
            }
        }
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub instrument_id: InstrumentId,
    pub triggering_price: Amount,
    pub bound: BoundKind,
    pub bound_value: Amount,
    pub fired_at: DateTime<Utc>,
}

#[derive(Default)]
struct AlertState {
    thresholds: HashMap<InstrumentId, AlertThreshold>,
    log: VecDeque<AlertEvent>,
}

pub struct AlertEngine {
    registry: Arc<FeedRegistry>,
    capacity: usize,
    state: Mutex<AlertState>,
}

impl AlertEngine {
    pub fn new(registry: Arc<FeedRegistry>) -> Self {
        Self {
            registry,
            capacity: ALERT_LOG_CAPACITY,
            state: Mutex::new(AlertState::default()),
        }
    }

    /// Replaces the instrument's threshold. Passing no bounds clears it.
    pub fn set_threshold(
        &self,
        id: &InstrumentId,
        upper: Option<Amount>,
        lower: Option<Amount>,
    ) -> Result<(), MarketError> {
        self.registry.resolve(id)?;
        let threshold = AlertThreshold::new(id.clone(), upper, lower)?;

        let mut state = self.state.lock();
        if upper.is_none() && lower.is_none() {
            state.thresholds.remove(id);
            debug!(instrument_id = %id, "alert threshold cleared");
            return Ok(());
        }

        state.thresholds.insert(id.clone(), threshold);
        info!(
            instrument_id = %id,
            upper = ?upper.map(|u| u.to_string()),
            lower = ?lower.map(|l| l.to_string()),
            "alert threshold set"
        );
        Ok(())
    }

    pub fn clear_threshold(&self, id: &InstrumentId) -> Result<(), MarketError> {
        self.set_threshold(id, None, None)
    }

    pub fn threshold(&self, id: &InstrumentId) -> Option<AlertThreshold> {
        self.state.lock().thresholds.get(id).cloned()
    }

    /// Checks `point` against the instrument's threshold and logs the event it fires.
    pub fn evaluate(&self, id: &InstrumentId, point: &PricePoint) -> Option<AlertEvent> {
        let mut state = self.state.lock();
        let (bound, bound_value) = state.thresholds.get(id)?.crossed_by(point.value)?;

        let event = AlertEvent {
            instrument_id: id.clone(),
            triggering_price: point.value,
            bound,
            bound_value,
            fired_at: point.observed_at,
        };

        if state.log.len() >= self.capacity {
            state.log.pop_front();
        }
        state.log.push_back(event.clone());

        info!(
            instrument_id = %id,
            price = %point.value,
            bound = ?bound,
            bound_value = %bound_value,
            "price alert fired"
        );
        Some(event)
    }

    /// Most recent last.
    pub fn recent_alerts(&self) -> Vec<AlertEvent> {
        self.state.lock().log.iter().cloned().collect()
    }
}
