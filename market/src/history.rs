//! Bounded per-instrument price history.
//!
//! Each instrument keeps at most `depth` points (default [`HISTORY_DEPTH`]),
//! oldest first, evicted FIFO. Points are never reordered: a point observed
//! before the newest stored one is dropped.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::MarketError;
use crate::registry::FeedRegistry;
use crate::types::{InstrumentId, PricePoint};

/// Number of points retained per instrument.
pub const HISTORY_DEPTH: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// Stored; `evicted` is set when the oldest point was pushed out.
    Stored { evicted: bool },
    /// Zero reading, treated as "no data" and ignored.
    DroppedEmpty,
    /// Observed before the newest stored point.
    DroppedStale,
}

pub struct HistoryStore {
    registry: Arc<FeedRegistry>,
    depth: usize,
    buffers: Mutex<HashMap<InstrumentId, VecDeque<PricePoint>>>,
}

impl HistoryStore {
    pub fn new(registry: Arc<FeedRegistry>) -> Self {
        Self::with_depth(registry, HISTORY_DEPTH)
    }

    pub fn with_depth(registry: Arc<FeedRegistry>, depth: usize) -> Self {
        Self {
            registry,
            depth: depth.max(1),
            buffers: Mutex::new(HashMap::new()),
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn append(
        &self,
        id: &InstrumentId,
        point: PricePoint,
    ) -> Result<AppendOutcome, MarketError> {
        self.registry.resolve(id)?;

        if point.instrument_id != *id {
            return Err(MarketError::InstrumentMismatch {
                expected: id.clone(),
                found: point.instrument_id,
            });
        }

        if !point.value.is_positive() {
            debug!(instrument_id = %id, "empty reading dropped");
            return Ok(AppendOutcome::DroppedEmpty);
        }

        let mut buffers = self.buffers.lock();
        let buf = buffers
            .entry(id.clone())
            .or_insert_with(|| VecDeque::with_capacity(self.depth));

        if let Some(newest) = buf.back() {
            if point.observed_at < newest.observed_at {
                warn!(
                    instrument_id = %id,
                    observed_at = %point.observed_at,
                    newest = %newest.observed_at,
                    "out-of-order price point dropped"
                );
                return Ok(AppendOutcome::DroppedStale);
            }
        }

        let evicted = buf.len() >= self.depth;
        if evicted {
            buf.pop_front();
        }
        buf.push_back(point);

        Ok(AppendOutcome::Stored { evicted })
    }

    /// Copy of the instrument's buffer, oldest first.
    pub fn snapshot(&self, id: &InstrumentId) -> Result<Vec<PricePoint>, MarketError> {
        self.registry.resolve(id)?;

        let buffers = self.buffers.lock();
        Ok(buffers
            .get(id)
            .map(|buf| buf.iter().cloned().collect())
            .unwrap_or_default())
    }

    pub fn latest(&self, id: &InstrumentId) -> Result<Option<PricePoint>, MarketError> {
        self.registry.resolve(id)?;
        Ok(self.buffers.lock().get(id).and_then(|buf| buf.back().cloned()))
    }

    pub fn clear(&self, id: &InstrumentId) -> Result<(), MarketError> {
        self.registry.resolve(id)?;
        self.buffers.lock().remove(id);
        Ok(())
    }
}
