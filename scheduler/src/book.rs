use std::collections::HashMap;

use parking_lot::RwLock;

use market::{InstrumentId, LatestPrice, PricePoint};

/// Latest successfully fetched point per instrument.
///
/// Kept apart from the history store so trade pricing does not depend on the
/// history retention policy. Last write wins.
#[derive(Default)]
pub struct PriceBook {
    inner: RwLock<HashMap<InstrumentId, PricePoint>>,
}

impl PriceBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, point: PricePoint) {
        let mut g = self.inner.write();
        g.insert(point.instrument_id.clone(), point);
    }

    pub fn get(&self, id: &InstrumentId) -> Option<PricePoint> {
        let g = self.inner.read();
        g.get(id).cloned()
    }
}

impl LatestPrice for PriceBook {
    fn latest_price(&self, id: &InstrumentId) -> Option<PricePoint> {
        self.get(id)
    }
}
