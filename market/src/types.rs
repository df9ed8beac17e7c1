use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::amount::Amount;

/// Stable key of a quotable instrument, e.g. `BTC_USD`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstrumentId(Arc<str>);

impl InstrumentId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for InstrumentId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for InstrumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Display bucket an instrument is grouped under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Bucket {
    Crypto,
    Forex,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instrument {
    pub id: InstrumentId,
    /// Pair notation shown to users, e.g. `BTC/USD`.
    pub symbol: String,
    pub display_name: String,
    pub bucket: Bucket,
}

/// Where a price source finds an instrument's price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedDescriptor {
    pub instrument: Instrument,
    /// Source-specific address (oracle feed id, ticker, URL path...).
    pub address: String,
}

impl FeedDescriptor {
    pub fn id(&self) -> &InstrumentId {
        &self.instrument.id
    }
}

/// One observed price. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricePoint {
    pub instrument_id: InstrumentId,
    pub value: Amount,
    pub observed_at: DateTime<Utc>,
}

impl PricePoint {
    pub fn new(instrument_id: InstrumentId, value: Amount, observed_at: DateTime<Utc>) -> Self {
        Self {
            instrument_id,
            value,
            observed_at,
        }
    }
}
