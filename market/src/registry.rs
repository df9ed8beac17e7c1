//! Static table of the instruments the desk knows about.
//!
//! Every other component validates identifiers through [`FeedRegistry::resolve`]
//! before touching history, alerts or the ledger.

use std::collections::HashMap;

use crate::error::MarketError;
use crate::types::{Bucket, FeedDescriptor, Instrument, InstrumentId};

/// (id, symbol, display name, bucket, oracle feed id)
const ORACLE_FEEDS: &[(&str, &str, &str, Bucket, &str)] = &[
    ("BTC_USD", "BTC/USD", "Bitcoin", Bucket::Crypto, "0x8000001f"),
    ("ETH_USD", "ETH/USD", "Ethereum", Bucket::Crypto, "0x8000002f"),
    ("EUR_USD", "EUR/USD", "Euro", Bucket::Forex, "0x800000fd"),
];

#[derive(Debug, Clone)]
pub struct FeedRegistry {
    feeds: Vec<FeedDescriptor>,
    index: HashMap<InstrumentId, usize>,
}

impl FeedRegistry {
    /// Builds the registry; registration order is preserved for iteration.
    pub fn new(feeds: impl IntoIterator<Item = FeedDescriptor>) -> Result<Self, MarketError> {
        let mut registry = Self {
            feeds: Vec::new(),
            index: HashMap::new(),
        };

        for feed in feeds {
            if registry.index.contains_key(feed.id()) {
                return Err(MarketError::DuplicateInstrument(feed.id().clone()));
            }
            registry.index.insert(feed.id().clone(), registry.feeds.len());
            registry.feeds.push(feed);
        }

        Ok(registry)
    }

    /// BTC/USD, ETH/USD and EUR/USD oracle feeds.
    pub fn oracle_defaults() -> Self {
        let mut registry = Self {
            feeds: Vec::with_capacity(ORACLE_FEEDS.len()),
            index: HashMap::with_capacity(ORACLE_FEEDS.len()),
        };

        for (id, symbol, name, bucket, address) in ORACLE_FEEDS {
            let instrument_id = InstrumentId::new(id);
            registry
                .index
                .insert(instrument_id.clone(), registry.feeds.len());
            registry.feeds.push(FeedDescriptor {
                instrument: Instrument {
                    id: instrument_id,
                    symbol: symbol.to_string(),
                    display_name: name.to_string(),
                    bucket: *bucket,
                },
                address: address.to_string(),
            });
        }

        registry
    }

    pub fn resolve(&self, id: &InstrumentId) -> Result<&FeedDescriptor, MarketError> {
        self.index
            .get(id)
            .map(|&i| &self.feeds[i])
            .ok_or_else(|| MarketError::UnknownInstrument(id.clone()))
    }

    pub fn contains(&self, id: &InstrumentId) -> bool {
        self.index.contains_key(id)
    }

    pub fn instruments(&self) -> impl Iterator<Item = &FeedDescriptor> {
        self.feeds.iter()
    }

    pub fn by_bucket(&self, bucket: Bucket) -> impl Iterator<Item = &FeedDescriptor> {
        self.feeds
            .iter()
            .filter(move |f| f.instrument.bucket == bucket)
    }

    pub fn len(&self) -> usize {
        self.feeds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.feeds.is_empty()
    }
}
