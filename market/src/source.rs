//! Contracts between the core and the outside world.
//!
//! [`PriceSource`] is implemented by whatever physically fetches prices (RPC,
//! HTTP, WebSocket, a replay tape); the core only consumes it.
//! [`LatestPrice`] is the read side the ledger prices trades from.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::amount::Amount;
use crate::error::FetchError;
use crate::types::{FeedDescriptor, InstrumentId, PricePoint};

#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Used in logs only.
    fn name(&self) -> &str {
        "price-source"
    }

    /// Current price of a single feed. Failures are scoped to that feed.
    async fn fetch_price(&self, feed: &FeedDescriptor) -> Result<Amount, FetchError>;

    /// Batch variant.
    ///
    /// The default fetches feeds one by one and fails the whole batch on the
    /// first error, so callers never see a partially applied batch.
    async fn fetch_all_prices(
        &self,
        feeds: &[FeedDescriptor],
    ) -> Result<HashMap<InstrumentId, Amount>, FetchError> {
        let mut prices = HashMap::with_capacity(feeds.len());
        for feed in feeds {
            let price = self
                .fetch_price(feed)
                .await
                .map_err(|e| FetchError::Batch {
                    reason: e.to_string(),
                })?;
            prices.insert(feed.id().clone(), price);
        }
        Ok(prices)
    }
}

/// Last successfully fetched price per instrument.
pub trait LatestPrice: Send + Sync {
    fn latest_price(&self, id: &InstrumentId) -> Option<PricePoint>;
}
