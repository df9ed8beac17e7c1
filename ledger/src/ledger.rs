//! Simulated portfolio priced from the scheduler's latest quotes.
//!
//! Every trade runs quote, balance check and mutation inside one critical
//! section, so two concurrent trades can never both spend the same cash or
//! the same holding.

use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use tracing::{info, instrument, warn};

use market::{Amount, FeedRegistry, InstrumentId, LatestPrice};

use crate::error::LedgerError;
use crate::model::{Portfolio, TradeReceipt, TradeSide};

pub struct PortfolioLedger {
    registry: Arc<FeedRegistry>,
    prices: Arc<dyn LatestPrice>,
    portfolio: Mutex<Portfolio>,
}

impl PortfolioLedger {
    pub fn new(
        registry: Arc<FeedRegistry>,
        prices: Arc<dyn LatestPrice>,
        starting_cash: Amount,
    ) -> Self {
        Self {
            registry,
            prices,
            portfolio: Mutex::new(Portfolio::new(starting_cash)),
        }
    }

    /// Latest successfully fetched price of `id`.
    pub fn quote(&self, id: &InstrumentId) -> Result<Amount, LedgerError> {
        if !self.registry.contains(id) {
            return Err(LedgerError::UnknownInstrument(id.clone()));
        }

        self.prices
            .latest_price(id)
            .map(|p| p.value)
            .ok_or_else(|| LedgerError::NoPriceAvailable(id.clone()))
    }

    pub fn trade(
        &self,
        side: TradeSide,
        id: &InstrumentId,
        quantity: Amount,
    ) -> Result<TradeReceipt, LedgerError> {
        match side {
            TradeSide::Buy => self.buy(id, quantity),
            TradeSide::Sell => self.sell(id, quantity),
        }
    }

    #[instrument(skip(self, id, quantity), target = "ledger", fields(instrument_id = %id, quantity = %quantity))]
    pub fn buy(&self, id: &InstrumentId, quantity: Amount) -> Result<TradeReceipt, LedgerError> {
        if !quantity.is_positive() {
            return Err(LedgerError::InvalidQuantity(quantity));
        }

        let mut portfolio = self.portfolio.lock();
        let price = self.quote(id)?;
        // Rounds up; sell proceeds round down.
        let cost = quantity
            .checked_mul_ceil(price)
            .ok_or(LedgerError::Overflow)?;
        if cost.is_zero() {
            return Err(LedgerError::InvalidQuantity(quantity));
        }

        let Some(cash) = portfolio.cash.checked_sub(cost) else {
            warn!(needed = %cost, available = %portfolio.cash, "buy rejected");
            return Err(LedgerError::InsufficientFunds {
                needed: cost,
                available: portfolio.cash,
            });
        };
        let held = portfolio
            .holding(id)
            .checked_add(quantity)
            .ok_or(LedgerError::Overflow)?;

        portfolio.cash = cash;
        portfolio.holdings.insert(id.clone(), held);
        drop(portfolio);

        info!(price = %price, cost = %cost, "buy executed");
        Ok(TradeReceipt {
            instrument_id: id.clone(),
            side: TradeSide::Buy,
            quantity,
            price,
            notional: cost,
            executed_at: Utc::now(),
        })
    }

    #[instrument(skip(self, id, quantity), target = "ledger", fields(instrument_id = %id, quantity = %quantity))]
    pub fn sell(&self, id: &InstrumentId, quantity: Amount) -> Result<TradeReceipt, LedgerError> {
        if !quantity.is_positive() {
            return Err(LedgerError::InvalidQuantity(quantity));
        }

        let mut portfolio = self.portfolio.lock();
        let price = self.quote(id)?;

        let held = portfolio.holding(id);
        let Some(remaining) = held.checked_sub(quantity) else {
            warn!(held = %held, "sell rejected");
            return Err(LedgerError::InsufficientHoldings {
                instrument: id.clone(),
                requested: quantity,
                held,
            });
        };
        let proceeds = quantity.checked_mul(price).ok_or(LedgerError::Overflow)?;
        let cash = portfolio
            .cash
            .checked_add(proceeds)
            .ok_or(LedgerError::Overflow)?;

        portfolio.cash = cash;
        if remaining.is_zero() {
            portfolio.holdings.remove(id);
        } else {
            portfolio.holdings.insert(id.clone(), remaining);
        }
        drop(portfolio);

        info!(price = %price, proceeds = %proceeds, "sell executed");
        Ok(TradeReceipt {
            instrument_id: id.clone(),
            side: TradeSide::Sell,
            quantity,
            price,
            notional: proceeds,
            executed_at: Utc::now(),
        })
    }

    /// Cash plus every holding at its latest quote. Unquoted holdings count as zero.
    pub fn valuation(&self) -> Amount {
        let portfolio = self.portfolio.lock();

        portfolio
            .holdings
            .iter()
            .fold(portfolio.cash, |total, (id, quantity)| {
                match self.prices.latest_price(id) {
                    Some(point) => total.saturating_add(quantity.saturating_mul(point.value)),
                    None => total,
                }
            })
    }

    pub fn portfolio(&self) -> Portfolio {
        self.portfolio.lock().clone()
    }

    pub fn holding(&self, id: &InstrumentId) -> Amount {
        self.portfolio.lock().holding(id)
    }

    pub fn cash(&self) -> Amount {
        self.portfolio.lock().cash
    }
}
