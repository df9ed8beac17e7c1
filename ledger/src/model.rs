use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use market::{Amount, InstrumentId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TradeSide::Buy => "buy",
            TradeSide::Sell => "sell",
        };
        f.write_str(s)
    }
}

impl FromStr for TradeSide {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "buy" => Ok(TradeSide::Buy),
            "sell" => Ok(TradeSide::Sell),
            other => Err(anyhow::anyhow!("Invalid TradeSide value: {}", other)),
        }
    }
}

/// Cash plus per-instrument quantities. Neither ever goes negative.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Portfolio {
    pub cash: Amount,
    /// Instruments with a zero position are not listed.
    pub holdings: BTreeMap<InstrumentId, Amount>,
}

impl Portfolio {
    pub fn new(cash: Amount) -> Self {
        Self {
            cash,
            holdings: BTreeMap::new(),
        }
    }

    pub fn holding(&self, id: &InstrumentId) -> Amount {
        self.holdings.get(id).copied().unwrap_or(Amount::ZERO)
    }
}

/// Returned by a successful trade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeReceipt {
    pub instrument_id: InstrumentId,
    pub side: TradeSide,
    pub quantity: Amount,
    /// Unit price the trade executed at.
    pub price: Amount,
    /// `quantity × price`, the cash moved.
    pub notional: Amount,
    pub executed_at: DateTime<Utc>,
}
