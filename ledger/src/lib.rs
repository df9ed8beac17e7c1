//! Simulated trading account priced from the latest oracle quotes.

pub mod error;
pub mod ledger;
pub mod model;

pub use error::LedgerError;
pub use ledger::PortfolioLedger;
pub use model::{Portfolio, TradeReceipt, TradeSide};
