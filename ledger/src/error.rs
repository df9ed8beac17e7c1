use thiserror::Error;

use market::{Amount, InstrumentId};

/// Rejections raised by the ledger. A rejected trade leaves the portfolio untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("unknown instrument: {0}")]
    UnknownInstrument(InstrumentId),

    #[error("no price available yet for {0}")]
    NoPriceAvailable(InstrumentId),

    #[error("trade quantity must be positive, got {0}")]
    InvalidQuantity(Amount),

    #[error("insufficient funds: trade needs {needed}, cash is {available}")]
    InsufficientFunds { needed: Amount, available: Amount },

    #[error("insufficient holdings of {instrument}: requested {requested}, held {held}")]
    InsufficientHoldings {
        instrument: InstrumentId,
        requested: Amount,
        held: Amount,
    },

    #[error("amount overflow while pricing trade")]
    Overflow,
}
