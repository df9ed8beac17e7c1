use thiserror::Error;

use crate::amount::Amount;
use crate::types::InstrumentId;

/// Lookup and configuration errors raised by the market core.
///
/// All of them are recoverable: the caller can retry with corrected input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MarketError {
    #[error("unknown instrument: {0}")]
    UnknownInstrument(InstrumentId),

    #[error("invalid alert threshold: upper {upper} must exceed lower {lower}")]
    InvalidThreshold { upper: Amount, lower: Amount },

    #[error("instrument registered twice: {0}")]
    DuplicateInstrument(InstrumentId),

    #[error("price point for {found} appended under {expected}")]
    InstrumentMismatch {
        expected: InstrumentId,
        found: InstrumentId,
    },
}

/// Per-instrument, per-tick fetch failure reported by a [`crate::PriceSource`].
///
/// Transient by nature; the poll scheduler logs it and moves on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("price feed unavailable for {instrument}: {reason}")]
    Unavailable {
        instrument: InstrumentId,
        reason: String,
    },

    #[error("price fetch timed out for {instrument}")]
    Timeout { instrument: InstrumentId },

    #[error("malformed price for {instrument}: {reason}")]
    Malformed {
        instrument: InstrumentId,
        reason: String,
    },

    #[error("batch price fetch failed: {reason}")]
    Batch { reason: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    #[error("invalid amount {input:?}: {reason}")]
    Parse { input: String, reason: String },

    #[error("amount must not be negative: {0}")]
    Negative(String),

    #[error("amount {0} has more than 18 fractional digits")]
    TooPrecise(String),

    #[error("amount out of range")]
    Overflow,
}
