//! Market-data core: instruments, fixed-point prices, bounded price history,
//! derived statistics and threshold alerts.

pub mod alerts;
pub mod amount;
pub mod error;
pub mod history;
pub mod registry;
pub mod source;
pub mod stats;
pub mod types;

pub use alerts::{ALERT_LOG_CAPACITY, AlertEngine, AlertEvent, AlertThreshold, BoundKind};
pub use amount::Amount;
pub use error::{AmountError, FetchError, MarketError};
pub use history::{AppendOutcome, HISTORY_DEPTH, HistoryStore};
pub use registry::FeedRegistry;
pub use source::{LatestPrice, PriceSource};
pub use stats::{PriceStats, StatsEngine};
pub use types::{Bucket, FeedDescriptor, Instrument, InstrumentId, PricePoint};
