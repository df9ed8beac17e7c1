//! Shared types used by the poll scheduler.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use market::{AlertEvent, InstrumentId};

/// Cadence used when nothing else is configured.
pub const DEFAULT_POLL_EVERY: Duration = Duration::from_secs(30);

/// How a tick asks the price source for prices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchMode {
    /// One fetch per instrument; a failure only affects that instrument.
    #[default]
    PerInstrument,
    /// One batch call; a failed batch updates nothing this tick.
    Batch,
}

/// Configuration knobs for the scheduler.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Interval between two ticks. The first tick fires immediately on start.
    pub poll_every: Duration,

    pub fetch_mode: FetchMode,

    /// Fetches slower than this are reported under the `performance` target.
    pub slow_fetch: Duration,

    /// A fetch still pending after this long fails with `FetchError::Timeout`
    /// so a hung feed cannot hold up the rest of the tick.
    pub fetch_timeout: Duration,

    /// Buffered tick reports per subscriber before lagging receivers skip ahead.
    pub report_capacity: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_every: DEFAULT_POLL_EVERY,
            fetch_mode: FetchMode::PerInstrument,
            slow_fetch: Duration::from_secs(5),
            fetch_timeout: Duration::from_secs(10),
            report_capacity: 64,
        }
    }
}

/// Outcome of one applied tick, published to subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TickReport {
    pub tick: u64,
    pub trace_id: String,
    pub started_at: DateTime<Utc>,
    /// Instruments whose price was stored this tick.
    pub updated: Vec<InstrumentId>,
    /// Instruments that returned an empty (zero) or out-of-order reading.
    pub skipped: Vec<InstrumentId>,
    /// Instruments whose fetch failed, with the reason.
    pub failed: Vec<(InstrumentId, String)>,
    pub alerts: Vec<AlertEvent>,
}

impl TickReport {
    pub(crate) fn new(tick: u64, trace_id: String, started_at: DateTime<Utc>) -> Self {
        Self {
            tick,
            trace_id,
            started_at,
            updated: Vec::new(),
            skipped: Vec::new(),
            failed: Vec::new(),
            alerts: Vec::new(),
        }
    }
}
