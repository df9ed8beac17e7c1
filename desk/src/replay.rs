//! Price source that replays a recorded tape.
//!
//! Tape format: one array per instrument, read in a loop.
//!
//! ```json
//! { "BTC_USD": ["67000.5", "67120", null], "EUR_USD": ["1.0842"] }
//! ```
//!
//! `null` entries simulate an unavailable feed for that tick. Entries are
//! parsed when replayed, so a value that is not a valid amount surfaces as a
//! malformed reading on its tick rather than rejecting the whole tape.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use async_trait::async_trait;
use parking_lot::Mutex;

use market::{Amount, AmountError, FeedDescriptor, FetchError, InstrumentId, PriceSource};

const DEMO_TAPE: &str = r#"{
    "BTC_USD": ["67012.25", "67140.5", "66980", "67305.75", null, "67410", "67222.125", "67598"],
    "ETH_USD": ["3480.5", "3492.1", "3475.85", "3501.2", "3512.05", "3499.9"],
    "EUR_USD": ["1.0842", "1.0839", "1.0851", "0", "1.0846", "1.0857", "1.0849"]
}"#;

pub struct ReplaySource {
    tape: HashMap<InstrumentId, Vec<Option<String>>>,
    cursors: Mutex<HashMap<InstrumentId, usize>>,
}

impl ReplaySource {
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let tape: HashMap<InstrumentId, Vec<Option<String>>> =
            serde_json::from_str(json).context("failed to parse replay tape")?;

        if let Some((id, _)) = tape.iter().find(|(_, prices)| prices.is_empty()) {
            anyhow::bail!("replay tape has no entries for {id}");
        }

        Ok(Self {
            tape,
            cursors: Mutex::new(HashMap::new()),
        })
    }

    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read replay tape {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("invalid replay tape {}", path.display()))
    }

    /// A short loop of realistic BTC, ETH and EUR quotes, including one gap
    /// and one empty reading.
    pub fn demo() -> anyhow::Result<Self> {
        Self::from_json(DEMO_TAPE)
    }
}

#[async_trait]
impl PriceSource for ReplaySource {
    fn name(&self) -> &str {
        "replay"
    }

    async fn fetch_price(&self, feed: &FeedDescriptor) -> Result<Amount, FetchError> {
        let id = feed.id();
        let Some(prices) = self.tape.get(id) else {
            return Err(FetchError::Unavailable {
                instrument: id.clone(),
                reason: "not on replay tape".to_string(),
            });
        };

        let position = {
            let mut cursors = self.cursors.lock();
            let cursor = cursors.entry(id.clone()).or_insert(0);
            let position = *cursor % prices.len();
            *cursor += 1;
            position
        };

        let Some(raw) = &prices[position] else {
            return Err(FetchError::Unavailable {
                instrument: id.clone(),
                reason: format!("gap at replay position {position}"),
            });
        };

        raw.parse().map_err(|e: AmountError| FetchError::Malformed {
            instrument: id.clone(),
            reason: e.to_string(),
        })
    }
}
