use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, ValueEnum};

use ledger::TradeSide;
use market::{Amount, InstrumentId};
use scheduler::{FetchMode, SchedulerConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FetchModeCli {
    PerInstrument,
    Batch,
}

#[derive(Debug, Parser)]
#[clap(name = "oracle-desk", version)]
pub struct Cli {
    /// Seconds between two price polls
    #[clap(long, env = "DESK_POLL_SECS", default_value_t = 30)]
    pub poll_secs: u64,

    /// JSON price tape to replay; the built-in demo tape is used when unset
    #[clap(long, env = "DESK_REPLAY_FILE")]
    pub replay: Option<PathBuf>,

    /// Cash the simulated portfolio starts with
    #[clap(long, env = "DESK_STARTING_CASH", default_value = "10000")]
    pub starting_cash: Amount,

    #[clap(long, value_enum, default_value_t = FetchModeCli::PerInstrument)]
    pub fetch_mode: FetchModeCli,

    /// One JSON object per log line
    #[clap(long, env = "DESK_JSON_LOGS")]
    pub json_logs: bool,

    /// Alert bounds as `ID:UPPER:LOWER`; leave a bound empty to skip it
    #[clap(long = "alert")]
    pub alerts: Vec<AlertArg>,

    /// Trade placed once the first prices are in, as `buy:ID:QTY` or `sell:ID:QTY`
    #[clap(long = "trade")]
    pub trades: Vec<TradeArg>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertArg {
    pub instrument: InstrumentId,
    pub upper: Option<Amount>,
    pub lower: Option<Amount>,
}

impl FromStr for AlertArg {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(':');
        let (Some(id), Some(upper), Some(lower), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            anyhow::bail!("expected ID:UPPER:LOWER, got {s:?}");
        };

        Ok(Self {
            instrument: InstrumentId::new(id.trim()),
            upper: parse_bound(upper).context("upper bound")?,
            lower: parse_bound(lower).context("lower bound")?,
        })
    }
}

fn parse_bound(raw: &str) -> anyhow::Result<Option<Amount>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    Ok(Some(raw.parse()?))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeArg {
    pub side: TradeSide,
    pub instrument: InstrumentId,
    pub quantity: Amount,
}

impl FromStr for TradeArg {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(':');
        let (Some(side), Some(id), Some(qty), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            anyhow::bail!("expected SIDE:ID:QTY, got {s:?}");
        };

        Ok(Self {
            side: side.trim().parse()?,
            instrument: InstrumentId::new(id.trim()),
            quantity: qty.trim().parse().context("trade quantity")?,
        })
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub scheduler: SchedulerConfig,

    /// Replay tape path. `None` selects the built-in demo tape.
    pub replay: Option<PathBuf>,

    pub starting_cash: Amount,

    /// JSON logs for production, pretty output otherwise.
    pub json_logs: bool,

    pub alerts: Vec<AlertArg>,
    pub trades: Vec<TradeArg>,
}

impl AppConfig {
    pub fn from_cli(cli: Cli) -> Self {
        let is_production = std::env::var("APP_ENV").unwrap_or_default() == "production";

        let fetch_mode = match cli.fetch_mode {
            FetchModeCli::PerInstrument => FetchMode::PerInstrument,
            FetchModeCli::Batch => FetchMode::Batch,
        };

        Self {
            scheduler: SchedulerConfig {
                poll_every: Duration::from_secs(cli.poll_secs.max(1)),
                fetch_mode,
                ..SchedulerConfig::default()
            },
            replay: cli.replay,
            starting_cash: cli.starting_cash,
            json_logs: cli.json_logs || is_production,
            alerts: cli.alerts,
            trades: cli.trades,
        }
    }
}
