//! Poll scheduler: drives the price source on a fixed cadence and fans each
//! result out to the history store, the alert engine and the price book.

pub mod book;
pub mod counters;
pub mod poller;
pub mod types;

pub use book::PriceBook;
pub use counters::{CounterSnapshot, PollCounters};
pub use poller::PollScheduler;
pub use types::{DEFAULT_POLL_EVERY, FetchMode, SchedulerConfig, TickReport};
