pub mod clock;
pub mod runner;

pub use clock::{Clock, FixedClock, SystemClock};
pub use runner::{source_key, Collector, CollectorError, PassSummary, DEFAULT_LOOKBACK};
