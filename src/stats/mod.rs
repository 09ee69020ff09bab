pub mod collector;
pub mod snapshot;

pub use collector::RefreshStatsCollector;
pub use snapshot::RefreshStats;
