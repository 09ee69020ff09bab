use serde::{Deserialize, Serialize};

/// Point-in-time view of a controller's refresh counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RefreshStats {
    pub requested: u64,
    pub skipped: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub no_data: u64,
    pub success_rate: f64,
    pub avg_fetch_time_ms: u64,
    pub elapsed_seconds: f64,
}
