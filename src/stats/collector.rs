use crate::stats::snapshot::RefreshStats;
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};
use std::time::{Duration, Instant};

#[derive(Clone)]
pub struct RefreshStatsCollector {
    requested: Arc<AtomicU64>,
    skipped: Arc<AtomicU64>,
    succeeded: Arc<AtomicU64>,
    failed: Arc<AtomicU64>,
    no_data: Arc<AtomicU64>,
    total_fetch_time_ms: Arc<AtomicU64>,
    start_time: Arc<Instant>,
}

impl Default for RefreshStatsCollector {
    fn default() -> Self {
        Self {
            requested: Arc::new(AtomicU64::new(0)),
            skipped: Arc::new(AtomicU64::new(0)),
            succeeded: Arc::new(AtomicU64::new(0)),
            failed: Arc::new(AtomicU64::new(0)),
            no_data: Arc::new(AtomicU64::new(0)),
            total_fetch_time_ms: Arc::new(AtomicU64::new(0)),
            start_time: Arc::new(Instant::now()),
        }
    }
}

impl RefreshStatsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_requested(&self) {
        self.requested.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_success(&self, duration: Duration) {
        self.succeeded.fetch_add(1, Ordering::SeqCst);
        self.add_fetch_time(duration);
    }

    pub fn record_no_data(&self, duration: Duration) {
        self.no_data.fetch_add(1, Ordering::SeqCst);
        self.add_fetch_time(duration);
    }

    pub fn record_failure(&self, duration: Duration) {
        self.failed.fetch_add(1, Ordering::SeqCst);
        self.add_fetch_time(duration);
    }

    fn add_fetch_time(&self, duration: Duration) {
        self.total_fetch_time_ms
            .fetch_add(duration.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> RefreshStats {
        let succeeded = self.succeeded.load(Ordering::SeqCst);
        let failed = self.failed.load(Ordering::SeqCst);
        let no_data = self.no_data.load(Ordering::SeqCst);
        let fetches = succeeded + failed + no_data;
        let total_time = self.total_fetch_time_ms.load(Ordering::SeqCst);

        RefreshStats {
            requested: self.requested.load(Ordering::SeqCst),
            skipped: self.skipped.load(Ordering::SeqCst),
            succeeded,
            failed,
            no_data,
            success_rate: if fetches > 0 {
                (succeeded as f64 / fetches as f64) * 100.0
            } else {
                0.0
            },
            avg_fetch_time_ms: if fetches > 0 { total_time / fetches } else { 0 },
            elapsed_seconds: self.start_time.elapsed().as_secs_f64(),
        }
    }
}
