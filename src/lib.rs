pub mod bootstrap;
pub mod client;
pub mod config;
pub mod controller;
pub mod error;
pub mod format;
pub mod output;
pub mod page;
pub mod render;
pub mod selector;
pub mod snapshot;
pub mod stats;
pub mod view;

pub use client::{HttpSnapshotSource, SnapshotSource};
pub use controller::{ControlEvent, DashboardController, RefreshOutcome, RefreshState};
pub use error::{Error, Result};
pub use snapshot::Snapshot;
pub use stats::{RefreshStats, RefreshStatsCollector};
pub use view::{DashboardView, MemoryView, Region, Section};
