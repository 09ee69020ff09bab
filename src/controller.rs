use crate::client::{HttpSnapshotSource, SnapshotSource};
use crate::config::{DashboardConfig, TimeRange};
use crate::error::Result;
use crate::output::RenderedFrame;
use crate::render::{render, show_error};
use crate::stats::{RefreshStats, RefreshStatsCollector};
use crate::view::DashboardView;
use chrono::Utc;
use futures::stream::StreamExt;
use std::sync::{Arc, Mutex, MutexGuard, RwLock, Weak};
use std::time::Instant;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    Idle,
    Fetching { show_loading: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Another refresh was in flight; nothing happened.
    Skipped,
    Rendered,
    NoData,
    Failed(String),
}

impl RefreshOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            RefreshOutcome::Skipped => "skipped",
            RefreshOutcome::Rendered => "rendered",
            RefreshOutcome::NoData => "no_data",
            RefreshOutcome::Failed(_) => "failed",
        }
    }
}

/// User interaction with the controls inside the bound region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlEvent {
    RefreshClicked,
    TimeRangeChanged(String),
}

/// A finished (not skipped) refresh cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedRefresh {
    pub cycle: u64,
    pub outcome: RefreshOutcome,
}

/// Owns one bound region: fetches snapshots and renders them into the view.
pub struct DashboardController {
    name: String,
    config: RwLock<DashboardConfig>,
    view: Mutex<Box<dyn DashboardView>>,
    source: Arc<dyn SnapshotSource>,
    state: Mutex<RefreshState>,
    state_watcher: watch::Sender<RefreshState>,
    completed: watch::Sender<Option<CompletedRefresh>>,
    stats: RefreshStatsCollector,
    refresh_timer: Mutex<Option<JoinHandle<()>>>,
    control_listener: Mutex<Option<JoinHandle<()>>>,
}

/// Returns the controller to `Idle` when dropped, whichever way the refresh ends.
struct FetchGuard<'a> {
    controller: &'a DashboardController,
}

impl Drop for FetchGuard<'_> {
    fn drop(&mut self) {
        self.controller.set_state(RefreshState::Idle);
    }
}

fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl DashboardController {
    pub fn new(
        name: impl Into<String>,
        config: DashboardConfig,
        view: Box<dyn DashboardView>,
        source: Arc<dyn SnapshotSource>,
    ) -> Self {
        let (state_tx, _) = watch::channel(RefreshState::Idle);
        let (completed_tx, _) = watch::channel(None);

        Self {
            name: name.into(),
            config: RwLock::new(config),
            view: Mutex::new(view),
            source,
            state: Mutex::new(RefreshState::Idle),
            state_watcher: state_tx,
            completed: completed_tx,
            stats: RefreshStatsCollector::new(),
            refresh_timer: Mutex::new(None),
            control_listener: Mutex::new(None),
        }
    }

    /// Controller fetching from the configured HTTP endpoint.
    pub fn with_http_source(
        name: impl Into<String>,
        config: DashboardConfig,
        view: Box<dyn DashboardView>,
    ) -> Result<Self> {
        let source = Arc::new(HttpSnapshotSource::new(config.endpoint.clone())?);
        Ok(Self::new(name, config, view, source))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> DashboardConfig {
        self.config
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn state(&self) -> RefreshState {
        *lock(&self.state)
    }

    pub fn watch_state(&self) -> watch::Receiver<RefreshState> {
        self.state_watcher.subscribe()
    }

    pub fn watch_completed(&self) -> watch::Receiver<Option<CompletedRefresh>> {
        self.completed.subscribe()
    }

    pub fn get_stats(&self) -> RefreshStats {
        self.stats.snapshot()
    }

    pub fn with_view<R>(&self, f: impl FnOnce(&dyn DashboardView) -> R) -> R {
        let view = lock(&self.view);
        f(&**view)
    }

    /// Current contents of the bound region.
    pub fn frame(&self, outcome: &RefreshOutcome) -> RenderedFrame {
        let errors = match outcome {
            RefreshOutcome::Failed(message) => vec![message.clone()],
            _ => Vec::new(),
        };
        let time_range = self.config().time_range;
        self.with_view(|view| {
            RenderedFrame::capture(&self.name, time_range.as_str(), outcome.label(), view, errors)
        })
    }

    fn set_state(&self, state: RefreshState) {
        *lock(&self.state) = state;
        self.state_watcher.send_replace(state);
    }

    /// Moves `Idle -> Fetching`, or returns `None` if a fetch is already in flight.
    fn try_begin(&self, show_loading: bool) -> Option<FetchGuard<'_>> {
        {
            let mut state = lock(&self.state);
            if *state != RefreshState::Idle {
                return None;
            }
            *state = RefreshState::Fetching { show_loading };
        }
        self.state_watcher
            .send_replace(RefreshState::Fetching { show_loading });

        if show_loading {
            lock(&self.view).show_loading();
        }

        Some(FetchGuard { controller: self })
    }

    /// Fetches one snapshot and renders it. A call made while another refresh is
    /// in flight returns [`RefreshOutcome::Skipped`] without side effects.
    pub async fn refresh(&self, show_loading: bool) -> RefreshOutcome {
        self.stats.record_requested();

        let Some(guard) = self.try_begin(show_loading) else {
            log::debug!("[{}] Refresh already in flight, dropping request", self.name);
            self.stats.record_skipped();
            return RefreshOutcome::Skipped;
        };

        let DashboardConfig {
            shop_id,
            time_range,
            ..
        } = self.config();

        let start_time = Instant::now();
        let result = self.source.fetch(&shop_id, time_range).await;
        let duration = start_time.elapsed();

        let outcome = {
            let mut view = lock(&self.view);
            match result {
                Ok(snapshot) => match render(&mut **view, snapshot.as_ref(), Utc::now()) {
                    Ok(()) => {
                        self.stats.record_success(duration);
                        RefreshOutcome::Rendered
                    }
                    Err(e) => {
                        log::warn!("[{}] {}", self.name, e);
                        self.stats.record_no_data(duration);
                        RefreshOutcome::NoData
                    }
                },
                Err(e) => {
                    log::error!("[{}] Analytics fetch error: {}", self.name, e);
                    let message = e.to_string();
                    show_error(&mut **view, &message);
                    self.stats.record_failure(duration);
                    RefreshOutcome::Failed(message)
                }
            }
        };

        self.completed.send_modify(|last| {
            let cycle = last.as_ref().map_or(1, |c| c.cycle + 1);
            *last = Some(CompletedRefresh {
                cycle,
                outcome: outcome.clone(),
            });
        });

        drop(guard);
        outcome
    }

    /// Switches the time range and refreshes with loading indicators.
    pub async fn set_time_range(&self, time_range: TimeRange) -> RefreshOutcome {
        {
            let mut config = self
                .config
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            config.time_range = time_range;
        }
        log::info!("[{}] Time range changed to {}", self.name, time_range);
        self.refresh(true).await
    }

    /// Wires the controls present in the view, refreshes once, then starts the
    /// silent auto-refresh timer.
    pub async fn initialize(
        self: &Arc<Self>,
        controls: mpsc::Receiver<ControlEvent>,
    ) -> RefreshOutcome {
        let (refresh_control, time_range_control) = self.with_view(|view| {
            (
                view.has_refresh_control(),
                view.time_range_control().is_some(),
            )
        });

        if refresh_control || time_range_control {
            let weak = Arc::downgrade(self);
            let listener = tokio::spawn(async move {
                tokio_stream::wrappers::ReceiverStream::new(controls)
                    .for_each(|event| {
                        let weak = weak.clone();
                        async move {
                            // Spawned so that a click during a fetch is dropped by
                            // the in-flight gate instead of waiting behind it.
                            tokio::spawn(handle_control(
                                weak,
                                event,
                                refresh_control,
                                time_range_control,
                            ));
                        }
                    })
                    .await;
            });
            if let Some(previous) = lock(&self.control_listener).replace(listener) {
                previous.abort();
            }
        }

        let config = self.config();
        log::info!(
            "[{}] Initializing (shop: {:?}, range: {}, every {}s)",
            self.name,
            config.shop_id,
            config.time_range,
            config.refresh_interval_secs
        );

        let outcome = self.refresh(true).await;
        self.start_auto_refresh();
        outcome
    }

    /// Arms the repeating silent refresh, replacing any timer already running.
    pub fn start_auto_refresh(self: &Arc<Self>) {
        let period = self.config().refresh_interval();
        let weak: Weak<Self> = Arc::downgrade(self);

        let timer = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                let Some(controller) = weak.upgrade() else {
                    break;
                };
                log::debug!("[{}] Auto-refresh tick", controller.name);
                controller.refresh(false).await;
            }
        });

        if let Some(previous) = lock(&self.refresh_timer).replace(timer) {
            previous.abort();
        }
    }

    pub fn is_auto_refresh_running(&self) -> bool {
        lock(&self.refresh_timer)
            .as_ref()
            .is_some_and(|timer| !timer.is_finished())
    }

    /// Stops the timer and the control listener.
    pub fn shutdown(&self) {
        if let Some(timer) = lock(&self.refresh_timer).take() {
            timer.abort();
        }
        if let Some(listener) = lock(&self.control_listener).take() {
            listener.abort();
        }
        log::debug!("[{}] Shut down", self.name);
    }
}

async fn handle_control(
    weak: Weak<DashboardController>,
    event: ControlEvent,
    refresh_control: bool,
    time_range_control: bool,
) {
    let Some(controller) = weak.upgrade() else {
        return;
    };

    match event {
        ControlEvent::RefreshClicked if refresh_control => {
            controller.refresh(true).await;
        }
        ControlEvent::TimeRangeChanged(value) if time_range_control => {
            match value.parse::<TimeRange>() {
                Ok(range) => {
                    controller.set_time_range(range).await;
                }
                Err(e) => log::warn!("[{}] Ignoring time range change: {}", controller.name, e),
            }
        }
        other => log::debug!(
            "[{}] No control wired for {:?}, ignoring",
            controller.name,
            other
        ),
    }
}
