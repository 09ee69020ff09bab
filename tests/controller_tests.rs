use analytics_dashboard::bootstrap::spawn_instance;
use analytics_dashboard::config::{DashboardConfig, TimeRange};
use analytics_dashboard::format::escape_html;
use analytics_dashboard::render::error_message;
use analytics_dashboard::{
    ControlEvent, DashboardController, DashboardView, MemoryView, RefreshOutcome, RefreshState,
    Region, Result, Section, Snapshot, SnapshotSource,
};
use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct CountingSource {
    calls: AtomicUsize,
    ranges: Mutex<Vec<TimeRange>>,
    delay: Duration,
}

impl CountingSource {
    fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            ranges: Mutex::new(Vec::new()),
            delay,
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SnapshotSource for CountingSource {
    async fn fetch(&self, _shop_id: &str, time_range: TimeRange) -> Result<Option<Snapshot>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.ranges.lock().unwrap().push(time_range);
        tokio::time::sleep(self.delay).await;
        Ok(Some(Snapshot::default()))
    }
}

/// Never answers, like an endpoint that accepts the request and hangs.
struct HangingSource;

#[async_trait]
impl SnapshotSource for HangingSource {
    async fn fetch(&self, _shop_id: &str, _time_range: TimeRange) -> Result<Option<Snapshot>> {
        std::future::pending().await
    }
}

fn config(endpoint: &str, refresh_interval_secs: u64) -> DashboardConfig {
    DashboardConfig {
        endpoint: endpoint.to_string(),
        shop_id: "demo-shop".to_string(),
        refresh_interval_secs,
        time_range: TimeRange::LastDay,
    }
}

async fn wait_for(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not met in time");
}

#[tokio::test]
async fn test_overlapping_refresh_is_dropped() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/stats"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "devices": [{ "type": "desktop", "count": 1 }] }))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let view = MemoryView::new().with_section(Section::Devices);
    let controller = DashboardController::with_http_source(
        "dashboard",
        config(&mock_server.uri(), 60),
        Box::new(view),
    )
    .unwrap();

    let (first, second) = tokio::join!(controller.refresh(true), controller.refresh(true));

    assert_eq!(first, RefreshOutcome::Rendered);
    assert_eq!(second, RefreshOutcome::Skipped);
    assert_eq!(controller.state(), RefreshState::Idle);

    let stats = controller.get_stats();
    assert_eq!(stats.requested, 2);
    assert_eq!(stats.skipped, 1);
    assert_eq!(stats.succeeded, 1);
}

#[tokio::test]
async fn test_failed_refresh_shows_error_and_releases_gate() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/stats"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&mock_server)
        .await;

    let view = MemoryView::with_all_sections().with_loading().with_loading();
    let controller = DashboardController::with_http_source(
        "dashboard",
        config(&mock_server.uri(), 60),
        Box::new(view),
    )
    .unwrap();

    let outcome = controller.refresh(true).await;
    assert_eq!(
        outcome,
        RefreshOutcome::Failed("API error: 500 Internal Server Error".to_string())
    );
    assert_eq!(controller.state(), RefreshState::Idle);

    let loading = controller.with_view(|v| v.loading());
    assert_eq!(loading.len(), 2);
    for slot in loading {
        assert_eq!(
            slot.replaced_by.as_deref(),
            Some(r#"<div class="analytics-error">Error loading analytics: API error: 500 Internal Server Error</div>"#)
        );
    }

    // Gate was released, so the next refresh fetches again.
    assert!(matches!(controller.refresh(false).await, RefreshOutcome::Failed(_)));
    assert_eq!(controller.get_stats().failed, 2);
}

#[tokio::test]
async fn test_null_response_is_no_data() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/stats"))
        .respond_with(ResponseTemplate::new(200).set_body_string("null"))
        .mount(&mock_server)
        .await;

    let view = MemoryView::new().with_loading();
    let controller = DashboardController::with_http_source(
        "widget",
        config(&mock_server.uri(), 60),
        Box::new(view),
    )
    .unwrap();

    assert_eq!(controller.refresh(true).await, RefreshOutcome::NoData);
    let loading = controller.with_view(|v| v.loading());
    assert!(loading[0].replaced_by.as_deref().unwrap().contains("No data available"));
}

#[tokio::test]
async fn test_silent_refresh_leaves_loading_hidden() {
    let source = CountingSource::new(Duration::ZERO);
    let view = MemoryView::new().with_loading();
    let controller =
        DashboardController::new("dashboard", config("http://unused", 60), Box::new(view), source.clone());

    assert_eq!(controller.refresh(false).await, RefreshOutcome::Rendered);
    assert!(!controller.with_view(|v| v.loading())[0].visible);

    assert_eq!(controller.refresh(true).await, RefreshOutcome::Rendered);
    assert!(controller.with_view(|v| v.loading())[0].visible);
    assert_eq!(source.calls(), 2);
}

#[tokio::test]
async fn test_state_transitions_are_published() {
    let source = CountingSource::new(Duration::from_millis(50));
    let controller = Arc::new(DashboardController::new(
        "dashboard",
        config("http://unused", 60),
        Box::new(MemoryView::new()),
        source,
    ));
    let mut states = controller.watch_state();

    let task = tokio::spawn({
        let controller = controller.clone();
        async move { controller.refresh(false).await }
    });

    states.changed().await.unwrap();
    assert_eq!(*states.borrow_and_update(), RefreshState::Fetching { show_loading: false });
    states.changed().await.unwrap();
    assert_eq!(*states.borrow_and_update(), RefreshState::Idle);

    assert_eq!(task.await.unwrap(), RefreshOutcome::Rendered);
    let completed = controller.watch_completed().borrow().clone().unwrap();
    assert_eq!(completed.cycle, 1);
    assert_eq!(completed.outcome, RefreshOutcome::Rendered);
}

#[tokio::test]
async fn test_time_range_change_refetches_with_new_range() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/stats"))
        .and(query_param("shop", "demo-shop"))
        .and(query_param("timeRange", "30d"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "metrics": { "visitors": 1500 }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let view = MemoryView::new().with_metric("visitors");
    let controller = DashboardController::with_http_source(
        "dashboard",
        config(&mock_server.uri(), 60),
        Box::new(view),
    )
    .unwrap();

    let outcome = controller.set_time_range(TimeRange::LastMonth).await;

    assert_eq!(outcome, RefreshOutcome::Rendered);
    assert_eq!(controller.config().time_range, TimeRange::LastMonth);
    assert_eq!(
        controller.with_view(|v| v.text(&Region::metric("visitors"))).as_deref(),
        Some("1,500")
    );
}

#[tokio::test]
async fn test_initialize_wires_present_controls_only() {
    let source = CountingSource::new(Duration::ZERO);
    let view = MemoryView::new().with_refresh_control();
    let controller = Arc::new(DashboardController::new(
        "dashboard",
        config("http://unused", 60),
        Box::new(view),
        source.clone(),
    ));
    let (tx, rx) = mpsc::channel(8);

    assert_eq!(controller.initialize(rx).await, RefreshOutcome::Rendered);
    assert_eq!(source.calls(), 1);
    assert!(controller.is_auto_refresh_running());

    tx.send(ControlEvent::RefreshClicked).await.unwrap();
    wait_for(|| source.calls() == 2).await;

    // No time-range selector in this view, so range changes are ignored.
    tx.send(ControlEvent::TimeRangeChanged("7d".to_string())).await.unwrap();
    tx.send(ControlEvent::RefreshClicked).await.unwrap();
    wait_for(|| source.calls() == 3).await;
    assert_eq!(controller.config().time_range, TimeRange::LastDay);

    controller.shutdown();
    assert!(!controller.is_auto_refresh_running());
}

#[tokio::test]
async fn test_time_range_control_applies_valid_values() {
    let source = CountingSource::new(Duration::ZERO);
    let view = MemoryView::new().with_time_range_control("24h");
    let controller = Arc::new(DashboardController::new(
        "widget",
        config("http://unused", 60),
        Box::new(view),
        source.clone(),
    ));
    let (tx, rx) = mpsc::channel(8);
    controller.initialize(rx).await;

    tx.send(ControlEvent::TimeRangeChanged("fortnight".to_string()))
        .await
        .unwrap();
    tx.send(ControlEvent::TimeRangeChanged("90d".to_string()))
        .await
        .unwrap();
    wait_for(|| source.calls() == 2).await;

    assert_eq!(controller.config().time_range, TimeRange::LastQuarter);
    assert_eq!(
        *source.ranges.lock().unwrap(),
        vec![TimeRange::LastDay, TimeRange::LastQuarter]
    );
    controller.shutdown();
}

#[tokio::test]
async fn test_auto_refresh_ticks_silently_and_stops_on_shutdown() {
    let source = CountingSource::new(Duration::ZERO);
    let view = MemoryView::new().with_loading();
    let controller = Arc::new(DashboardController::new(
        "dashboard",
        config("http://unused", 1),
        Box::new(view),
        source.clone(),
    ));

    // Re-arming replaces the running timer rather than adding a second one.
    controller.start_auto_refresh();
    controller.start_auto_refresh();

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(source.calls(), 1);
    assert!(!controller.with_view(|v| v.loading())[0].visible);

    controller.shutdown();
    tokio::time::sleep(Duration::from_millis(1200)).await;
    assert_eq!(source.calls(), 1);
}

#[tokio::test]
async fn test_connection_failure_shows_error_and_releases_gate() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let view = MemoryView::new().with_loading();
    let controller = DashboardController::with_http_source(
        "dashboard",
        config(&format!("http://127.0.0.1:{}", port), 60),
        Box::new(view),
    )
    .unwrap();

    let RefreshOutcome::Failed(message) = controller.refresh(true).await else {
        panic!("expected a failed refresh");
    };
    assert!(!message.is_empty());
    assert_eq!(controller.state(), RefreshState::Idle);

    let expected = format!(
        r#"<div class="analytics-error">{}</div>"#,
        escape_html(&error_message(&message))
    );
    assert_eq!(
        controller.with_view(|v| v.loading())[0].replaced_by.as_deref(),
        Some(expected.as_str())
    );

    assert!(matches!(controller.refresh(false).await, RefreshOutcome::Failed(_)));
    assert_eq!(controller.get_stats().failed, 2);
}

#[tokio::test]
async fn test_instances_initialize_independently() {
    let hanging = Arc::new(DashboardController::new(
        "dashboard",
        config("http://unused", 60),
        Box::new(MemoryView::new().with_loading()),
        Arc::new(HangingSource),
    ));
    let source = CountingSource::new(Duration::ZERO);
    let widget = Arc::new(DashboardController::new(
        "widget",
        config("http://unused", 60),
        Box::new(MemoryView::new()),
        source.clone(),
    ));

    let (_hanging_tx, hanging_rx) = mpsc::channel(1);
    let (_widget_tx, widget_rx) = mpsc::channel(1);
    let stuck = spawn_instance(hanging.clone(), hanging_rx);
    let started = spawn_instance(widget.clone(), widget_rx);

    let outcome = tokio::time::timeout(Duration::from_secs(5), started)
        .await
        .expect("widget initialization blocked")
        .unwrap();

    assert_eq!(outcome, RefreshOutcome::Rendered);
    assert_eq!(source.calls(), 1);
    assert!(widget.is_auto_refresh_running());
    assert_eq!(hanging.state(), RefreshState::Fetching { show_loading: true });
    assert!(!stuck.is_finished());

    stuck.abort();
    widget.shutdown();
}
