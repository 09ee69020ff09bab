use analytics_dashboard::config::TimeRange;
use analytics_dashboard::{Error, HttpSnapshotSource, SnapshotSource};
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_fetch_builds_stats_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/analytics/stats"))
        .and(query_param("shop", "my shop&co"))
        .and(query_param("timeRange", "7d"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "metrics": { "visitors": 12 },
            "topPages": [{ "path": "/", "views": 3 }]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let source =
        HttpSnapshotSource::new(format!("{}/api/analytics", mock_server.uri())).unwrap();
    let snapshot = source
        .fetch("my shop&co", TimeRange::LastWeek)
        .await
        .unwrap()
        .expect("snapshot body");

    assert_eq!(snapshot.metrics["visitors"], json!(12));
    assert_eq!(snapshot.top_pages.len(), 1);
    assert!(snapshot.active_visitors.is_empty());
}

#[tokio::test]
async fn test_stats_url_encodes_shop() {
    let source = HttpSnapshotSource::new("https://example.com/api/analytics/").unwrap();
    let url = source.stats_url("a b/c", TimeRange::LastDay).unwrap();

    assert_eq!(url.path(), "/api/analytics/stats");
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    assert_eq!(
        pairs,
        vec![
            ("shop".to_string(), "a b/c".to_string()),
            ("timeRange".to_string(), "24h".to_string())
        ]
    );
}

#[tokio::test]
async fn test_non_success_status_is_api_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/stats"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&mock_server)
        .await;

    let source = HttpSnapshotSource::new(mock_server.uri()).unwrap();
    let err = source.fetch("shop", TimeRange::LastDay).await.unwrap_err();

    assert!(matches!(err, Error::Api { status: 500, .. }));
    assert_eq!(err.to_string(), "API error: 500 Internal Server Error");
}

#[tokio::test]
async fn test_null_body_is_no_snapshot() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/stats"))
        .respond_with(ResponseTemplate::new(200).set_body_string("null"))
        .mount(&mock_server)
        .await;

    let source = HttpSnapshotSource::new(mock_server.uri()).unwrap();
    let snapshot = source.fetch("shop", TimeRange::LastDay).await.unwrap();

    assert!(snapshot.is_none());
}

#[tokio::test]
async fn test_malformed_body_is_json_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/stats"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&mock_server)
        .await;

    let source = HttpSnapshotSource::new(mock_server.uri()).unwrap();
    let err = source.fetch("shop", TimeRange::LastDay).await.unwrap_err();

    assert!(matches!(err, Error::Json(_)));
}

#[tokio::test]
async fn test_api_error_keeps_server_reason_phrase() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = [0u8; 2048];
        let _ = socket.read(&mut request).await;
        socket
            .write_all(
                b"HTTP/1.1 503 Upstream Sleeping\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
            )
            .await
            .unwrap();
    });

    let source = HttpSnapshotSource::new(format!("http://{}", addr)).unwrap();
    let err = source.fetch("shop", TimeRange::LastDay).await.unwrap_err();

    assert!(matches!(err, Error::Api { status: 503, .. }));
    assert_eq!(err.to_string(), "API error: 503 Upstream Sleeping");
}
