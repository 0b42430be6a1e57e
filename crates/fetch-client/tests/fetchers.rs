//! Integration tests for the fetchers against a mock HTTP server and a
//! temporary data directory.

use fetch_client::{FetchError, Fetcher, HttpFetcher, LocalFetcher};
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_http_fetch_returns_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/public/data/collaborative.csv"))
        .respond_with(ResponseTemplate::new(200).set_body_string("articleId,rec1\n1,2\n"))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::builder().base_url(server.uri()).build().unwrap();
    let body = fetcher
        .get_text("/public/data/collaborative.csv")
        .await
        .unwrap();

    assert_eq!(body, "articleId,rec1\n1,2\n");
}

#[tokio::test]
async fn test_http_fetch_passes_query_string() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/azure"))
        .and(query_param("userId", "7"))
        .and(query_param("articleId", "42"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[\"a\"]"))
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new();
    let url = format!("{}/azure?userId=7&articleId=42", server.uri());
    assert_eq!(fetcher.get_text(&url).await.unwrap(), "[\"a\"]");
}

#[tokio::test]
async fn test_http_fetch_non_success_status_is_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::builder().base_url(server.uri()).build().unwrap();
    let err = fetcher.get_text("/missing.csv").await.unwrap_err();

    match err {
        FetchError::Status { status, .. } => assert_eq!(status, 404),
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_http_fetch_connection_refused_is_request_error() {
    // Bind then drop a listener so the port is very likely closed
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let fetcher = HttpFetcher::new();
    let err = fetcher
        .get_text(&format!("http://{addr}/recs.json"))
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Request { .. }));
}

#[tokio::test]
async fn test_http_fetch_honours_configured_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("[]")
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::builder()
        .base_url(server.uri())
        .timeout(Duration::from_millis(100))
        .build()
        .unwrap();

    let err = fetcher.get_text("/slow.json").await.unwrap_err();
    assert!(matches!(err, FetchError::Request { .. }));
}

#[tokio::test]
async fn test_local_fetch_reads_under_root() {
    let dir = tempfile::tempdir().unwrap();
    let data_dir = dir.path().join("public").join("data");
    std::fs::create_dir_all(&data_dir).unwrap();
    std::fs::write(data_dir.join("content.csv"), "articleId,rec1\n9,10\n").unwrap();

    let fetcher = LocalFetcher::new(dir.path());
    let body = fetcher.get_text("/public/data/content.csv").await.unwrap();
    assert_eq!(body, "articleId,rec1\n9,10\n");

    let err = fetcher.get_text("/public/data/missing.csv").await.unwrap_err();
    assert!(matches!(err, FetchError::Io { .. }));
}
