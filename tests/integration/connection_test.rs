//! Connection test integration tests.
//!
//! `test_connection` must never fail; it reports a reason instead.

use flightsql_adapter::config::{AdapterConfig, ConnectionOptions, LatencyRange};
use flightsql_adapter::query::{get_runner, test_connection, ConnectionStatus};

use super::support::{refused_endpoint, spawn_hanging_server, spawn_server};

fn config() -> AdapterConfig {
    AdapterConfig::default().with_mock_latency(LatencyRange::none())
}

#[tokio::test]
async fn test_connection_mock_mode() {
    let status = test_connection(&ConnectionOptions::mock(), &config()).await;
    assert_eq!(status, ConnectionStatus::Connected);
}

#[tokio::test]
async fn test_connection_live_success() {
    let mut server = spawn_server(200, r#"{"columns":["test"],"results":[[1]]}"#).await;
    let status = test_connection(&ConnectionOptions::new(&server.url), &config()).await;
    assert!(status.is_connected());

    let request = server.requests.recv().await.unwrap();
    assert_eq!(request.json_body()["query"], "SELECT 1 as test");
}

#[tokio::test]
async fn test_connection_refused() {
    let endpoint = refused_endpoint().await;
    let status = test_connection(&ConnectionOptions::new(endpoint), &config()).await;

    let reason = status.reason().expect("refused endpoint must fail").to_lowercase();
    assert!(
        reason.contains("refused") || reason.contains("cannot connect"),
        "Unexpected reason: {reason}"
    );
}

#[tokio::test]
async fn test_connection_not_found() {
    let server = spawn_server(404, "").await;
    let status = test_connection(&ConnectionOptions::new(&server.url), &config()).await;
    assert_eq!(
        status.reason(),
        Some("Flight SQL endpoint not found - check the URL")
    );
}

#[tokio::test]
async fn test_connection_timeout() {
    let endpoint = spawn_hanging_server().await;
    let options = ConnectionOptions::new(endpoint).with_timeout_ms(100);
    let status = test_connection(&options, &config()).await;
    assert!(status.reason().unwrap().contains("timed out"));
}

#[tokio::test]
async fn test_connection_missing_endpoint() {
    let status = test_connection(&ConnectionOptions::default(), &config()).await;
    assert!(status.reason().unwrap().contains("endpoint"));
}

#[tokio::test]
async fn test_connection_status_json() {
    let endpoint = refused_endpoint().await;
    let status = test_connection(&ConnectionOptions::new(endpoint), &config()).await;
    let json = serde_json::to_value(&status).unwrap();
    assert!(json["reason"].is_string());
}

#[tokio::test]
async fn test_runner_against_live_endpoint() {
    let server = spawn_server(200, r#"{"columns":["a"],"results":[[1],[2],[3]]}"#).await;
    let runner = get_runner(ConnectionOptions::new(&server.url), config()).unwrap();

    assert!(runner.run("SELECT a", "pages/sales.md").await.unwrap().is_none());
    let result = runner.run("SELECT a", "queries/a.sql").await.unwrap().unwrap();
    assert_eq!(result.row_count, 3);
}
