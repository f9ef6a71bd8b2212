//! Live-mode query tests.
//!
//! Exercise the HTTP round trip, both response shapes, and error paths.

use flightsql_adapter::config::{AdapterConfig, ConnectionOptions, LatencyRange};
use flightsql_adapter::db::{Row, Value};
use flightsql_adapter::error::{AdapterError, TransportKind};
use flightsql_adapter::query::{execute, ColumnTypeDescriptor, SemanticType, TypeFidelity};
use pretty_assertions::assert_eq;

use super::support::{refused_endpoint, spawn_hanging_server, spawn_server};

fn config() -> AdapterConfig {
    AdapterConfig::default().with_mock_latency(LatencyRange::none())
}

#[tokio::test]
async fn test_positional_round_trip() {
    let mut server = spawn_server(200, r#"{"columns":["a","b"],"results":[[1,"x"],[2,"y"]]}"#).await;
    let options = ConnectionOptions::new(&server.url);

    let result = execute("SELECT a, b FROM t", &options, &config()).await.unwrap();

    assert_eq!(result.row_count, 2);
    assert_eq!(
        result.rows,
        vec![
            Row::new().with("a", 1.0).with("b", "x"),
            Row::new().with("a", 2.0).with("b", "y"),
        ]
    );
    assert_eq!(
        result.column_types,
        vec![
            ColumnTypeDescriptor::new("a", SemanticType::Number, TypeFidelity::Inferred),
            ColumnTypeDescriptor::new("b", SemanticType::String, TypeFidelity::Inferred),
        ]
    );

    let request = server.requests.recv().await.unwrap();
    assert!(request.request_line.starts_with("POST /query"));
    assert_eq!(
        request.headers.get("content-type").map(String::as_str),
        Some("application/json")
    );
    let body = request.json_body();
    assert_eq!(body["query"], "SELECT a, b FROM t");
    assert_eq!(body["timeout"], 30000);
}

#[tokio::test]
async fn test_auth_and_extra_headers_forwarded() {
    let mut server = spawn_server(200, r#"{"columns":["a"],"results":[]}"#).await;
    let options = ConnectionOptions::new(&server.url)
        .with_auth("Bearer token-123")
        .with_header("X-Forwarded-User", "alice");

    execute("SELECT 1", &options, &config()).await.unwrap();

    let request = server.requests.recv().await.unwrap();
    assert_eq!(
        request.headers.get("authorization").map(String::as_str),
        Some("Bearer token-123")
    );
    assert_eq!(
        request.headers.get("x-forwarded-user").map(String::as_str),
        Some("alice")
    );
}

#[tokio::test]
async fn test_extra_header_overrides_auth() {
    let mut server = spawn_server(200, r#"{"columns":["a"],"results":[]}"#).await;
    let options = ConnectionOptions::new(&server.url)
        .with_auth("Bearer from-auth")
        .with_header("Authorization", "Bearer from-headers");

    execute("SELECT 1", &options, &config()).await.unwrap();

    let request = server.requests.recv().await.unwrap();
    assert_eq!(
        request.headers.get("authorization").map(String::as_str),
        Some("Bearer from-headers")
    );
}

#[tokio::test]
async fn test_empty_results_keep_declared_columns() {
    let server = spawn_server(200, r#"{"columns":["a","b"],"results":[]}"#).await;
    let options = ConnectionOptions::new(&server.url);

    let result = execute("SELECT a, b FROM t WHERE false", &options, &config())
        .await
        .unwrap();

    assert_eq!(result.row_count, 0);
    assert!(result.rows.is_empty());
    let names: Vec<&str> = result.column_types.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["a", "b"]);
}

#[tokio::test]
async fn test_named_shape_with_declared_types() {
    let body = r#"{
        "data": [{"price": 9.99, "sku": "A-1", "sold_at": "2024-03-01T10:00:00Z", "active": true}],
        "columns": [
            {"name": "price", "type": "DECIMAL(10,2)"},
            {"name": "sku", "type": "VARCHAR"},
            {"name": "sold_at", "type": "TIMESTAMP WITH TIME ZONE"},
            {"name": "active", "type": "BOOLEAN"}
        ],
        "rowCount": 250
    }"#;
    let server = spawn_server(200, body).await;
    let options = ConnectionOptions::new(&server.url);

    let result = execute("SELECT * FROM products", &options, &config()).await.unwrap();

    assert_eq!(result.row_count, 250);
    assert_eq!(result.rows.len(), 1);
    assert_eq!(
        result.column_types,
        vec![
            ColumnTypeDescriptor::new("price", SemanticType::Number, TypeFidelity::Precise),
            ColumnTypeDescriptor::new("sku", SemanticType::String, TypeFidelity::Precise),
            ColumnTypeDescriptor::new("sold_at", SemanticType::Date, TypeFidelity::Precise),
            ColumnTypeDescriptor::new("active", SemanticType::Boolean, TypeFidelity::Precise),
        ]
    );
}

#[tokio::test]
async fn test_named_shape_without_columns_infers_in_field_order() {
    let body = r#"{"data":[{"when":"2024-01-01T00:00:00","count":3,"ok":false}]}"#;
    let server = spawn_server(200, body).await;
    let options = ConnectionOptions::new(&server.url);

    let result = execute("SELECT 1 AS x", &options, &config()).await.unwrap();

    assert_eq!(
        result.column_types,
        vec![
            ColumnTypeDescriptor::new("when", SemanticType::Date, TypeFidelity::Inferred),
            ColumnTypeDescriptor::new("count", SemanticType::Number, TypeFidelity::Inferred),
            ColumnTypeDescriptor::new("ok", SemanticType::Boolean, TypeFidelity::Inferred),
        ]
    );
}

#[tokio::test]
async fn test_wide_integer_is_normalized_lossily() {
    let server = spawn_server(200, r#"{"columns":["n"],"results":[[9007199254740993]]}"#).await;
    let options = ConnectionOptions::new(&server.url);

    let result = execute("SELECT n FROM big", &options, &config()).await.unwrap();

    assert_eq!(
        result.rows[0].get("n"),
        Some(&Value::Number(9_007_199_254_740_992.0))
    );
}

#[tokio::test]
async fn test_non_2xx_is_transport_error_with_body() {
    let server = spawn_server(500, r#"{"error":"catalog offline"}"#).await;
    let options = ConnectionOptions::new(&server.url);

    let err = execute("SELECT 1", &options, &config()).await.unwrap_err();

    assert_eq!(err.status(), Some(500));
    let message = err.to_string();
    assert!(message.contains("HTTP 500"), "{message}");
    assert!(message.contains("catalog offline"), "{message}");
}

#[tokio::test]
async fn test_malformed_body_is_decode_error() {
    let server = spawn_server(200, "<html>gateway</html>").await;
    let options = ConnectionOptions::new(&server.url);

    let err = execute("SELECT 1", &options, &config()).await.unwrap_err();

    match err {
        AdapterError::Transport { status, kind, message } => {
            assert_eq!(status, Some(200));
            assert_eq!(kind, TransportKind::Decode);
            assert!(message.contains("gateway"), "{message}");
        }
        other => panic!("Expected decode error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_timeout_is_distinguished() {
    let endpoint = spawn_hanging_server().await;
    let options = ConnectionOptions::new(endpoint).with_timeout_ms(150);

    let err = execute("SELECT 1", &options, &config()).await.unwrap_err();

    assert!(err.is_timeout(), "Expected timeout, got {err:?}");
    assert!(err.is_transport());
}

#[tokio::test]
async fn test_refused_connection_is_transport_error() {
    let endpoint = refused_endpoint().await;
    let options = ConnectionOptions::new(endpoint).with_timeout_ms(2000);

    let err = execute("SELECT 1", &options, &config()).await.unwrap_err();

    assert!(
        matches!(
            err,
            AdapterError::Transport {
                kind: TransportKind::Connect,
                ..
            }
        ),
        "Expected connect error, got {err:?}"
    );
}

#[tokio::test]
async fn test_mock_override_skips_network() {
    let endpoint = refused_endpoint().await;
    let options = ConnectionOptions::new(endpoint);
    let config = config().with_mock_override(true);

    let result = execute("SELECT product, sales FROM t", &options, &config)
        .await
        .unwrap();

    assert_eq!(result.row_count, 6);
}
