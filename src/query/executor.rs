//! Query execution entry points.
//!
//! `execute` runs the full pipeline: dispatch, fetch or synthesize,
//! normalize, map column types, package. Errors propagate unchanged.
//! `test_connection` is the one place errors are caught.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::time::Instant;
use tracing::{debug, error, info};

use super::column_types::map_column_types;
use super::normalize::normalize_rows;
use super::result::NormalizedResult;
use crate::config::{AdapterConfig, ConnectionOptions, DEFAULT_ENDPOINT, DEFAULT_TIMEOUT_MS};
use crate::db::{self, QueryBackend, QueryMode, RawQueryResult};
use crate::error::{AdapterError, Result, TransportKind};

/// SQL used to probe connectivity.
pub const CONNECTION_TEST_SQL: &str = "SELECT 1 as test";

/// Executes `sql` and returns a normalized result.
pub async fn execute(
    sql: &str,
    options: &ConnectionOptions,
    config: &AdapterConfig,
) -> Result<NormalizedResult> {
    let backend = db::connect(options, config)?;
    execute_with(backend.as_ref(), sql).await
}

/// Executes `sql` against an already constructed backend.
pub async fn execute_with(backend: &dyn QueryBackend, sql: &str) -> Result<NormalizedResult> {
    let mode = backend.mode();
    let start = Instant::now();
    debug!(%mode, sql, "Executing query");

    match backend.fetch(sql).await {
        Ok(raw) => {
            let result = package(raw, start);
            info!(
                %mode,
                rows = result.rows.len(),
                row_count = result.row_count,
                columns = result.column_types.len(),
                elapsed_ms = result.execution_time.as_millis() as u64,
                "Query completed"
            );
            Ok(result)
        }
        Err(e) => {
            error!(
                %mode,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Query failed: {}",
                e
            );
            Err(e)
        }
    }
}

/// Normalizes rows, maps column types and resolves the row count.
fn package(raw: RawQueryResult, start: Instant) -> NormalizedResult {
    let RawQueryResult {
        columns,
        mut rows,
        declared_row_count,
    } = raw;

    normalize_rows(&mut rows);
    let column_types = map_column_types(&columns, &rows);
    let row_count = declared_row_count
        .filter(|&n| n > 0)
        .unwrap_or(rows.len());

    NormalizedResult {
        rows,
        row_count,
        column_types,
        execution_time: start.elapsed(),
    }
}

/// Outcome of a connectivity probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connected,
    Failed { reason: String },
}

impl ConnectionStatus {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Connected => None,
            Self::Failed { reason } => Some(reason),
        }
    }
}

/// Serializes as `true` or `{"reason": "..."}`.
impl Serialize for ConnectionStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Connected => serializer.serialize_bool(true),
            Self::Failed { reason } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("reason", reason)?;
                map.end()
            }
        }
    }
}

/// Runs a trivial query through the full pipeline. Never returns an error.
pub async fn test_connection(options: &ConnectionOptions, config: &AdapterConfig) -> ConnectionStatus {
    let mode = db::dispatch(options, config);
    info!(%mode, endpoint = options.endpoint.as_deref().unwrap_or("<unset>"), "Testing connection");

    match execute(CONNECTION_TEST_SQL, options, config).await {
        Ok(result) => {
            // Drain the batch view the way a cursor consumer would.
            let _ = result.into_batches(config.batch_size).count();
            info!(%mode, "Connection test successful");
            ConnectionStatus::Connected
        }
        Err(e) => {
            error!(%mode, "Connection test failed: {}", e);
            ConnectionStatus::Failed {
                reason: failure_reason(mode, &e),
            }
        }
    }
}

/// Picks a user-facing reason for a failed connection test.
pub fn failure_reason(mode: QueryMode, err: &AdapterError) -> String {
    if mode == QueryMode::Mock {
        return "Mock mode connection test failed - check mock configuration".to_string();
    }

    match err {
        AdapterError::Transport {
            kind: TransportKind::Connect,
            message,
            ..
        } => {
            if message.to_lowercase().contains("refused") {
                "Cannot connect to Flight SQL endpoint (connection refused) - is the server running?"
                    .to_string()
            } else {
                format!("Cannot connect to Flight SQL endpoint - is the server running? ({message})")
            }
        }
        AdapterError::Transport {
            status: Some(404), ..
        } => "Flight SQL endpoint not found - check the URL".to_string(),
        AdapterError::Timeout { timeout_ms } => {
            format!("Flight SQL endpoint timed out after {timeout_ms}ms")
        }
        AdapterError::Configuration(msg) => msg.clone(),
        other => {
            let msg = other.to_string();
            if msg.is_empty() {
                "Connection failed".to_string()
            } else {
                msg
            }
        }
    }
}

/// A query runner bound to one set of options.
///
/// Mirrors the frontend's runner contract: it receives every source file
/// and only executes `.sql` files other than `initialize.sql`.
#[derive(Debug, Clone)]
pub struct Runner {
    options: ConnectionOptions,
    config: AdapterConfig,
}

impl Runner {
    pub fn options(&self) -> &ConnectionOptions {
        &self.options
    }

    /// Returns true if the runner executes files at this path.
    pub fn accepts(query_path: &str) -> bool {
        query_path.ends_with(".sql") && !query_path.ends_with("initialize.sql")
    }

    /// Executes the file content, or returns `None` for paths it skips.
    pub async fn run(&self, query_content: &str, query_path: &str) -> Result<Option<NormalizedResult>> {
        if !Self::accepts(query_path) {
            debug!(query_path, "Skipping non-query file");
            return Ok(None);
        }
        execute(query_content, &self.options, &self.config)
            .await
            .map(Some)
    }
}

/// Validates the options and returns a runner for them.
///
/// Live mode requires a valid endpoint; the check happens here so that a
/// misconfigured source fails before any query is attempted.
pub fn get_runner(options: ConnectionOptions, config: AdapterConfig) -> Result<Runner> {
    let mode = db::dispatch(&options, &config);
    if mode == QueryMode::Live {
        let endpoint = options.live_endpoint().map_err(|e| {
            error!("Invalid flight-sql-http options: {}", e);
            e
        })?;
        info!(%endpoint, "Initializing Flight SQL datasource");
    } else {
        info!("Initializing Flight SQL datasource in mock mode");
    }
    Ok(Runner { options, config })
}

/// Value type of a declared option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionKind {
    String,
    Number,
    Boolean,
}

/// One option as declared to the embedding framework.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionSpec {
    #[serde(skip)]
    pub name: &'static str,
    pub title: &'static str,
    #[serde(rename = "type")]
    pub kind: OptionKind,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    pub description: &'static str,
    pub secret: bool,
}

/// Returns the options schema, keyed by option name in declaration order.
pub fn options_schema() -> Vec<OptionSpec> {
    vec![
        OptionSpec {
            name: "endpoint",
            title: "Flight SQL HTTP Endpoint",
            kind: OptionKind::String,
            required: true,
            default: Some(serde_json::Value::from(DEFAULT_ENDPOINT)),
            description: "HTTP endpoint URL for Flight SQL queries (e.g., http://localhost:8080/api/sql)",
            secret: false,
        },
        OptionSpec {
            name: "timeout",
            title: "Query Timeout (ms)",
            kind: OptionKind::Number,
            required: false,
            default: Some(serde_json::Value::from(DEFAULT_TIMEOUT_MS)),
            description: "Maximum time to wait for query execution",
            secret: false,
        },
        OptionSpec {
            name: "mock",
            title: "Mock Mode",
            kind: OptionKind::Boolean,
            required: false,
            default: Some(serde_json::Value::from(false)),
            description: "Return sample data instead of making HTTP calls",
            secret: false,
        },
        OptionSpec {
            name: "auth",
            title: "Authorization",
            kind: OptionKind::String,
            required: false,
            default: None,
            description: "Authorization header value forwarded with every request",
            secret: true,
        },
    ]
}

/// Renders the options schema as a JSON object keyed by option name.
pub fn options_schema_json() -> serde_json::Value {
    let mut map = serde_json::Map::new();
    for option in options_schema() {
        let value = serde_json::to_value(&option).unwrap_or(serde_json::Value::Null);
        map.insert(option.name.to_string(), value);
    }
    serde_json::Value::Object(map)
}
