//! Live Flight SQL HTTP backend.
//!
//! One POST per query, no retries. The endpoint answers with either a
//! positional body (`{columns, results}`) or a named body
//! (`{data, columns, rowCount}`); both are resolved here into a single
//! [`RawQueryResult`].

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, warn};
use url::Url;

use super::{QueryBackend, QueryMode, RawColumn, RawQueryResult, Row, Value};
use crate::config::ConnectionOptions;
use crate::error::{error_chain, AdapterError, Result, TransportKind};

/// Maximum number of characters of a response body quoted in errors.
const BODY_SNIPPET_CHARS: usize = 512;

/// Request body sent to the endpoint.
#[derive(Debug, Serialize)]
struct QueryRequestBody<'a> {
    query: &'a str,
    timeout: u64,
}

/// A column entry on the wire: either a bare name or `{name, type}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WireColumn {
    Name(String),
    Typed {
        name: String,
        #[serde(rename = "type", default)]
        declared_type: Option<String>,
    },
}

impl From<WireColumn> for RawColumn {
    fn from(column: WireColumn) -> Self {
        match column {
            WireColumn::Name(name) => RawColumn::untyped(name),
            WireColumn::Typed {
                name,
                declared_type,
            } => RawColumn {
                name,
                declared_type,
            },
        }
    }
}

/// The two response shapes the endpoint may send.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WireResponse {
    /// `{columns: [...], results: [[v1, v2, ...], ...]}`
    Positional {
        columns: Vec<WireColumn>,
        results: Vec<Vec<serde_json::Value>>,
    },
    /// `{data: [{...}], columns: [{name, type}], rowCount}`
    Named {
        data: Vec<serde_json::Map<String, serde_json::Value>>,
        #[serde(default)]
        columns: Vec<WireColumn>,
        #[serde(rename = "rowCount", default)]
        row_count: Option<usize>,
    },
}

impl WireResponse {
    /// Parses a response body.
    pub fn parse(body: &str) -> serde_json::Result<Self> {
        serde_json::from_str(body)
    }

    /// Converts either shape into the canonical raw result.
    ///
    /// Positional rows are zipped with the column names: short rows are
    /// padded with null and extra positions are dropped.
    pub fn into_raw(self) -> RawQueryResult {
        match self {
            WireResponse::Positional { columns, results } => {
                let columns: Vec<RawColumn> = columns.into_iter().map(RawColumn::from).collect();
                let mut seen = HashSet::with_capacity(columns.len());
                let distinct_names = columns.iter().all(|c| seen.insert(c.name.as_str()));
                let mut reshaped = 0usize;
                let rows: Vec<Row> = results
                    .into_iter()
                    .map(|values| {
                        if values.len() != columns.len() {
                            reshaped += 1;
                        }
                        let mut values = values.into_iter();
                        let fields = columns.iter().map(|column| {
                            let value = values.next().map(Value::from_json).unwrap_or_default();
                            (column.name.clone(), value)
                        });
                        if distinct_names {
                            Row::from_unique_fields(fields.collect())
                        } else {
                            // Repeated column names: the last value wins.
                            fields.collect()
                        }
                    })
                    .collect();
                if reshaped > 0 {
                    warn!(
                        rows = reshaped,
                        columns = columns.len(),
                        "Positional rows did not match column count; padded or truncated"
                    );
                }
                RawQueryResult::new(columns, rows)
            }
            WireResponse::Named {
                data,
                columns,
                row_count,
            } => {
                let rows = data
                    .into_iter()
                    .map(|record| {
                        Row::from_unique_fields(
                            record
                                .into_iter()
                                .map(|(k, v)| (k, Value::from_json(v)))
                                .collect(),
                        )
                    })
                    .collect();
                RawQueryResult {
                    columns: columns.into_iter().map(RawColumn::from).collect(),
                    rows,
                    declared_row_count: row_count,
                }
            }
        }
    }
}

/// Live backend posting SQL to a Flight SQL HTTP endpoint.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    endpoint: Url,
    timeout_ms: u64,
    headers: HeaderMap,
}

impl HttpBackend {
    /// Validates the options and builds the HTTP client.
    ///
    /// Fails with a configuration error before any network I/O.
    pub fn new(options: &ConnectionOptions) -> Result<Self> {
        let endpoint = options.live_endpoint()?;
        let headers = build_headers(options)?;

        let client = Client::builder()
            .timeout(options.timeout())
            .build()
            .map_err(|e| {
                AdapterError::transport(
                    TransportKind::Request,
                    format!("Failed to create HTTP client: {}", error_chain(&e)),
                )
            })?;

        Ok(Self {
            client,
            endpoint,
            timeout_ms: options.effective_timeout_ms(),
            headers,
        })
    }

    /// Returns the endpoint URL.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn map_send_error(&self, e: reqwest::Error) -> AdapterError {
        if e.is_timeout() {
            AdapterError::timeout(self.timeout_ms)
        } else if e.is_connect() {
            AdapterError::transport(TransportKind::Connect, error_chain(&e))
        } else {
            AdapterError::transport(
                TransportKind::Request,
                format!("Request failed: {}", error_chain(&e)),
            )
        }
    }
}

/// Builds request headers. Extra headers are applied after the auth header,
/// so a colliding extra header wins.
fn build_headers(options: &ConnectionOptions) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    if let Some(auth) = &options.auth {
        let value = HeaderValue::from_str(auth)
            .map_err(|_| AdapterError::config("Invalid characters in auth header value"))?;
        headers.insert(AUTHORIZATION, value);
    }

    for (name, value) in &options.headers {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| AdapterError::config(format!("Invalid header name '{name}'")))?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|_| AdapterError::config(format!("Invalid value for header '{name}'")))?;
        headers.insert(header_name, header_value);
    }

    Ok(headers)
}

/// Truncates a body for inclusion in an error message.
fn snippet(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= BODY_SNIPPET_CHARS {
        return trimmed.to_string();
    }
    let mut out: String = trimmed.chars().take(BODY_SNIPPET_CHARS).collect();
    out.push_str("...");
    out
}

#[async_trait]
impl QueryBackend for HttpBackend {
    fn mode(&self) -> QueryMode {
        QueryMode::Live
    }

    async fn fetch(&self, sql: &str) -> Result<RawQueryResult> {
        let body = QueryRequestBody {
            query: sql,
            timeout: self.timeout_ms,
        };

        debug!(
            endpoint = %self.endpoint,
            headers = ?self.headers.keys().map(|k| k.as_str()).collect::<Vec<_>>(),
            "Sending Flight SQL request"
        );

        let response = self
            .client
            .post(self.endpoint.clone())
            .headers(self.headers.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            if e.is_timeout() {
                AdapterError::timeout(self.timeout_ms)
            } else {
                AdapterError::Transport {
                    status: Some(status.as_u16()),
                    kind: TransportKind::Request,
                    message: format!("Failed to read response: {}", error_chain(&e)),
                }
            }
        })?;

        if !status.is_success() {
            let reason = status.canonical_reason().unwrap_or("");
            let body = snippet(&text);
            let message = if body.is_empty() {
                format!("HTTP {}: {}", status.as_u16(), reason)
            } else {
                format!("HTTP {}: {} - {}", status.as_u16(), reason, body)
            };
            return Err(AdapterError::http_status(status.as_u16(), message));
        }

        let wire = WireResponse::parse(&text).map_err(|e| AdapterError::Transport {
            status: Some(status.as_u16()),
            kind: TransportKind::Decode,
            message: format!("Failed to parse response: {e} (body: {})", snippet(&text)),
        })?;

        Ok(wire.into_raw())
    }
}
