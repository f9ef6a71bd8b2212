//! Raw data layer for the adapter.
//!
//! Provides a trait-based interface over the two ways of obtaining rows:
//! the live Flight SQL HTTP endpoint and the mock generator.

mod http;
mod mock;
mod types;

pub use http::{HttpBackend, WireColumn, WireResponse};
pub use mock::{generate_mock_result, MockBackend, MockRule};
pub use types::{RawColumn, RawQueryResult, Row, Value};

use crate::config::{AdapterConfig, ConnectionOptions};
use crate::error::Result;
use async_trait::async_trait;
use std::fmt;

/// Operating mode chosen per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryMode {
    Live,
    Mock,
}

impl QueryMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Live => "LIVE",
            Self::Mock => "MOCK",
        }
    }
}

impl fmt::Display for QueryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Chooses mock or live mode. Never fails.
///
/// Mock wins if the options ask for it, the endpoint is `"mock"`, or the
/// process-wide override is set.
pub fn dispatch(options: &ConnectionOptions, config: &AdapterConfig) -> QueryMode {
    if options.mock || options.endpoint_is_mock() || config.mock_override {
        QueryMode::Mock
    } else {
        QueryMode::Live
    }
}

/// Creates the backend for the given options.
///
/// Live mode validates the endpoint here, before any network I/O.
pub fn connect(options: &ConnectionOptions, config: &AdapterConfig) -> Result<Box<dyn QueryBackend>> {
    match dispatch(options, config) {
        QueryMode::Mock => Ok(Box::new(MockBackend::new(config.mock_latency))),
        QueryMode::Live => Ok(Box::new(HttpBackend::new(options)?)),
    }
}

/// A source of raw query results.
#[async_trait]
pub trait QueryBackend: Send + Sync {
    /// Returns the mode this backend implements.
    fn mode(&self) -> QueryMode;

    /// Runs the SQL text and returns rows plus column metadata.
    async fn fetch(&self, sql: &str) -> Result<RawQueryResult>;
}
