//! Configuration management for the Flight SQL adapter.
//!
//! Connection options are supplied per call by the embedding frontend.
//! Process-wide settings (mock override, batch size, mock latency) live in
//! [`AdapterConfig`], which is passed explicitly to every query so that
//! nothing below the entry points reads the environment.

use crate::error::{AdapterError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Environment variable that forces mock mode regardless of options.
pub const MOCK_ENV_VAR: &str = "FLIGHT_SQL_MOCK";

/// Environment variable supplying the endpoint when options leave it unset.
pub const ENDPOINT_ENV_VAR: &str = "FLIGHT_SQL_ENDPOINT";

/// Endpoint value that selects mock mode.
pub const MOCK_ENDPOINT: &str = "mock";

/// Placeholder endpoint advertised in the options schema.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:8080/api/sql";

/// Default request timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Default number of rows per batch in the batch view.
pub const DEFAULT_BATCH_SIZE: usize = 100_000;

/// Main configuration file structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Process-wide adapter settings.
    #[serde(default)]
    pub adapter: AdapterConfig,

    /// Named connections.
    #[serde(default)]
    pub connections: HashMap<String, ConnectionOptions>,
}

impl Config {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("flightsql-adapter")
            .join("config.toml")
    }

    /// Loads configuration from a TOML file. A missing file yields defaults.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| AdapterError::config(format!("Failed to read config file: {e}")))?;

        Self::parse_toml(&content, path)
    }

    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            AdapterError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })
    }

    /// Gets a named connection, or the default connection if name is None.
    pub fn get_connection(&self, name: Option<&str>) -> Option<&ConnectionOptions> {
        let key = name.unwrap_or("default");
        self.connections.get(key)
    }
}

/// Per-call connection options, as declared to the embedding framework.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionOptions {
    /// HTTP endpoint URL, or `"mock"`. Required in live mode.
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Return synthetic data instead of calling the endpoint.
    #[serde(default)]
    pub mock: bool,

    /// Request timeout in milliseconds.
    #[serde(rename = "timeout", default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Authorization header value, forwarded verbatim.
    #[serde(default)]
    pub auth: Option<String>,

    /// Extra request headers. Applied after `auth`, so they win on collision.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            endpoint: None,
            mock: false,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            auth: None,
            headers: BTreeMap::new(),
        }
    }
}

impl ConnectionOptions {
    /// Creates options pointing at the given endpoint.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::default().with_endpoint(endpoint)
    }

    /// Creates options that select mock mode.
    pub fn mock() -> Self {
        Self {
            mock: true,
            ..Self::default()
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_auth(mut self, auth: impl Into<String>) -> Self {
        self.auth = Some(auth.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Returns the timeout in milliseconds. Zero means unset and falls
    /// back to the default.
    pub fn effective_timeout_ms(&self) -> u64 {
        match self.timeout_ms {
            0 => DEFAULT_TIMEOUT_MS,
            ms => ms,
        }
    }

    /// Returns the request timeout as a Duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.effective_timeout_ms())
    }

    /// Returns true if the endpoint is the literal mock marker.
    pub fn endpoint_is_mock(&self) -> bool {
        self.endpoint.as_deref() == Some(MOCK_ENDPOINT)
    }

    /// Validates the endpoint for live mode and returns the parsed URL.
    pub fn live_endpoint(&self) -> Result<Url> {
        let raw = self
            .endpoint
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AdapterError::config("Missing required option: endpoint"))?;

        let url = Url::parse(raw)
            .map_err(|e| AdapterError::config(format!("Invalid endpoint '{raw}': {e}")))?;

        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(AdapterError::config(format!(
                "Invalid endpoint scheme '{other}'. Expected 'http' or 'https'"
            ))),
        }
    }

    /// Merges another set of options into this one, with the other taking precedence.
    ///
    /// The timeout is not merged: a default value cannot be told apart from
    /// an explicit one here. Callers holding an explicit timeout apply it
    /// afterwards with [`ConnectionOptions::override_timeout`].
    pub fn merge(&mut self, other: &ConnectionOptions) {
        if other.endpoint.is_some() {
            self.endpoint = other.endpoint.clone();
        }
        if other.mock {
            self.mock = true;
        }
        if other.auth.is_some() {
            self.auth = other.auth.clone();
        }
        for (name, value) in &other.headers {
            self.headers.insert(name.clone(), value.clone());
        }
    }

    /// Replaces the timeout when an explicit value is given.
    pub fn override_timeout(&mut self, timeout_ms: Option<u64>) {
        if let Some(timeout_ms) = timeout_ms {
            self.timeout_ms = timeout_ms;
        }
    }

    /// Applies `FLIGHT_SQL_ENDPOINT` when no endpoint is set.
    pub fn apply_env_defaults(&mut self) {
        if self.endpoint.is_none() {
            self.endpoint = std::env::var(ENDPOINT_ENV_VAR).ok();
        }
    }

    /// Returns a display-safe description (no credentials) for logs.
    pub fn display_string(&self) -> String {
        let endpoint = self.endpoint.as_deref().unwrap_or("<unset>");
        let header_names: Vec<&str> = self.headers.keys().map(String::as_str).collect();
        format!(
            "endpoint={endpoint} mock={} timeout={}ms auth={} headers=[{}]",
            self.mock,
            self.effective_timeout_ms(),
            if self.auth.is_some() { "set" } else { "none" },
            header_names.join(",")
        )
    }
}

/// Inclusive range of artificial mock latency, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatencyRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl LatencyRange {
    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    /// No artificial delay.
    pub const fn none() -> Self {
        Self::new(0, 0)
    }
}

impl Default for LatencyRange {
    fn default() -> Self {
        Self::new(5, 20)
    }
}

/// Process-wide adapter settings threaded through every call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdapterConfig {
    /// Forces mock mode regardless of connection options.
    #[serde(default)]
    pub mock_override: bool,

    /// Rows per batch in the batch view.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Artificial latency applied by the mock generator.
    #[serde(default)]
    pub mock_latency: LatencyRange,
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            mock_override: false,
            batch_size: DEFAULT_BATCH_SIZE,
            mock_latency: LatencyRange::default(),
        }
    }
}

impl AdapterConfig {
    /// Default settings with the environment override applied.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_defaults();
        config
    }

    pub fn with_mock_override(mut self, mock_override: bool) -> Self {
        self.mock_override = mock_override;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_mock_latency(mut self, latency: LatencyRange) -> Self {
        self.mock_latency = latency;
        self
    }

    /// Sets `mock_override` when `FLIGHT_SQL_MOCK` is truthy. Never clears it.
    pub fn apply_env_defaults(&mut self) {
        if let Ok(value) = std::env::var(MOCK_ENV_VAR) {
            if parse_flag(&value) {
                self.mock_override = true;
            }
        }
    }
}

/// Parses a boolean environment flag (`true` or `1`, case-insensitive).
pub fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "true" | "1")
}
