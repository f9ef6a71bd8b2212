//! Command-line argument parsing for the `flightsql` binary.

use clap::Parser;
use flightsql_adapter::config::{Config, ConnectionOptions};
use std::path::PathBuf;

/// Run SQL against a Flight SQL HTTP endpoint and print normalized results.
#[derive(Parser, Debug)]
#[command(name = "flightsql")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// SQL to execute
    #[arg(value_name = "SQL")]
    pub sql: Option<String>,

    /// Read SQL from a file (only .sql files other than initialize.sql run)
    #[arg(short = 'f', long, value_name = "PATH", conflicts_with = "sql")]
    pub file: Option<PathBuf>,

    /// Flight SQL HTTP endpoint, or "mock"
    #[arg(short = 'e', long, value_name = "URL")]
    pub endpoint: Option<String>,

    /// Return mock data instead of calling the endpoint
    #[arg(long)]
    pub mock: bool,

    /// Request timeout in milliseconds
    #[arg(short = 't', long, value_name = "MS")]
    pub timeout: Option<u64>,

    /// Authorization header value
    #[arg(long, value_name = "VALUE")]
    pub auth: Option<String>,

    /// Extra request header (repeatable)
    #[arg(short = 'H', long = "header", value_name = "NAME=VALUE", value_parser = parse_header)]
    pub headers: Vec<(String, String)>,

    /// Use named connection from config
    #[arg(short = 'c', long, value_name = "NAME")]
    pub connection: Option<String>,

    /// Config file path
    #[arg(long, value_name = "PATH", env = "FLIGHT_SQL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Rows per output batch
    #[arg(long, value_name = "N")]
    pub batch_size: Option<usize>,

    /// Probe the endpoint with a trivial query and print the outcome
    #[arg(long)]
    pub test_connection: bool,

    /// Print the declared options schema as JSON and exit
    #[arg(long)]
    pub options_schema: bool,
}

/// Parses `NAME=VALUE`.
fn parse_header(s: &str) -> std::result::Result<(String, String), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("Invalid header '{s}'. Expected NAME=VALUE"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("Invalid header '{s}'. Header name is empty"));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path to use.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::default_path)
    }

    /// Returns the named connection to use, if specified.
    pub fn connection_name(&self) -> Option<&str> {
        self.connection.as_deref()
    }

    /// Converts CLI flags to connection options, used as overrides.
    pub fn to_connection_options(&self) -> ConnectionOptions {
        let mut options = ConnectionOptions {
            endpoint: self.endpoint.clone(),
            mock: self.mock,
            auth: self.auth.clone(),
            ..Default::default()
        };
        if let Some(timeout) = self.timeout {
            options.timeout_ms = timeout;
        }
        for (name, value) in &self.headers {
            options.headers.insert(name.clone(), value.clone());
        }
        options
    }

    /// Resolves the final connection options with precedence:
    /// 1. CLI flags (highest)
    /// 2. Named connection from config
    /// 3. Default connection from config
    /// 4. Environment variables
    pub fn resolve_options(
        &self,
        config: &Config,
    ) -> std::result::Result<ConnectionOptions, String> {
        let mut options = match self.connection_name() {
            Some(name) => config
                .get_connection(Some(name))
                .cloned()
                .ok_or_else(|| format!("Connection '{name}' not found in config file"))?,
            None => config.get_connection(None).cloned().unwrap_or_default(),
        };

        options.merge(&self.to_connection_options());
        options.override_timeout(self.timeout);
        options.apply_env_defaults();
        Ok(options)
    }

    /// Checks that there is something to do.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.options_schema || self.test_connection {
            return Ok(());
        }
        if self.sql.is_none() && self.file.is_none() {
            return Err("Nothing to run. Pass SQL, --file, or --test-connection".to_string());
        }
        Ok(())
    }
}
