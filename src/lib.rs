//! Flight SQL adapter - runs SQL for a BI reporting frontend against a
//! Flight SQL HTTP service (or a mock) and returns normalized, typed rows.
//!
//! This library exposes the core modules for use by the binary and in
//! integration tests.

pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod query;

pub use config::{AdapterConfig, ConnectionOptions};
pub use error::{AdapterError, Result};
pub use query::{execute, test_connection, ConnectionStatus, NormalizedResult};
