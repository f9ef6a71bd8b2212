//! flightsql - run SQL against a Flight SQL HTTP endpoint from the shell.

mod cli;

use anyhow::{bail, Context};
use cli::Cli;
use flightsql_adapter::config::Config;
use flightsql_adapter::error::AdapterError;
use flightsql_adapter::logging;
use flightsql_adapter::query::{self, ConnectionStatus, NormalizedResult};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    // A missing .env file is fine.
    let _ = dotenvy::dotenv();
    logging::init_stderr_logging();

    if let Err(e) = run().await {
        match e.downcast_ref::<AdapterError>() {
            Some(adapter_err) => error!("{}: {:#}", adapter_err.category(), e),
            None => error!("{:#}", e),
        }
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse_args();
    cli.validate().map_err(anyhow::Error::msg)?;

    if cli.options_schema {
        println!("{}", serde_json::to_string_pretty(&query::options_schema_json())?);
        return Ok(());
    }

    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let config = Config::load_from_file(&config_path)?;

    let mut adapter_config = config.adapter.clone();
    adapter_config.apply_env_defaults();
    if let Some(batch_size) = cli.batch_size {
        adapter_config.batch_size = batch_size;
    }

    let options = cli.resolve_options(&config).map_err(anyhow::Error::msg)?;
    info!("Connection: {}", options.display_string());

    if cli.test_connection {
        let status = query::test_connection(&options, &adapter_config).await;
        println!("{}", serde_json::to_string_pretty(&status)?);
        if let ConnectionStatus::Failed { reason } = status {
            bail!("Connection test failed: {reason}");
        }
        return Ok(());
    }

    let result = if let Some(path) = &cli.file {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read query file {}", path.display()))?;
        let runner = query::get_runner(options, adapter_config.clone())?;
        match runner.run(&content, &path.to_string_lossy()).await? {
            Some(result) => result,
            None => {
                warn!("Skipping {}: not a query file", path.display());
                return Ok(());
            }
        }
    } else {
        let sql = cli.sql.as_deref().unwrap_or_default();
        query::execute(sql, &options, &adapter_config).await?
    };

    print_result(result, adapter_config.batch_size)
}

/// Prints metadata, then rows batch by batch, as one JSON document.
fn print_result(result: NormalizedResult, batch_size: usize) -> anyhow::Result<()> {
    let (metadata, batches) = result.into_parts(batch_size);
    let mut rows = Vec::with_capacity(metadata.row_count);
    for batch in batches {
        rows.extend(batch);
    }

    let output = serde_json::json!({
        "rowCount": metadata.row_count,
        "columnTypes": metadata.column_types,
        "data": rows,
        "executionTimeMs": metadata.execution_time.as_millis() as u64,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
