//! daily-store-metrics: one pipeline run
//!
//! Loads the staged orders, leads and web events, merges the combined daily
//! metrics into the fact table and optionally exports it as CSV.
//!
//! ## Usage
//! ```text
//! daily-store-metrics [CONFIG_PATH]
//! ```
//!
//! ## Configuration
//! - config.yaml in the working directory, then CONFIG_PATH, then the file
//!   named by STORE_METRICS_CONFIG
//! - STORE_METRICS__RUN__MODE=full|incremental and other
//!   STORE_METRICS__<SECTION>__<KEY> overrides
//! - STORE_METRICS_LOG: tracing filter (default: info)

use std::process::ExitCode;

use tracing::{error, info};

use daily_store_metrics::config::Config;
use daily_store_metrics::pipeline::Pipeline;
use daily_store_metrics::storage::init_fact_table;
use daily_store_metrics::utils::bootstrap::init_tracing;

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let config_path = std::env::args().nth(1);
    let config = match Config::load(config_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    let table = match init_fact_table(&config.storage).await {
        Ok(table) => table,
        Err(e) => {
            error!(error = %e, "Failed to open fact table");
            return ExitCode::FAILURE;
        }
    };
    let pipeline = Pipeline::new(table);

    let report = match pipeline.run_from_sources(&config.sources, &config.run).await {
        Ok(report) => report,
        Err(e) => {
            error!(
                stage = %e.stage,
                affected_keys = e.affected_keys,
                error = %e.cause,
                "Run failed, fact table unchanged"
            );
            return ExitCode::FAILURE;
        }
    };

    for stats in &report.sources {
        info!(
            source = %stats.source,
            events = stats.events_seen,
            dropped = stats.dropped_invalid_key,
            rows = stats.rows,
            "Source summary"
        );
    }
    info!(
        run_id = %report.run_id,
        mode = ?report.mode,
        as_of_date = %report.as_of_date,
        cutoff = ?report.cutoff,
        inserted = report.outcome.inserted,
        replaced = report.outcome.replaced,
        excluded = report.excluded,
        "daily-store-metrics run complete"
    );

    if let Some(dir) = &config.output.dir {
        if let Err(e) = pipeline.export(dir).await {
            error!(stage = %e.stage, error = %e.cause, "Export failed");
            return ExitCode::FAILURE;
        }
    }

    ExitCode::SUCCESS
}
