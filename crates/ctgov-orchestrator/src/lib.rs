//! ctgov-orchestrator
//!
//! Drives one full or delta load end to end: opens the API Client stream,
//! validates and transforms each record, flushes per-table batches through
//! the Connector, and records the run's outcome.

pub mod cancel;
pub mod config;
pub mod error;

use std::sync::atomic::Ordering;
use std::time::Instant;

use ctgov_client::ApiClient;
use ctgov_connector::PgConnector;
use ctgov_domain::{LoadStatus, RunMetrics, Table};
use ctgov_transform::Batches;

pub use cancel::CancellationFlag;
pub use config::{LoadType, OrchestratorConfig};
pub use error::OrchestratorError;

pub async fn run_etl(
    connector: &mut PgConnector,
    client: &ApiClient,
    load_type: LoadType,
    config: &OrchestratorConfig,
    cancel: &CancellationFlag,
) -> Result<RunMetrics, OrchestratorError> {
    let start = Instant::now();
    let mut metrics = RunMetrics::default();

    let updated_since = match load_type {
        LoadType::Full => None,
        LoadType::Delta => connector.get_last_successful_load_timestamp().await?.map(|dt| dt.date_naive()),
    };
    log::info!("starting {load_type:?} load (updated_since={updated_since:?})");

    let (mut rx, retry_count) = client.stream(updated_since);
    let result = run_inner(connector, &mut rx, config, cancel, &mut metrics).await;

    metrics.retry_count = retry_count.load(Ordering::Relaxed);
    metrics.wall_clock_ms = start.elapsed().as_millis() as u64;

    match result {
        Ok(()) => {
            connector.commit().await?;
            connector.record_load_history(LoadStatus::Success, &metrics).await?;
            log::info!(
                "load complete: fetched={} valid={} invalid={} retries={}",
                metrics.studies_fetched,
                metrics.studies_valid,
                metrics.studies_invalid,
                metrics.retry_count
            );
            Ok(metrics)
        }
        Err(e) => {
            log::warn!("load failed, rolling back: {e}");
            if let Err(rollback_err) = connector.rollback().await {
                log::error!("rollback itself failed: {rollback_err}");
            }
            metrics.error = Some(e.to_string());
            if let Err(lh_err) = connector.record_load_history(LoadStatus::Failure, &metrics).await {
                log::error!("failed to record FAILURE load-history row: {lh_err}");
            }
            Err(e)
        }
    }
}

async fn run_inner(
    connector: &mut PgConnector,
    rx: &mut tokio::sync::mpsc::Receiver<Result<serde_json::Value, ctgov_client::ClientError>>,
    config: &OrchestratorConfig,
    cancel: &CancellationFlag,
    metrics: &mut RunMetrics,
) -> Result<(), OrchestratorError> {
    connector.begin().await?;
    let mut batches = Batches::default();

    while let Some(item) = rx.recv().await {
        if cancel.is_cancelled() {
            log::warn!("cancellation requested, aborting run");
            return Err(OrchestratorError::Cancelled);
        }

        let raw = item?;
        metrics.studies_fetched += 1;

        match ctgov_transform::validate(&raw) {
            Ok((study, raw_study)) => {
                ctgov_transform::transform(study, raw_study, &raw, &mut batches)?;
                metrics.studies_valid += 1;
            }
            Err(validation_err) => {
                log::warn!("validation failed for {:?}: {validation_err}", ctgov_transform::extract_nct_id(&raw));
                connector.record_failed_study(validation_err.nct_id.as_deref(), &raw, &validation_err.to_string()).await?;
                metrics.studies_invalid += 1;
                continue;
            }
        }

        if batches.raw_studies.len() >= config.batch_size_rows || Table::ALL.iter().any(|t| batches.len(*t) >= config.batch_size_rows) {
            flush_batches(connector, &mut batches, metrics).await?;
        }
    }

    flush_batches(connector, &mut batches, metrics).await?;
    Ok(())
}

/// Flushes every non-empty buffer in FK-safe order: `raw_studies` and
/// `studies` merge before any child table references them. Triggered either
/// when one table's buffer crosses the batch threshold or at end of stream.
async fn flush_batches(connector: &mut PgConnector, batches: &mut Batches, metrics: &mut RunMetrics) -> Result<(), OrchestratorError> {
    for table in Table::ALL {
        if batches.len(table) == 0 {
            continue;
        }
        let batch = batches.take(table);
        connector.bulk_load_staging(&batch).await?;
        let merged = connector.execute_merge(table).await?;
        *metrics.rows_merged.entry(table.name().to_string()).or_insert(0) += merged;
        log::info!("flushed {} rows into {}", merged, table.name());
    }
    Ok(())
}
