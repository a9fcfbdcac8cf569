//! The Postgres connector: bulk-loads a batch of rows into an `UNLOGGED`
//! staging table via `COPY`, merges staging into the target table with
//! `ON CONFLICT`, and records dead-letter / load-history bookkeeping.
//!
//! One `PgConnector` owns at most one open transaction at a time. DLQ and
//! load-history writes that must survive a rollback of that transaction go
//! through a fresh, auxiliary connection instead.

use chrono::{DateTime, Utc};
use ctgov_domain::{LoadStatus, RunMetrics, Table, TableBatch};
use sqlx::{Pool, Postgres, Transaction};

use crate::csv::{encode_rows, CsvRow};
use crate::error::ConnectorError;
use crate::retry::with_retry;

/// Non-key columns merged on conflict; tables whose key is the entire row
/// (`conditions`, `intervention_arm_groups`) have nothing left to update.
fn merge_update_columns(table: Table) -> &'static [&'static str] {
    match table {
        Table::RawStudies => &["last_updated_api", "last_updated_api_str", "payload"],
        Table::Studies => &[
            "brief_title",
            "official_title",
            "overall_status",
            "start_date_raw",
            "start_date",
            "primary_completion_date_raw",
            "primary_completion_date",
            "study_type",
            "brief_summary",
        ],
        Table::Sponsors => &["is_lead"],
        Table::Conditions => &[],
        Table::Interventions => &["description"],
        Table::InterventionArmGroups => &[],
        Table::DesignOutcomes => &["time_frame", "description"],
    }
}

/// The domain columns shared by a table and its staging counterpart — the
/// same list `COPY` populates, used again here so the merge reads staging
/// by name rather than relying on positional column order.
fn table_columns(table: Table) -> &'static [&'static str] {
    match table {
        Table::RawStudies => ctgov_domain::RawStudy::columns(),
        Table::Studies => ctgov_domain::Study::columns(),
        Table::Sponsors => ctgov_domain::Sponsor::columns(),
        Table::Conditions => ctgov_domain::Condition::columns(),
        Table::Interventions => ctgov_domain::Intervention::columns(),
        Table::InterventionArmGroups => ctgov_domain::InterventionArmGroup::columns(),
        Table::DesignOutcomes => ctgov_domain::DesignOutcome::columns(),
    }
}

pub struct PgConnector {
    pool: Pool<Postgres>,
    tx: Option<Transaction<'static, Postgres>>,
}

impl PgConnector {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool, tx: None }
    }

    pub async fn begin(&mut self) -> Result<(), ConnectorError> {
        self.tx = Some(self.pool.begin().await?);
        Ok(())
    }

    pub async fn commit(&mut self) -> Result<(), ConnectorError> {
        if let Some(tx) = self.tx.take() {
            tx.commit().await?;
        }
        Ok(())
    }

    pub async fn rollback(&mut self) -> Result<(), ConnectorError> {
        if let Some(tx) = self.tx.take() {
            tx.rollback().await?;
        }
        Ok(())
    }

    fn tx_mut(&mut self) -> &mut Transaction<'static, Postgres> {
        self.tx.as_mut().expect("bulk_load_staging/execute_merge called outside a transaction")
    }

    /// Truncates the table's staging counterpart and COPYs the batch in.
    /// Returns the number of rows loaded.
    pub async fn bulk_load_staging(&mut self, batch: &TableBatch) -> Result<u64, ConnectorError> {
        let Some(table) = batch.table() else { return Ok(0) };
        if batch.is_empty() {
            return Ok(0);
        }

        let staging = table.staging_name();
        sqlx::query(&format!("TRUNCATE TABLE {staging}")).execute(&mut **self.tx_mut()).await?;

        let (columns, data) = match batch {
            TableBatch::Empty => return Ok(0),
            TableBatch::RawStudies(rows) => (ctgov_domain::RawStudy::columns(), encode_rows(rows)),
            TableBatch::Studies(rows) => (ctgov_domain::Study::columns(), encode_rows(rows)),
            TableBatch::Sponsors(rows) => (ctgov_domain::Sponsor::columns(), encode_rows(rows)),
            TableBatch::Conditions(rows) => (ctgov_domain::Condition::columns(), encode_rows(rows)),
            TableBatch::Interventions(rows) => (ctgov_domain::Intervention::columns(), encode_rows(rows)),
            TableBatch::InterventionArmGroups(rows) => (ctgov_domain::InterventionArmGroup::columns(), encode_rows(rows)),
            TableBatch::DesignOutcomes(rows) => (ctgov_domain::DesignOutcome::columns(), encode_rows(rows)),
        };

        let copy_sql = format!("COPY {staging} ({}) FROM STDIN WITH (FORMAT csv)", columns.join(","));
        let mut copy = self.tx_mut().copy_in_raw(&copy_sql).await?;
        copy.send(data.as_bytes()).await?;
        copy.finish().await?;

        Ok(batch.len() as u64)
    }

    /// Merges the table's staging rows into the target table and truncates
    /// staging afterward. Returns the number of rows upserted.
    pub async fn execute_merge(&mut self, table: Table) -> Result<u64, ConnectorError> {
        let staging = table.staging_name();
        let target = table.name();
        let keys = table.key_columns();
        let updates = merge_update_columns(table);

        let conflict_clause = if updates.is_empty() {
            format!("ON CONFLICT ({}) DO NOTHING", keys.join(","))
        } else {
            let set_clause = updates.iter().map(|c| format!("{c} = EXCLUDED.{c}")).collect::<Vec<_>>().join(", ");
            format!("ON CONFLICT ({}) DO UPDATE SET {set_clause}, updated_at = now()", keys.join(","))
        };

        let columns = table_columns(table).join(",");
        let sql = format!("INSERT INTO {target} ({columns}) SELECT {columns} FROM {staging} {conflict_clause}");
        let result = sqlx::query(&sql).execute(&mut **self.tx_mut()).await?;
        sqlx::query(&format!("TRUNCATE TABLE {staging}")).execute(&mut **self.tx_mut()).await?;
        Ok(result.rows_affected())
    }

    /// Records a rejected study on its own connection so the write survives
    /// a rollback of the run's main transaction.
    pub async fn record_failed_study(&self, nct_id: Option<&str>, payload: &serde_json::Value, error: &str) -> Result<(), ConnectorError> {
        sqlx::query("INSERT INTO dead_letter_queue (nct_id, payload, error, failed_at) VALUES ($1, $2, $3, now())")
            .bind(nct_id)
            .bind(payload)
            .bind(error)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Records one run's outcome. Always runs on its own connection: a
    /// SUCCESS row is written after the main transaction already committed,
    /// and a FAILURE row must survive that same transaction's rollback.
    pub async fn record_load_history(&self, status: LoadStatus, metrics: &RunMetrics) -> Result<(), ConnectorError> {
        let metrics_json = serde_json::to_value(metrics).map_err(|e| ConnectorError::Unknown(e.to_string()))?;
        sqlx::query("INSERT INTO load_history (status, metrics, run_at) VALUES ($1, $2, now())")
            .bind(status.as_db_str())
            .bind(metrics_json)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// The high-water mark for delta loads: the latest `lastUpdatePostDate`
    /// observed among studies loaded by a successful run.
    pub async fn get_last_successful_load_timestamp(&self) -> Result<Option<DateTime<Utc>>, ConnectorError> {
        with_retry(|| async {
            let row: Option<(Option<DateTime<Utc>>,)> =
                sqlx::query_as("SELECT MAX(run_at) FROM load_history WHERE status = 'SUCCESS'").fetch_optional(&self.pool).await?;
            Ok(row.and_then(|r| r.0))
        })
        .await
    }
}
