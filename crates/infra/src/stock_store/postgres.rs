//! PostgreSQL stock backend.
//!
//! Stock lives in a table with (at least) these columns:
//!
//! ```sql
//! CREATE TABLE inventory (
//!     sku        TEXT PRIMARY KEY,
//!     stock      BIGINT NOT NULL CHECK (stock >= 0),
//!     updated_at TIMESTAMPTZ
//! );
//! ```
//!
//! ## Conditional batch write
//!
//! The whole batch is one `UPDATE ... FROM UNNEST(...)` statement whose `WHERE`
//! clause carries the condition (`stock >= qty`). Rows that fail the condition
//! (or do not exist) are simply not returned; if fewer rows come back than were
//! requested the transaction is rolled back and the batch reports
//! `ConditionFailed`. Concurrent writers on the same SKU queue on the row lock
//! and re-check the condition after it is released, so the loser observes the
//! failed condition instead of driving stock negative.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | BackendError |
//! |------------|----------------------|--------------|
//! | Database | `42501` (insufficient privilege) | `AccessDenied` |
//! | Database | `40001`, `40P01`, `55P03` (contention) | `Throttled` |
//! | Database | `23514` (check violation) | `ConditionFailed` |
//! | Database | other | `Other` |
//! | PoolClosed / PoolTimedOut / Io / Tls | N/A | `Transport` |
//! | Other | N/A | `Other` |

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use tracing::instrument;

use stockline_inventory::ConsumedCapacity;

use super::transactional::{BackendError, BackendOperation, ConditionalDecrement, StockBackend};
use crate::config::{validate_table_name, ConfigError};

/// Postgres-backed conditional stock writes.
///
/// The `StockBackend` trait is synchronous; calls are bridged onto the tokio
/// runtime the service runs in and must come from a blocking-capable thread
/// (e.g. `tokio::task::spawn_blocking`).
#[derive(Debug, Clone)]
pub struct PostgresStockBackend {
    pool: Arc<PgPool>,
    table: String,
}

impl PostgresStockBackend {
    /// Create a backend over an existing pool. `table` must be a plain
    /// identifier (it is interpolated into SQL).
    pub fn new(pool: PgPool, table: impl Into<String>) -> Result<Self, ConfigError> {
        let table = table.into();
        validate_table_name(&table)?;
        Ok(Self {
            pool: Arc::new(pool),
            table,
        })
    }

    /// Create a backend with a lazily connecting pool (no IO until first use).
    ///
    /// Must be called from within a tokio runtime.
    pub fn connect_lazy(database_url: &str, table: impl Into<String>) -> Result<Self, ConfigError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect_lazy(database_url)
            .map_err(|e| ConfigError::Invalid {
                key: "DATABASE_URL",
                message: e.to_string(),
            })?;
        Self::new(pool, table)
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    fn block_on<F, T>(&self, fut: F) -> Result<T, BackendError>
    where
        F: std::future::Future<Output = Result<T, BackendError>>,
    {
        let handle = tokio::runtime::Handle::try_current().map_err(|_| {
            BackendError::Transport(
                "PostgresStockBackend requires async runtime (tokio). Ensure you're calling from within a tokio runtime context.".to_string(),
            )
        })?;
        handle.block_on(fut)
    }

    // Errors are not logged here; the store picks their severity.
    #[instrument(skip(self), fields(table = %self.table))]
    pub async fn describe_async(&self) -> Result<(), BackendError> {
        let row = sqlx::query("SELECT 1 AS present FROM pg_catalog.pg_class WHERE oid = to_regclass($1)")
            .bind(&self.table)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error(BackendOperation::Describe, e))?;

        match row {
            Some(_) => Ok(()),
            None => Err(BackendError::Other {
                code: "ResourceNotFound".to_string(),
                message: format!("table {} not found", self.table),
            }),
        }
    }

    #[instrument(skip(self, batch), fields(table = %self.table, batch_size = batch.len()))]
    pub async fn transact_decrement_async(
        &self,
        batch: &[ConditionalDecrement],
        now: DateTime<Utc>,
    ) -> Result<ConsumedCapacity, BackendError> {
        let op = BackendOperation::TransactWrite;
        let skus: Vec<String> = batch.iter().map(|d| d.sku.clone()).collect();
        let quantities: Vec<i64> = batch.iter().map(|d| d.quantity).collect();

        let mut tx = self.pool.begin().await.map_err(|e| map_sqlx_error(op, e))?;

        let sql = format!(
            r#"
            UPDATE {table} AS s
            SET stock = s.stock - d.qty, updated_at = $3
            FROM UNNEST($1::text[], $2::bigint[]) AS d(sku, qty)
            WHERE s.sku = d.sku AND s.stock >= d.qty
            RETURNING s.sku
            "#,
            table = self.table
        );

        let rows = sqlx::query(&sql)
            .bind(&skus)
            .bind(&quantities)
            .bind(now)
            .fetch_all(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error(op, e))?;

        if rows.len() < batch.len() {
            tx.rollback().await.map_err(|e| map_sqlx_error(op, e))?;

            let updated: HashSet<String> = rows
                .iter()
                .filter_map(|r| r.try_get::<String, _>("sku").ok())
                .collect();
            let sku = batch.iter().find(|d| !updated.contains(&d.sku)).map(|d| d.sku.clone());
            return Err(BackendError::ConditionFailed { sku });
        }

        tx.commit().await.map_err(|e| map_sqlx_error(op, e))?;

        Ok(ConsumedCapacity {
            table: self.table.clone(),
            write_units: rows.len() as f64,
        })
    }
}

impl StockBackend for PostgresStockBackend {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn describe(&self) -> Result<(), BackendError> {
        self.block_on(self.describe_async())
    }

    fn transact_decrement(
        &self,
        batch: &[ConditionalDecrement],
        now: DateTime<Utc>,
    ) -> Result<ConsumedCapacity, BackendError> {
        self.block_on(self.transact_decrement_async(batch, now))
    }

    fn close(&self) -> Result<(), BackendError> {
        let pool = self.pool.clone();
        self.block_on(async move {
            pool.close().await;
            Ok(())
        })
    }
}

fn map_sqlx_error(operation: BackendOperation, err: sqlx::Error) -> BackendError {
    match err {
        sqlx::Error::Database(db_err) => {
            let message = format!("database error in {}: {}", operation, db_err.message());
            let code = db_err.code().map(|c| c.into_owned()).unwrap_or_default();
            match code.as_str() {
                "42501" => BackendError::AccessDenied { operation, message },
                "40001" | "40P01" | "55P03" => BackendError::Throttled(message),
                // Stock check constraint tripped: same meaning as a failed condition.
                "23514" => BackendError::ConditionFailed { sku: None },
                _ => BackendError::Other { code, message },
            }
        }
        sqlx::Error::PoolClosed => BackendError::Transport(format!("connection pool closed in {operation}")),
        sqlx::Error::PoolTimedOut => BackendError::Transport(format!("connection pool timed out in {operation}")),
        sqlx::Error::Io(e) => BackendError::Transport(format!("io error in {operation}: {e}")),
        sqlx::Error::Tls(e) => BackendError::Transport(format!("tls error in {operation}: {e}")),
        other => BackendError::Other {
            code: "sqlx".to_string(),
            message: format!("sqlx error in {operation}: {other}"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use tracing::Level;

    use crate::test_support::capture_events;

    #[test]
    fn pool_failures_map_to_transport() {
        assert!(matches!(
            map_sqlx_error(BackendOperation::TransactWrite, sqlx::Error::PoolClosed),
            BackendError::Transport(_)
        ));
        assert!(matches!(
            map_sqlx_error(BackendOperation::Describe, sqlx::Error::PoolTimedOut),
            BackendError::Transport(_)
        ));
    }

    #[test]
    fn unexpected_errors_map_to_other() {
        assert!(matches!(
            map_sqlx_error(BackendOperation::TransactWrite, sqlx::Error::RowNotFound),
            BackendError::Other { .. }
        ));
    }

    #[test]
    fn sync_calls_outside_a_runtime_report_transport_failure() {
        // Building the pool needs a runtime; calling through the sync trait
        // from a plain thread afterwards must fail cleanly.
        let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        let backend = rt
            .block_on(async { PostgresStockBackend::connect_lazy("postgres://localhost/stock", "inventory") })
            .unwrap();

        assert!(matches!(backend.describe(), Err(BackendError::Transport(_))));
    }

    #[test]
    fn table_name_is_validated() {
        let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        let result = rt.block_on(async {
            PostgresStockBackend::connect_lazy("postgres://localhost/stock", "inventory; --")
        });
        assert!(matches!(result, Err(ConfigError::Invalid { key: "INVENTORY_TABLE", .. })));
    }

    #[test]
    fn failed_backend_calls_leave_severity_to_the_store() {
        let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        let backend = rt
            .block_on(async {
                let pool = PgPoolOptions::new()
                    .acquire_timeout(Duration::from_millis(200))
                    .connect_lazy("postgres://stockline@127.0.0.1:1/stock")?;
                Ok::<_, sqlx::Error>(PostgresStockBackend::new(pool, "inventory"))
            })
            .unwrap()
            .unwrap();
        let batch = [ConditionalDecrement {
            sku: "A".to_string(),
            quantity: 1,
        }];

        let ((describe, transact), logs) = capture_events(|| {
            rt.block_on(async {
                (
                    backend.describe_async().await,
                    backend.transact_decrement_async(&batch, Utc::now()).await,
                )
            })
        });

        assert!(matches!(describe, Err(BackendError::Transport(_))));
        assert!(matches!(transact, Err(BackendError::Transport(_))));
        assert_eq!(logs.count(Level::ERROR), 0);
    }
}
