//! PostgreSQL realization of [`odata_storage::Transaction`]. Since the trait
//! takes `&mut self` on every operation (unlike the teacher's FHIR trait,
//! which took `&self` and needed a `Mutex` for interior mutability), the
//! wrapped `sqlx` transaction can be held directly.

use async_trait::async_trait;
use odata_core::{ArgValue, Error, OrderedEntity, Result};
use odata_sql::BuiltQuery;
use odata_storage::{check_cancelled, Transaction};
use sqlx_core::arguments::Arguments;
use sqlx_core::query::{query, Query};
use sqlx_core::row::Row;
use sqlx_postgres::{PgArguments, PgTransaction, Postgres};
use tokio_util::sync::CancellationToken;

use crate::storage::row_to_entity;

fn bind_query<'q>(mut q: Query<'q, Postgres, PgArguments>, built: &'q BuiltQuery) -> Query<'q, Postgres, PgArguments> {
    for value in built.args.values() {
        q = match value {
            ArgValue::Int64(v) => q.bind(v),
            ArgValue::Float64(v) => q.bind(v),
            ArgValue::String(v) => q.bind(v.as_str()),
            ArgValue::Bool(v) => q.bind(v),
            ArgValue::Bytes(v) => q.bind(v.as_slice()),
            ArgValue::Null => q.bind(Option::<i64>::None),
        };
    }
    q
}

/// Wraps a `sqlx` transaction. Dropping without an explicit commit/rollback
/// leaves sqlx's own `Drop` impl to issue the `ROLLBACK`.
pub struct PostgresTransaction {
    tx: Option<PgTransaction<'static>>,
}

impl PostgresTransaction {
    pub fn new(tx: PgTransaction<'static>) -> Self {
        Self { tx: Some(tx) }
    }

    fn tx_mut(&mut self) -> Result<&mut PgTransaction<'static>> {
        self.tx.as_mut().ok_or_else(|| Error::Execution("transaction already completed".into()))
    }
}

#[async_trait]
impl Transaction for PostgresTransaction {
    async fn fetch_rows(&mut self, built: &BuiltQuery, cancel: &CancellationToken) -> Result<Vec<OrderedEntity>> {
        check_cancelled(cancel)?;
        let tx = self.tx_mut()?;
        let rows = bind_query(query(&built.sql), built)
            .fetch_all(&mut *tx)
            .await
            .map_err(|e| Error::Execution(e.to_string()))?;
        rows.iter().map(row_to_entity).collect()
    }

    async fn execute(&mut self, built: &BuiltQuery, cancel: &CancellationToken) -> Result<u64> {
        check_cancelled(cancel)?;
        let tx = self.tx_mut()?;
        let result = bind_query(query(&built.sql), built)
            .execute(&mut *tx)
            .await
            .map_err(|e| Error::Execution(e.to_string()))?;
        Ok(result.rows_affected())
    }

    async fn commit(mut self: Box<Self>) -> Result<()> {
        let tx = self.tx.take().ok_or_else(|| Error::Execution("transaction already completed".into()))?;
        tx.commit().await.map_err(|e| Error::Execution(format!("commit failed: {e}")))?;
        tracing::debug!("transaction committed");
        Ok(())
    }

    async fn rollback(mut self: Box<Self>) -> Result<()> {
        let tx = self.tx.take().ok_or_else(|| Error::Execution("transaction already completed".into()))?;
        tx.rollback().await.map_err(|e| Error::Execution(format!("rollback failed: {e}")))?;
        tracing::debug!("transaction rolled back");
        Ok(())
    }
}
