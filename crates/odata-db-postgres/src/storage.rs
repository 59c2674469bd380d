//! PostgreSQL realization of [`odata_storage::DatabaseProvider`] (spec §6).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use odata_core::{ArgValue, Error, OrderedEntity, Result};
use odata_dialect::{resolve, Dialect};
use odata_sql::BuiltQuery;
use odata_storage::{check_cancelled, DatabaseProvider, Transaction};
use sqlx_core::arguments::Arguments;
use sqlx_core::column::Column;
use sqlx_core::query::{query, Query};
use sqlx_core::row::Row;
use sqlx_postgres::{PgArguments, PgPool, PgRow, Postgres};
use tokio_util::sync::CancellationToken;

use crate::config::PostgresConfig;
use crate::error::PostgresError;
use crate::pool;
use crate::transaction::PostgresTransaction;

/// A live PostgreSQL connection pool paired with the dialect it renders SQL
/// for (always `"postgres"`, but kept as a trait object for symmetry with
/// the other realizations this crate's sibling providers would add).
pub struct PostgresProvider {
    pool: PgPool,
    dialect: Box<dyn Dialect>,
}

impl PostgresProvider {
    pub async fn new(config: PostgresConfig) -> std::result::Result<Self, PostgresError> {
        let pool = pool::create_pool(&config).await?;
        Ok(Self::from_pool(pool))
    }

    /// Shares an existing pool, e.g. one already owned by another subsystem.
    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self {
            pool,
            dialect: resolve("postgres").expect("the postgres dialect is always registered"),
        }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Binds every `ArgValue` in `built.args` onto `q` in order, mirroring the
/// placeholder numbering `odata-sql` assigned when it built the SQL text.
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

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// `DatabaseProvider::fetch_rows` never sees `EntityMetadata` — `odata-sql`
/// already consumed it to build the SQL text — so a column is decoded by
/// trying the Postgres wire types an OData scalar can plausibly carry, in
/// order of how common they are in entity tables: text, integer, double
/// precision, boolean, timestamp, bytea.
fn decode_column(row: &PgRow, name: &str) -> Result<serde_json::Value> {
    if let Ok(Some(s)) = row.try_get::<Option<String>, _>(name) {
        return Ok(serde_json::Value::String(s));
    }
    if let Ok(Some(n)) = row.try_get::<Option<i64>, _>(name) {
        return Ok(serde_json::Value::from(n));
    }
    if let Ok(Some(f)) = row.try_get::<Option<f64>, _>(name) {
        return Ok(serde_json::Value::from(f));
    }
    if let Ok(Some(b)) = row.try_get::<Option<bool>, _>(name) {
        return Ok(serde_json::Value::Bool(b));
    }
    if let Ok(Some(dt)) = row.try_get::<Option<DateTime<Utc>>, _>(name) {
        return Ok(serde_json::Value::String(dt.to_rfc3339()));
    }
    if let Ok(Some(bytes)) = row.try_get::<Option<Vec<u8>>, _>(name) {
        return Ok(serde_json::Value::String(hex_encode(&bytes)));
    }
    Ok(serde_json::Value::Null)
}

/// Maps one result row into an `OrderedEntity`, preserving the column order
/// Postgres returned them in (which matches `odata-sql`'s SELECT list).
pub(crate) fn row_to_entity(row: &PgRow) -> Result<OrderedEntity> {
    let mut out = OrderedEntity::new();
    for column in row.columns() {
        let name = column.name();
        out.insert(name, decode_column(row, name)?);
    }
    Ok(out)
}

#[async_trait]
impl DatabaseProvider for PostgresProvider {
    fn driver_name(&self) -> &'static str {
        "postgres"
    }

    fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    async fn fetch_rows(&self, built: &BuiltQuery, cancel: &CancellationToken) -> Result<Vec<OrderedEntity>> {
        check_cancelled(cancel)?;
        let rows = bind_query(query(&built.sql), built)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::Execution(e.to_string()))?;
        check_cancelled(cancel)?;
        rows.iter().map(row_to_entity).collect()
    }

    async fn fetch_count(&self, built: &BuiltQuery, cancel: &CancellationToken) -> Result<i64> {
        check_cancelled(cancel)?;
        let row = bind_query(query(&built.sql), built)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Error::Execution(e.to_string()))?;
        row.try_get::<i64, _>(0).map_err(|e| Error::Execution(e.to_string()))
    }

    async fn execute(&self, built: &BuiltQuery, cancel: &CancellationToken) -> Result<u64> {
        check_cancelled(cancel)?;
        let result = bind_query(query(&built.sql), built)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::Execution(e.to_string()))?;
        Ok(result.rows_affected())
    }

    async fn begin_transaction(&self) -> Result<Box<dyn Transaction>> {
        let tx = self.pool.begin().await.map_err(|e| Error::Execution(e.to_string()))?;
        Ok(Box::new(PostgresTransaction::new(tx)))
    }

    fn supports_transactions(&self) -> bool {
        true
    }
}
