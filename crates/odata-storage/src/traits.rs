//! The provider contract an OData backend must implement (spec §6
//! `DatabaseProvider`).
//!
//! `odata-sql` builds parameterized SQL text; this trait only executes it
//! and maps rows back into [`OrderedEntity`]. Every call accepts a
//! [`CancellationToken`] so the engine can abort mid-pipeline (spec §5)
//! without the provider needing to know why.

use async_trait::async_trait;
use odata_core::{Error, OrderedEntity, Result};
use odata_dialect::Dialect;
use odata_sql::BuiltQuery;
use tokio_util::sync::CancellationToken;

/// Returns `Error::Cancelled` if `cancel` has fired. Call this before and
/// after any I/O a provider implementation performs.
pub fn check_cancelled(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }
    Ok(())
}

/// A live connection to a relational backend. One instance is shared across
/// concurrent requests for that backend; the core never holds a connection
/// beyond a single call, borrowing a pooled one for the duration.
#[async_trait]
pub trait DatabaseProvider: Send + Sync {
    /// Used to select a [`Dialect`] (`odata_dialect::resolve`) and for
    /// logging/diagnostics.
    fn driver_name(&self) -> &'static str;

    /// The dialect this provider renders SQL for.
    fn dialect(&self) -> &dyn Dialect;

    /// Executes a `SELECT` built by `odata_sql::build_select` and maps every
    /// row into an `OrderedEntity`, column order preserved.
    async fn fetch_rows(&self, query: &BuiltQuery, cancel: &CancellationToken) -> Result<Vec<OrderedEntity>>;

    /// Executes a `SELECT COUNT(*)` built by `odata_sql::build_count`.
    async fn fetch_count(&self, query: &BuiltQuery, cancel: &CancellationToken) -> Result<i64>;

    /// Executes an `INSERT`/`UPDATE`/`DELETE` built by `odata_sql::build_*`
    /// and returns the number of affected rows.
    async fn execute(&self, query: &BuiltQuery, cancel: &CancellationToken) -> Result<u64>;

    /// Begins a transaction for implementations that support atomic
    /// multi-statement writes. Returns `Error::Build` if unsupported.
    async fn begin_transaction(&self) -> Result<Box<dyn Transaction>>;

    fn supports_transactions(&self) -> bool;
}

/// An in-flight transaction. Operations see each other's uncommitted
/// writes; nothing is durable until `commit`.
#[async_trait]
pub trait Transaction: Send + Sync {
    async fn fetch_rows(&mut self, query: &BuiltQuery, cancel: &CancellationToken) -> Result<Vec<OrderedEntity>>;

    async fn execute(&mut self, query: &BuiltQuery, cancel: &CancellationToken) -> Result<u64>;

    async fn commit(self: Box<Self>) -> Result<()>;

    async fn rollback(self: Box<Self>) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Compile-time check that both traits remain dyn-safe.
    fn _assert_provider_object_safe(_: &dyn DatabaseProvider) {}
    fn _assert_transaction_object_safe(_: &dyn Transaction) {}

    #[test]
    fn cancelled_token_surfaces_as_cancelled_error() {
        let token = CancellationToken::new();
        token.cancel();
        let err = check_cancelled(&token).unwrap_err();
        assert_eq!(err.code(), "Cancelled");
    }

    #[test]
    fn live_token_passes_through() {
        let token = CancellationToken::new();
        assert!(check_cancelled(&token).is_ok());
    }
}
