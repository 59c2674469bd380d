//! Storage abstraction layer for the OData query engine (spec §6).
//!
//! This crate defines [`DatabaseProvider`], the contract a concrete backend
//! (`odata-db-postgres`, `odata-engine`'s in-memory test double, ...)
//! implements to execute a `BuiltQuery` from `odata-sql` and map rows back
//! into an `OrderedEntity`. It holds no SQL-building logic of its own.

mod traits;

pub use traits::{check_cancelled, DatabaseProvider, Transaction};

/// Type alias for a shared, swappable provider handle. The multi-tenant
/// wrapper (spec §5 "provider swap") rebinds this per request and restores
/// the prior binding on every exit path, including error paths.
pub type DynProvider = std::sync::Arc<dyn DatabaseProvider>;

pub mod prelude {
    pub use crate::{check_cancelled, DatabaseProvider, DynProvider, Transaction};
}
