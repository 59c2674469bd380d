//! Orchestrates the OData v4 query pipeline end to end (spec §4.8): parses
//! and validates query options, builds and executes SQL via `odata-sql` and
//! `odata-storage`, resolves `$expand` recursively, and assembles the final
//! response.

pub mod eval;
pub mod expand;
pub mod keys;
pub mod registry;
pub mod service;

/// An in-memory [`odata_storage::DatabaseProvider`] test double, gated
/// behind the `testing` feature so it never ships in a production binary.
#[cfg(feature = "testing")]
pub mod testing;

pub use eval::eval_predicate;
pub use expand::{expand_rows, ExpandContext};
pub use keys::{key_filter_tree, parse_key_segment};
pub use registry::{EntityRegistry, RegistryError};
pub use service::EntityService;
