//! SQL dialect translation (spec §4.6). Everything upstream of this crate
//! works with entity/property names and OData function names; a `Dialect`
//! turns those into the exact SQL a given backend accepts — identifier
//! quoting, `LIKE`/`ILIKE` case sensitivity, pagination syntax, and the
//! handful of built-in functions the filter/compute languages expose.
//!
//! Implemented as a dyn-safe trait (not generics) so the engine can hold a
//! `&dyn Dialect` chosen at request time from a small static registry,
//! mirroring how a single binary serves Postgres/MySQL/Oracle backends
//! side by side without per-backend monomorphization.

pub mod mysql;
pub mod oracle;
pub mod postgres;

use odata_core::{Error, Result};

/// One rendered SQL function call, e.g. `LOWER(name)`.
pub type SqlFragment = String;

/// Translates OData-level operations into backend-specific SQL text.
/// Implementations must be stateless and `Sync` — a single instance is
/// shared across every concurrent request for that backend.
pub trait Dialect: Send + Sync {
    fn name(&self) -> &'static str;

    /// Quotes an identifier (table or column name) for safe interpolation.
    fn quote_identifier(&self, ident: &str) -> String;

    /// Positional parameter placeholder for the given 1-based index.
    fn placeholder(&self, index: usize) -> String;

    /// `true` if this dialect's `LIKE` is case-insensitive by default
    /// (Postgres: no, use `ILIKE`; MySQL: depends on collation, treated as
    /// case-insensitive here; Oracle: no).
    fn case_insensitive_like(&self) -> bool;

    /// The `LIKE`-family operator to use for a case-insensitive match.
    fn ilike_operator(&self) -> &'static str;

    /// Renders `OFFSET`/`FETCH`-style pagination for a query with `skip`
    /// rows skipped and at most `top` returned.
    fn paginate(&self, skip: u32, top: u32) -> String;

    /// Renders an offset-only clause for `$skip` without `$top` (spec §4.6:
    /// "when only one of top/skip is present, the other clause is
    /// omitted" — the `LIMIT`/`FETCH NEXT` half simply isn't emitted).
    fn paginate_skip_only(&self, skip: u32) -> String;

    /// Renders a call to one of the filter/compute built-in functions.
    /// `args` are already-rendered SQL fragments (column refs, literals, or
    /// placeholders) — the dialect only concerns itself with the function
    /// name mapping and argument order.
    fn render_function(&self, name: &str, args: &[SqlFragment]) -> Result<SqlFragment>;

    /// Wraps `value` (a column or SQL fragment) in a case-insensitive
    /// comparison helper when the dialect does not support `ilike_operator`
    /// natively against raw text (used for function-wrapped targets like
    /// `tolower(x)` rather than bare columns).
    fn lower(&self, value: &str) -> String {
        format!("LOWER({value})")
    }

    /// Renders `a mod b`. Postgres and MySQL accept the `%` operator;
    /// Oracle has no modulo operator and requires the `MOD` function.
    fn modulo(&self, a: &str, b: &str) -> String {
        format!("({a} % {b})")
    }
}

/// Escapes `%`, `_`, and the escape character itself in a user-supplied
/// `LIKE` pattern value, per the function being translated
/// (`contains`/`startswith`/`endswith`). The caller adds the wildcard
/// `%` characters appropriate to the function; this only protects literal
/// occurrences already present in the value.
pub fn escape_like_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

fn require_arity(name: &str, args: &[SqlFragment], min: usize, max: usize) -> Result<()> {
    if args.len() < min || args.len() > max {
        return Err(Error::build(format!(
            "function '{name}' called with {} argument(s), expected {min}..={max}",
            args.len()
        )));
    }
    Ok(())
}

/// Looks up a `Dialect` implementation by name (`postgres`, `mysql`,
/// `oracle`), case-insensitively.
pub fn resolve(name: &str) -> Result<Box<dyn Dialect>> {
    match name.to_ascii_lowercase().as_str() {
        "postgres" | "postgresql" | "pg" => Ok(Box::new(postgres::PostgresDialect)),
        "mysql" => Ok(Box::new(mysql::MySqlDialect)),
        "oracle" => Ok(Box::new(oracle::OracleDialect)),
        other => Err(Error::build(format!("unknown SQL dialect '{other}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_like_value_escapes_wildcards() {
        assert_eq!(escape_like_value("50%_off"), "50\\%\\_off");
    }

    #[test]
    fn resolve_is_case_insensitive() {
        assert!(resolve("PostgreSQL").is_ok());
        assert!(resolve("MySQL").is_ok());
        assert!(resolve("oracle").is_ok());
        assert!(resolve("sqlite").is_err());
    }
}
