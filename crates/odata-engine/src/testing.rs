//! An in-process `DatabaseProvider` test double (spec §9: "concrete
//! `DatabaseProvider` realizations: sqlx-postgres + an in-memory test
//! double"). It never sees a `QueryOptions`, only the SQL text
//! `odata-sql` rendered for the Postgres dialect, so it recognizes exactly
//! the five statement shapes that dialect produces and interprets just
//! enough of them — table name, equality predicates, ordering, pagination —
//! to answer from an in-memory table. Anything outside that shape (a
//! non-equality predicate, a function call) is rejected rather than
//! silently mishandled.

use async_trait::async_trait;
use odata_core::{ArgValue, Error, OrderedEntity, Result};
use odata_dialect::{resolve, Dialect};
use odata_sql::BuiltQuery;
use odata_storage::{check_cancelled, DatabaseProvider, Transaction};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock, Mutex};
use tokio_util::sync::CancellationToken;

static SELECT_RE: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r#"(?s)^SELECT (?P<cols>.+?) FROM "(?P<table>[^"]+)"(?: WHERE (?P<where>.+?))?(?: ORDER BY (?P<order>.+?))?(?: OFFSET (?P<skip>\d+) FETCH NEXT (?P<top>\d+) ROWS ONLY)?$"#).unwrap());
static COUNT_RE: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r#"(?s)^SELECT COUNT\(\*\) FROM "(?P<table>[^"]+)"(?: WHERE (?P<where>.+))?$"#).unwrap());
static INSERT_RE: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r#"(?s)^INSERT INTO "(?P<table>[^"]+)" \((?P<cols>.+?)\) VALUES \((?P<vals>.+?)\)$"#).unwrap());
static UPDATE_RE: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r#"(?s)^UPDATE "(?P<table>[^"]+)" SET (?P<set>.+?) WHERE (?P<where>.+)$"#).unwrap());
static DELETE_RE: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r#"(?s)^DELETE FROM "(?P<table>[^"]+)" WHERE (?P<where>.+)$"#).unwrap());
static EQ_RE: LazyLock<regex::Regex> = LazyLock::new(|| regex::Regex::new(r#"^"([^"]+)" = \$(\d+)$"#).unwrap());
static ASSIGN_RE: LazyLock<regex::Regex> = LazyLock::new(|| regex::Regex::new(r#"^"([^"]+)" = \$(\d+)$"#).unwrap());

fn arg_to_value(args: &[ArgValue], index: usize) -> Result<Value> {
    match args.get(index - 1).ok_or_else(|| Error::Execution(format!("missing bound argument ${index}")))? {
        ArgValue::Int64(v) => Ok(Value::from(*v)),
        ArgValue::Float64(v) => Ok(Value::from(*v)),
        ArgValue::String(v) => Ok(Value::String(v.clone())),
        ArgValue::Bool(v) => Ok(Value::Bool(*v)),
        ArgValue::Bytes(v) => Ok(Value::String(String::from_utf8_lossy(v).into_owned())),
        ArgValue::Null => Ok(Value::Null),
    }
}

/// Parses a chain of `"col" = $N` clauses joined by ` AND `. Any other
/// predicate shape (OR, LIKE, function calls) is rejected.
fn parse_equalities(where_clause: &str, args: &[ArgValue]) -> Result<Vec<(String, Value)>> {
    // `render()`'s AND branch wraps each conjunction in its own parens
    // (`("a" = $1 AND "b" = $2)`); `key_predicate` instead joins flat, with
    // no wrapping. Stripping one layer of outer parens handles both.
    let trimmed = where_clause.trim();
    let inner = trimmed.strip_prefix('(').and_then(|s| s.strip_suffix(')')).unwrap_or(trimmed);
    inner
        .split(" AND ")
        .map(|clause| {
            let captures = EQ_RE
                .captures(clause.trim())
                .ok_or_else(|| Error::Execution(format!("in-memory provider only supports equality predicates, got: {clause}")))?;
            let column = captures[1].to_string();
            let index: usize = captures[2].parse().unwrap();
            Ok((column, arg_to_value(args, index)?))
        })
        .collect()
}

fn row_matches(row: &OrderedEntity, predicates: &[(String, Value)]) -> bool {
    predicates.iter().all(|(col, val)| row.get(col).map(|v| v == val).unwrap_or(false))
}

/// A single in-process table store, shared across clones of the provider.
pub struct InMemoryProvider {
    tables: Arc<Mutex<HashMap<String, Vec<OrderedEntity>>>>,
    dialect: Box<dyn Dialect>,
}

impl Default for InMemoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self {
            tables: Arc::new(Mutex::new(HashMap::new())),
            dialect: resolve("postgres").expect("the postgres dialect is always registered"),
        }
    }

    /// Seeds `table` with `rows`, for test setup.
    pub fn seed(&self, table: impl Into<String>, rows: Vec<OrderedEntity>) {
        self.tables.lock().unwrap().insert(table.into(), rows);
    }

    fn table(&self, name: &str) -> Vec<OrderedEntity> {
        self.tables.lock().unwrap().get(name).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl DatabaseProvider for InMemoryProvider {
    fn driver_name(&self) -> &'static str {
        "memory"
    }

    fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    async fn fetch_rows(&self, built: &BuiltQuery, cancel: &CancellationToken) -> Result<Vec<OrderedEntity>> {
        check_cancelled(cancel)?;
        let captures = SELECT_RE
            .captures(&built.sql)
            .ok_or_else(|| Error::Execution(format!("in-memory provider cannot parse SELECT: {}", built.sql)))?;
        let args = built.args.values();
        let mut rows = self.table(&captures["table"]);

        if let Some(where_clause) = captures.name("where") {
            let predicates = parse_equalities(where_clause.as_str(), args)?;
            rows.retain(|row| row_matches(row, &predicates));
        }

        if let Some(order) = captures.name("order") {
            for key in order.as_str().split(", ").rev() {
                let (column, descending) = match key.trim().strip_suffix(" DESC") {
                    Some(col) => (col, true),
                    None => (key.trim().strip_suffix(" ASC").unwrap_or(key.trim()), false),
                };
                let column = column.trim_matches('"').to_string();
                rows.sort_by(|a, b| {
                    let av = a.get(&column).cloned().unwrap_or(Value::Null);
                    let bv = b.get(&column).cloned().unwrap_or(Value::Null);
                    let ord = format!("{av}").cmp(&format!("{bv}"));
                    if descending { ord.reverse() } else { ord }
                });
            }
        }

        if let (Some(skip), Some(top)) = (captures.name("skip"), captures.name("top")) {
            let skip: usize = skip.as_str().parse().unwrap_or(0);
            let top: usize = top.as_str().parse().unwrap_or(rows.len());
            rows = rows.into_iter().skip(skip).take(top).collect();
        }

        Ok(rows)
    }

    async fn fetch_count(&self, built: &BuiltQuery, cancel: &CancellationToken) -> Result<i64> {
        check_cancelled(cancel)?;
        let captures = COUNT_RE
            .captures(&built.sql)
            .ok_or_else(|| Error::Execution(format!("in-memory provider cannot parse COUNT: {}", built.sql)))?;
        let mut rows = self.table(&captures["table"]);
        if let Some(where_clause) = captures.name("where") {
            let predicates = parse_equalities(where_clause.as_str(), built.args.values())?;
            rows.retain(|row| row_matches(row, &predicates));
        }
        Ok(rows.len() as i64)
    }

    async fn execute(&self, built: &BuiltQuery, cancel: &CancellationToken) -> Result<u64> {
        check_cancelled(cancel)?;
        let args = built.args.values();

        if let Some(captures) = INSERT_RE.captures(&built.sql) {
            let table = captures["table"].to_string();
            let columns: Vec<String> = captures["cols"].split(", ").map(|c| c.trim_matches('"').to_string()).collect();
            let placeholders: Vec<usize> = captures["vals"].split(", ").map(|v| v.trim_start_matches('$').parse().unwrap()).collect();
            let mut row = OrderedEntity::new();
            for (column, index) in columns.into_iter().zip(placeholders) {
                row.insert(column, arg_to_value(args, index)?);
            }
            self.tables.lock().unwrap().entry(table).or_default().push(row);
            return Ok(1);
        }

        if let Some(captures) = UPDATE_RE.captures(&built.sql) {
            let table = captures["table"].to_string();
            let mut assignments = Vec::new();
            for clause in captures["set"].split(", ") {
                let m = ASSIGN_RE
                    .captures(clause.trim())
                    .ok_or_else(|| Error::Execution(format!("in-memory provider cannot parse SET clause: {clause}")))?;
                let index: usize = m[2].parse().unwrap();
                assignments.push((m[1].to_string(), arg_to_value(args, index)?));
            }
            let predicates = parse_equalities(&captures["where"], args)?;
            let mut tables = self.tables.lock().unwrap();
            let mut affected = 0u64;
            if let Some(rows) = tables.get_mut(&table) {
                for row in rows.iter_mut().filter(|r| row_matches(r, &predicates)) {
                    for (column, value) in &assignments {
                        row.insert(column.clone(), value.clone());
                    }
                    affected += 1;
                }
            }
            return Ok(affected);
        }

        if let Some(captures) = DELETE_RE.captures(&built.sql) {
            let table = captures["table"].to_string();
            let predicates = parse_equalities(&captures["where"], args)?;
            let mut tables = self.tables.lock().unwrap();
            let mut affected = 0u64;
            if let Some(rows) = tables.get_mut(&table) {
                let before = rows.len();
                rows.retain(|row| !row_matches(row, &predicates));
                affected = (before - rows.len()) as u64;
            }
            return Ok(affected);
        }

        Err(Error::Execution(format!("in-memory provider cannot parse statement: {}", built.sql)))
    }

    async fn begin_transaction(&self) -> Result<Box<dyn Transaction>> {
        Err(Error::build("the in-memory provider does not support transactions"))
    }

    fn supports_transactions(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use odata_core::{EntityMetadata, PropertyMetadata, PropertyType};
    use odata_lang::query::QueryOptions;

    fn products() -> EntityMetadata {
        EntityMetadata::new(
            "Products",
            vec![
                PropertyMetadata::scalar("ID", PropertyType::Int64).key(),
                PropertyMetadata::scalar("Name", PropertyType::String),
                PropertyMetadata::scalar("Price", PropertyType::Float64),
            ],
        )
        .with_table("products")
    }

    fn row(id: i64, name: &str, price: f64) -> OrderedEntity {
        let mut row = OrderedEntity::new();
        row.insert("ID", Value::from(id));
        row.insert("Name", Value::from(name));
        row.insert("Price", Value::from(price));
        row
    }

    #[tokio::test]
    async fn select_filters_and_counts() {
        let provider = InMemoryProvider::new();
        provider.seed("products", vec![row(1, "Pen", 1.5), row(2, "Mug", 9.0)]);
        let entity = products();
        let cancel = CancellationToken::new();

        let options = QueryOptions { top: Some(10), ..QueryOptions::default() };
        let built = odata_sql::build_select(&entity, provider.dialect(), &options).unwrap();
        let rows = provider.fetch_rows(&built, &cancel).await.unwrap();
        assert_eq!(rows.len(), 2);

        let count_query = odata_sql::build_count(&entity, provider.dialect(), &options).unwrap();
        assert_eq!(provider.fetch_count(&count_query, &cancel).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn insert_update_delete_round_trip() {
        let provider = InMemoryProvider::new();
        let entity = products();
        let cancel = CancellationToken::new();

        let mut data = OrderedEntity::new();
        data.insert("ID", Value::from(1i64));
        data.insert("Name", Value::from("Pen"));
        data.insert("Price", Value::from(1.5));
        let insert = odata_sql::build_insert(&entity, provider.dialect(), &data).unwrap();
        assert_eq!(provider.execute(&insert, &cancel).await.unwrap(), 1);

        let mut keys = OrderedEntity::new();
        keys.insert("ID", Value::from(1i64));
        let mut update_data = OrderedEntity::new();
        update_data.insert("Price", Value::from(2.0));
        let update = odata_sql::build_update(&entity, provider.dialect(), &update_data, &keys).unwrap();
        assert_eq!(provider.execute(&update, &cancel).await.unwrap(), 1);

        let delete = odata_sql::build_delete(&entity, provider.dialect(), &keys).unwrap();
        assert_eq!(provider.execute(&delete, &cancel).await.unwrap(), 1);
        assert_eq!(provider.table("products").len(), 0);
    }

    #[tokio::test]
    async fn entity_service_runs_end_to_end_against_the_double() {
        use crate::EntityService;
        use odata_core::MetadataRegistry;

        let provider = InMemoryProvider::new();
        provider.seed("products", vec![row(1, "Pen", 1.5), row(2, "Mug", 9.0)]);
        let mut registry = MetadataRegistry::new();
        registry.register(products());
        let service = EntityService::new(&registry, &provider);
        let cancel = CancellationToken::new();

        let response = service.query_collection("Products", "$orderby=Name asc", &cancel).await.unwrap();
        match response.value {
            odata_core::ODataValue::Collection(rows) => assert_eq!(rows.len(), 2),
            odata_core::ODataValue::Single(_) => panic!("expected a collection response"),
        }
    }
}
