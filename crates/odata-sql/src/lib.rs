//! Builds parameterized SQL from a validated [`QueryOptions`] and
//! [`EntityMetadata`] (spec §4.7), grounded in the same builder shape as
//! the teacher's JSONB `SqlBuilder` (accumulate conditions, number
//! placeholders, join with `AND`) but targeting relational columns through
//! a [`Dialect`] instead of a single hardcoded JSONB accessor.
//!
//! Scope: expression trees may only reference scalar properties of the
//! entity being queried. A dotted navigation path (`Category.Name`) is
//! accepted by the semantic analyzer (which can validate it through the
//! metadata registry) but rejected here with `Error::Build` — translating
//! a nested filter predicate into a join or correlated subquery is left to
//! a future iteration of the query planner.

use odata_core::{ArgValue, EntityMetadata, Error, NamedArgs, OrderedEntity, ParseNode, PropertyType, Result};
use odata_lang::kinds;
use odata_lang::query::QueryOptions;
use odata_lang::options::SearchExpression;
use odata_dialect::{escape_like_value, Dialect};

/// A fully rendered, parameterized SQL statement.
#[derive(Debug, Clone)]
pub struct BuiltQuery {
    pub sql: String,
    pub args: NamedArgs,
}

fn resolve_scalar_column<'a>(
    entity: &'a EntityMetadata,
    name: &str,
    dialect: &dyn Dialect,
) -> Result<String> {
    if name.contains('.') {
        return Err(Error::build(format!(
            "nested property path '{name}' cannot be translated to SQL directly"
        )));
    }
    let property = entity
        .find_property(name)
        .ok_or_else(|| Error::build(format!("unknown property '{name}'")))?;
    if property.is_navigation {
        return Err(Error::build(format!("'{name}' is a navigation property, not a column")));
    }
    Ok(dialect.quote_identifier(property.column()))
}

/// Converts a filter literal token into the `ArgValue` matching a property's
/// declared type (spec §4.7: "the builder converts the literal to the
/// property's declared type before binding"). Mirrors [`json_to_arg_value`]
/// but starts from a lexer token instead of a `serde_json::Value`.
fn literal_to_arg_value(node: &ParseNode, property_type: PropertyType, property_name: &str) -> Result<ArgValue> {
    let raw = &node.token.value;
    match node.token.kind {
        kinds::STRING => match property_type {
            PropertyType::Int32 | PropertyType::Int64 => raw
                .parse::<i64>()
                .map(ArgValue::Int64)
                .map_err(|_| Error::type_error(format!("'{property_name}' expects an integer, got '{raw}'"))),
            PropertyType::Float32 | PropertyType::Float64 => raw
                .parse::<f64>()
                .map(ArgValue::Float64)
                .map_err(|_| Error::type_error(format!("'{property_name}' expects a number, got '{raw}'"))),
            PropertyType::Bool => match raw.to_ascii_lowercase().as_str() {
                "true" => Ok(ArgValue::Bool(true)),
                "false" => Ok(ArgValue::Bool(false)),
                _ => Err(Error::type_error(format!("'{property_name}' expects a boolean, got '{raw}'"))),
            },
            PropertyType::String | PropertyType::DateTime | PropertyType::Date | PropertyType::TimeOfDay => {
                Ok(ArgValue::String(raw.clone()))
            }
            PropertyType::Bytes => Ok(ArgValue::Bytes(raw.as_bytes().to_vec())),
        },
        kinds::NUMBER => match property_type {
            PropertyType::Int32 | PropertyType::Int64 => match &node.token.semantic_reference {
                Some(odata_core::SemanticValue::Int64(i)) => Ok(ArgValue::Int64(*i)),
                _ => raw
                    .parse::<i64>()
                    .map(ArgValue::Int64)
                    .map_err(|_| Error::type_error(format!("'{property_name}' expects an integer, got '{raw}'"))),
            },
            PropertyType::Float32 | PropertyType::Float64 => match &node.token.semantic_reference {
                Some(odata_core::SemanticValue::Float64(f)) => Ok(ArgValue::Float64(*f)),
                Some(odata_core::SemanticValue::Int64(i)) => Ok(ArgValue::Float64(*i as f64)),
                _ => raw
                    .parse::<f64>()
                    .map(ArgValue::Float64)
                    .map_err(|_| Error::type_error(format!("'{property_name}' expects a number, got '{raw}'"))),
            },
            PropertyType::String | PropertyType::DateTime | PropertyType::Date | PropertyType::TimeOfDay => {
                Ok(ArgValue::String(raw.clone()))
            }
            PropertyType::Bool | PropertyType::Bytes => {
                Err(Error::type_error(format!("'{property_name}' does not accept a numeric literal")))
            }
        },
        kinds::BOOL => match property_type {
            PropertyType::Bool => Ok(ArgValue::Bool(raw.eq_ignore_ascii_case("true"))),
            PropertyType::String => Ok(ArgValue::String(raw.to_ascii_lowercase())),
            _ => Err(Error::type_error(format!("'{property_name}' does not accept a boolean literal"))),
        },
        other => Err(Error::build(format!("token kind {other} is not a literal"))),
    }
}

/// When exactly one side of a binary comparison is a scalar property
/// reference and the other a literal, renders the property side as a column
/// and the literal side coerced to that property's declared type. Falls
/// back to untyped rendering (both properties, both literals, function
/// calls, etc.) otherwise.
fn render_comparison_sides(
    left_node: &ParseNode,
    right_node: &ParseNode,
    entity: &EntityMetadata,
    dialect: &dyn Dialect,
    args: &mut NamedArgs,
) -> Result<(String, String)> {
    let is_literal = |node: &ParseNode| matches!(node.token.kind, kinds::STRING | kinds::NUMBER | kinds::BOOL);

    if left_node.token.kind == kinds::IDENT && is_literal(right_node) {
        if let Some(property) = entity.find_property(&left_node.token.value) {
            if !property.is_navigation {
                let left = render(left_node, entity, dialect, args)?;
                let arg = literal_to_arg_value(right_node, property.property_type, &property.name)?;
                let idx = args.add(arg);
                return Ok((left, dialect.placeholder(idx)));
            }
        }
    }
    if right_node.token.kind == kinds::IDENT && is_literal(left_node) {
        if let Some(property) = entity.find_property(&right_node.token.value) {
            if !property.is_navigation {
                let right = render(right_node, entity, dialect, args)?;
                let arg = literal_to_arg_value(left_node, property.property_type, &property.name)?;
                let idx = args.add(arg);
                return Ok((dialect.placeholder(idx), right));
            }
        }
    }

    let left = render(left_node, entity, dialect, args)?;
    let right = render(right_node, entity, dialect, args)?;
    Ok((left, right))
}

fn render(
    node: &ParseNode,
    entity: &EntityMetadata,
    dialect: &dyn Dialect,
    args: &mut NamedArgs,
) -> Result<String> {
    match node.token.kind {
        kinds::IDENT => resolve_scalar_column(entity, &node.token.value, dialect),
        kinds::STRING => {
            let idx = args.add(ArgValue::String(node.token.value.clone()));
            Ok(dialect.placeholder(idx))
        }
        kinds::BOOL => {
            let value = node.token.value.eq_ignore_ascii_case("true");
            let idx = args.add(ArgValue::Bool(value));
            Ok(dialect.placeholder(idx))
        }
        kinds::NULL => Ok("NULL".to_string()),
        kinds::NUMBER => {
            let value = match &node.token.semantic_reference {
                Some(odata_core::SemanticValue::Int64(i)) => ArgValue::Int64(*i),
                Some(odata_core::SemanticValue::Float64(f)) => ArgValue::Float64(*f),
                _ => node
                    .token
                    .value
                    .parse::<i64>()
                    .map(ArgValue::Int64)
                    .or_else(|_| node.token.value.parse::<f64>().map(ArgValue::Float64))
                    .map_err(|_| Error::build(format!("invalid numeric literal '{}'", node.token.value)))?,
            };
            let idx = args.add(value);
            Ok(dialect.placeholder(idx))
        }
        kinds::FUNCTION => render_function_call(node, entity, dialect, args),
        kinds::EQ | kinds::NE => render_equality(node, entity, dialect, args),
        kinds::GT | kinds::GE | kinds::LT | kinds::LE => {
            let op = match node.token.kind {
                kinds::GT => ">",
                kinds::GE => ">=",
                kinds::LT => "<",
                kinds::LE => "<=",
                _ => unreachable!(),
            };
            let (left, right) = render_comparison_sides(&node.children[0], &node.children[1], entity, dialect, args)?;
            Ok(format!("({left} {op} {right})"))
        }
        kinds::ADD | kinds::SUB | kinds::MUL | kinds::DIV | kinds::MOD => {
            let left = render(&node.children[0], entity, dialect, args)?;
            let right = render(&node.children[1], entity, dialect, args)?;
            Ok(match node.token.kind {
                kinds::ADD => format!("({left} + {right})"),
                kinds::SUB => format!("({left} - {right})"),
                kinds::MUL => format!("({left} * {right})"),
                kinds::DIV => format!("({left} / {right})"),
                kinds::MOD => dialect.modulo(&left, &right),
                _ => unreachable!(),
            })
        }
        kinds::AND => {
            let left = render(&node.children[0], entity, dialect, args)?;
            let right = render(&node.children[1], entity, dialect, args)?;
            Ok(format!("({left} AND {right})"))
        }
        kinds::OR => {
            let left = render(&node.children[0], entity, dialect, args)?;
            let right = render(&node.children[1], entity, dialect, args)?;
            Ok(format!("({left} OR {right})"))
        }
        kinds::NOT => {
            let child = render(&node.children[0], entity, dialect, args)?;
            Ok(format!("(NOT {child})"))
        }
        other => Err(Error::build(format!("token kind {other} cannot appear in an expression"))),
    }
}

/// `eq`/`ne` against a `null` literal become `IS [NOT] NULL`; every other
/// combination is a normal binary comparison.
fn render_equality(
    node: &ParseNode,
    entity: &EntityMetadata,
    dialect: &dyn Dialect,
    args: &mut NamedArgs,
) -> Result<String> {
    let (left_node, right_node) = (&node.children[0], &node.children[1]);
    let is_ne = node.token.kind == kinds::NE;

    if right_node.token.kind == kinds::NULL {
        let left = render(left_node, entity, dialect, args)?;
        return Ok(if is_ne { format!("({left} IS NOT NULL)") } else { format!("({left} IS NULL)") });
    }
    if left_node.token.kind == kinds::NULL {
        let right = render(right_node, entity, dialect, args)?;
        return Ok(if is_ne { format!("({right} IS NOT NULL)") } else { format!("({right} IS NULL)") });
    }

    let (left, right) = render_comparison_sides(left_node, right_node, entity, dialect, args)?;
    let op = if is_ne { "<>" } else { "=" };
    Ok(format!("({left} {op} {right})"))
}

/// `contains`/`startswith`/`endswith` compile to a `LIKE` predicate over
/// their first argument with the second argument (a string literal)
/// supplying the pattern; every other built-in is a scalar function
/// delegated to the dialect.
fn render_function_call(
    node: &ParseNode,
    entity: &EntityMetadata,
    dialect: &dyn Dialect,
    args: &mut NamedArgs,
) -> Result<String> {
    let name = node.token.value.to_ascii_lowercase();
    if matches!(name.as_str(), "contains" | "startswith" | "endswith") {
        if node.children.len() != 2 {
            return Err(Error::build(format!("'{name}' expects 2 arguments")));
        }
        let target = render(&node.children[0], entity, dialect, args)?;
        let literal = &node.children[1];
        if literal.token.kind != kinds::STRING {
            return Err(Error::build(format!("'{name}' expects a string literal as its second argument")));
        }
        let escaped = escape_like_value(&literal.token.value);
        let pattern = match name.as_str() {
            "contains" => format!("%{escaped}%"),
            "startswith" => format!("{escaped}%"),
            "endswith" => format!("%{escaped}"),
            _ => unreachable!(),
        };
        let idx = args.add(ArgValue::String(pattern));
        return Ok(format!("({target} {} {})", dialect.ilike_operator(), dialect.placeholder(idx)));
    }

    let rendered_args = node
        .children
        .iter()
        .map(|child| render(child, entity, dialect, args))
        .collect::<Result<Vec<_>>>()?;
    dialect.render_function(&name, &rendered_args)
}

/// Renders a `$search` expression as an `OR`-of-`LIKE` across every
/// textual scalar property on the entity (no dedicated full-text index is
/// assumed, per the general-purpose column types in `EntityMetadata`).
fn render_search(
    node: &SearchExpression,
    text_columns: &[String],
    dialect: &dyn Dialect,
    args: &mut NamedArgs,
) -> Result<String> {
    match node {
        SearchExpression::Term(term) | SearchExpression::Phrase(term) => {
            if text_columns.is_empty() {
                return Err(Error::build("$search requires at least one textual property on the entity"));
            }
            let pattern = format!("%{}%", escape_like_value(term));
            let clauses: Vec<String> = text_columns
                .iter()
                .map(|col| {
                    let idx = args.add(ArgValue::String(pattern.clone()));
                    format!("{col} {} {}", dialect.ilike_operator(), dialect.placeholder(idx))
                })
                .collect();
            Ok(format!("({})", clauses.join(" OR ")))
        }
        SearchExpression::And(l, r) => {
            let left = render_search(l, text_columns, dialect, args)?;
            let right = render_search(r, text_columns, dialect, args)?;
            Ok(format!("({left} AND {right})"))
        }
        SearchExpression::Or(l, r) => {
            let left = render_search(l, text_columns, dialect, args)?;
            let right = render_search(r, text_columns, dialect, args)?;
            Ok(format!("({left} OR {right})"))
        }
        SearchExpression::Not(inner) => {
            let rendered = render_search(inner, text_columns, dialect, args)?;
            Ok(format!("(NOT {rendered})"))
        }
    }
}

fn text_columns(entity: &EntityMetadata, dialect: &dyn Dialect) -> Vec<String> {
    entity
        .scalar_properties()
        .filter(|p| p.property_type.is_textual())
        .map(|p| dialect.quote_identifier(p.column()))
        .collect()
}

fn where_clause(
    entity: &EntityMetadata,
    dialect: &dyn Dialect,
    options: &QueryOptions,
    args: &mut NamedArgs,
) -> Result<String> {
    let mut parts = Vec::new();
    if let Some(filter) = &options.filter {
        parts.push(render(filter, entity, dialect, args)?);
    }
    if let Some(search) = &options.search {
        parts.push(render_search(search, &text_columns(entity, dialect), dialect, args)?);
    }
    if parts.is_empty() {
        Ok(String::new())
    } else {
        Ok(format!(" WHERE {}", parts.join(" AND ")))
    }
}

fn select_list(entity: &EntityMetadata, dialect: &dyn Dialect, options: &QueryOptions, args: &mut NamedArgs) -> Result<Vec<String>> {
    let mut columns = Vec::new();
    match &options.select {
        Some(names) => {
            for name in names {
                let property = entity
                    .find_property(name)
                    .ok_or_else(|| Error::build(format!("unknown property '{name}' in $select")))?;
                if property.is_navigation {
                    continue;
                }
                columns.push(format!(
                    "{} AS {}",
                    dialect.quote_identifier(property.column()),
                    dialect.quote_identifier(&property.name)
                ));
            }
        }
        None => {
            for property in entity.scalar_properties() {
                columns.push(format!(
                    "{} AS {}",
                    dialect.quote_identifier(property.column()),
                    dialect.quote_identifier(&property.name)
                ));
            }
        }
    }
    for compute in &options.compute {
        let expr = render(&compute.parse_tree, entity, dialect, args)?;
        columns.push(format!("{expr} AS {}", dialect.quote_identifier(&compute.alias)));
    }
    if columns.is_empty() {
        return Err(Error::build("$select produced no columns"));
    }
    Ok(columns)
}

/// Builds the `SELECT` statement for an entity set request (spec §4.7
/// "Build"), the first step of the v4 execution order.
pub fn build_select(entity: &EntityMetadata, dialect: &dyn Dialect, options: &QueryOptions) -> Result<BuiltQuery> {
    let mut args = NamedArgs::new();
    let columns = select_list(entity, dialect, options, &mut args)?;
    let table = dialect.quote_identifier(entity.table());
    let where_sql = where_clause(entity, dialect, options, &mut args)?;

    let order_sql = match &options.order_by {
        Some(keys) if !keys.is_empty() => {
            let rendered: Result<Vec<String>> = keys
                .iter()
                .map(|key| {
                    let column = resolve_scalar_column(entity, &key.property, dialect)?;
                    let direction = match key.direction {
                        odata_lang::options::Direction::Asc => "ASC",
                        odata_lang::options::Direction::Desc => "DESC",
                    };
                    Ok(format!("{column} {direction}"))
                })
                .collect();
            format!(" ORDER BY {}", rendered?.join(", "))
        }
        _ => String::new(),
    };

    let pagination_sql = match (options.skip, options.top) {
        (skip, Some(top)) => format!(" {}", dialect.paginate(skip.unwrap_or(0), top)),
        (Some(skip), None) => format!(" {}", dialect.paginate_skip_only(skip)),
        (None, None) => String::new(),
    };

    let sql = format!(
        "SELECT {} FROM {table}{where_sql}{order_sql}{pagination_sql}",
        columns.join(", ")
    );
    Ok(BuiltQuery { sql, args })
}

/// Builds the `SELECT COUNT(*)` statement used to satisfy `$count=true`
/// (computed over the same `WHERE` clause, ignoring pagination and
/// ordering).
pub fn build_count(entity: &EntityMetadata, dialect: &dyn Dialect, options: &QueryOptions) -> Result<BuiltQuery> {
    let mut args = NamedArgs::new();
    let table = dialect.quote_identifier(entity.table());
    let where_sql = where_clause(entity, dialect, options, &mut args)?;
    let sql = format!("SELECT COUNT(*) FROM {table}{where_sql}");
    Ok(BuiltQuery { sql, args })
}

/// Converts a JSON scalar (as stored in an [`OrderedEntity`]) into the
/// `ArgValue` matching a property's declared type, per DESIGN NOTES §9
/// ("semantic reference on literals... coercion should happen once").
fn json_to_arg_value(value: &serde_json::Value, property_type: PropertyType, property_name: &str) -> Result<ArgValue> {
    if value.is_null() {
        return Ok(ArgValue::Null);
    }
    match property_type {
        PropertyType::Int32 | PropertyType::Int64 => value
            .as_i64()
            .map(ArgValue::Int64)
            .ok_or_else(|| Error::type_error(format!("'{property_name}' expects an integer"))),
        PropertyType::Float32 | PropertyType::Float64 => value
            .as_f64()
            .map(ArgValue::Float64)
            .ok_or_else(|| Error::type_error(format!("'{property_name}' expects a number"))),
        PropertyType::Bool => value
            .as_bool()
            .map(ArgValue::Bool)
            .ok_or_else(|| Error::type_error(format!("'{property_name}' expects a boolean"))),
        PropertyType::String | PropertyType::DateTime | PropertyType::Date | PropertyType::TimeOfDay => value
            .as_str()
            .map(|s| ArgValue::String(s.to_string()))
            .ok_or_else(|| Error::type_error(format!("'{property_name}' expects a string"))),
        PropertyType::Bytes => value
            .as_str()
            .map(|s| ArgValue::Bytes(s.as_bytes().to_vec()))
            .ok_or_else(|| Error::type_error(format!("'{property_name}' expects a base64 string"))),
    }
}

/// Builds an `INSERT` statement (spec §6 `build_insert_query`) over every
/// scalar property present in `data`; properties absent from `data` are
/// left to the database's column default.
pub fn build_insert(entity: &EntityMetadata, dialect: &dyn Dialect, data: &OrderedEntity) -> Result<BuiltQuery> {
    let mut args = NamedArgs::new();
    let mut columns = Vec::new();
    let mut placeholders = Vec::new();

    for property in entity.scalar_properties() {
        let Some(value) = data.get(&property.name) else { continue };
        let arg = json_to_arg_value(value, property.property_type, &property.name)?;
        let idx = args.add(arg);
        columns.push(dialect.quote_identifier(property.column()));
        placeholders.push(dialect.placeholder(idx));
    }

    if columns.is_empty() {
        return Err(Error::build("insert requires at least one property value"));
    }

    let table = dialect.quote_identifier(entity.table());
    let sql = format!(
        "INSERT INTO {table} ({}) VALUES ({})",
        columns.join(", "),
        placeholders.join(", ")
    );
    Ok(BuiltQuery { sql, args })
}

/// Builds an `UPDATE` statement (spec §6 `build_update_query`) setting every
/// scalar property present in `data`, restricted by an `AND`-chained
/// equality predicate over `keys`.
pub fn build_update(
    entity: &EntityMetadata,
    dialect: &dyn Dialect,
    data: &OrderedEntity,
    keys: &OrderedEntity,
) -> Result<BuiltQuery> {
    let mut args = NamedArgs::new();
    let mut assignments = Vec::new();

    for property in entity.scalar_properties() {
        if property.is_key {
            continue;
        }
        let Some(value) = data.get(&property.name) else { continue };
        let arg = json_to_arg_value(value, property.property_type, &property.name)?;
        let idx = args.add(arg);
        assignments.push(format!("{} = {}", dialect.quote_identifier(property.column()), dialect.placeholder(idx)));
    }

    if assignments.is_empty() {
        return Err(Error::build("update requires at least one non-key property value"));
    }

    let predicate = key_predicate(entity, dialect, keys, &mut args)?;
    let table = dialect.quote_identifier(entity.table());
    let sql = format!("UPDATE {table} SET {} WHERE {predicate}", assignments.join(", "));
    Ok(BuiltQuery { sql, args })
}

/// Builds a `DELETE` statement (spec §6 `build_delete_query`) restricted by
/// an `AND`-chained equality predicate over `keys`.
pub fn build_delete(entity: &EntityMetadata, dialect: &dyn Dialect, keys: &OrderedEntity) -> Result<BuiltQuery> {
    let mut args = NamedArgs::new();
    let predicate = key_predicate(entity, dialect, keys, &mut args)?;
    let table = dialect.quote_identifier(entity.table());
    let sql = format!("DELETE FROM {table} WHERE {predicate}");
    Ok(BuiltQuery { sql, args })
}

fn key_predicate(entity: &EntityMetadata, dialect: &dyn Dialect, keys: &OrderedEntity, args: &mut NamedArgs) -> Result<String> {
    let mut clauses = Vec::new();
    for property in entity.key_properties() {
        let value = keys
            .get(&property.name)
            .ok_or_else(|| Error::build(format!("missing key value for '{}'", property.name)))?;
        let arg = json_to_arg_value(value, property.property_type, &property.name)?;
        let idx = args.add(arg);
        clauses.push(format!("{} = {}", dialect.quote_identifier(property.column()), dialect.placeholder(idx)));
    }
    if clauses.is_empty() {
        return Err(Error::build(format!("entity '{}' has no key properties", entity.name)));
    }
    Ok(clauses.join(" AND "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use odata_dialect::postgres::PostgresDialect;
    use odata_lang::query::parse_query_options;
    use odata_lang::Limits;
    use odata_core::{PropertyMetadata, PropertyType};

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

    #[test]
    fn simple_filter_produces_parameterized_where() {
        let entity = products();
        let dialect = PostgresDialect;
        let options = parse_query_options("$filter=Price gt 10&$top=5", &Limits::default()).unwrap();
        let built = build_select(&entity, &dialect, &options).unwrap();
        assert!(built.sql.contains("WHERE (\"Price\" > :param1)"));
        assert!(built.sql.contains("LIMIT 5"));
        assert_eq!(built.args.len(), 1);
    }

    #[test]
    fn skip_without_top_still_emits_an_offset() {
        let entity = products();
        let dialect = PostgresDialect;
        let options = parse_query_options("$skip=20", &Limits::default()).unwrap();
        let built = build_select(&entity, &dialect, &options).unwrap();
        assert!(built.sql.contains("OFFSET 20"));
        assert!(!built.sql.contains("LIMIT"));
    }

    #[test]
    fn string_literal_against_int_property_is_coerced() {
        let entity = products();
        let dialect = PostgresDialect;
        let options = parse_query_options("$filter=ID eq '18'", &Limits::default()).unwrap();
        let built = build_select(&entity, &dialect, &options).unwrap();
        assert!(built.sql.contains("WHERE (\"ID\" = :param1)"));
        match &built.args.values()[0] {
            ArgValue::Int64(18) => {}
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn non_numeric_string_against_int_property_is_a_type_error() {
        let entity = products();
        let dialect = PostgresDialect;
        let options = parse_query_options("$filter=ID eq 'abc'", &Limits::default()).unwrap();
        let err = build_select(&entity, &dialect, &options).unwrap_err();
        assert_eq!(err.http_status(), 400);
        assert_eq!(err.code(), "TypeError");
    }

    #[test]
    fn eq_null_becomes_is_null() {
        let entity = products();
        let dialect = PostgresDialect;
        let options = parse_query_options("$filter=Name eq null", &Limits::default()).unwrap();
        let built = build_select(&entity, &dialect, &options).unwrap();
        assert!(built.sql.contains("IS NULL"));
        assert_eq!(built.args.len(), 0);
    }

    #[test]
    fn contains_function_becomes_like_with_wildcards() {
        let entity = products();
        let dialect = PostgresDialect;
        let options = parse_query_options("$filter=contains(Name,'bike')", &Limits::default()).unwrap();
        let built = build_select(&entity, &dialect, &options).unwrap();
        assert!(built.sql.contains("ILIKE :param1"));
        match &built.args.values()[0] {
            ArgValue::String(s) => assert_eq!(s, "%bike%"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn select_restricts_columns() {
        let entity = products();
        let dialect = PostgresDialect;
        let options = parse_query_options("$select=Name", &Limits::default()).unwrap();
        let built = build_select(&entity, &dialect, &options).unwrap();
        assert!(built.sql.starts_with("SELECT \"Name\" AS \"Name\" FROM \"products\""));
    }

    #[test]
    fn compute_expression_is_appended_as_column() {
        let entity = products();
        let dialect = PostgresDialect;
        let options = parse_query_options("$compute=Price mul 2 as DoublePrice", &Limits::default()).unwrap();
        let built = build_select(&entity, &dialect, &options).unwrap();
        assert!(built.sql.contains("AS \"DoublePrice\""));
    }

    #[test]
    fn orderby_renders_direction() {
        let entity = products();
        let dialect = PostgresDialect;
        let options = parse_query_options("$orderby=Price desc", &Limits::default()).unwrap();
        let built = build_select(&entity, &dialect, &options).unwrap();
        assert!(built.sql.contains("ORDER BY \"Price\" DESC"));
    }

    #[test]
    fn count_query_ignores_pagination_and_order() {
        let entity = products();
        let dialect = PostgresDialect;
        let options = parse_query_options("$filter=Price gt 1&$top=5&$orderby=Price", &Limits::default()).unwrap();
        let built = build_count(&entity, &dialect, &options).unwrap();
        assert!(built.sql.starts_with("SELECT COUNT(*) FROM"));
        assert!(!built.sql.contains("ORDER BY"));
        assert!(!built.sql.contains("FETCH"));
    }

    #[test]
    fn nested_property_path_is_rejected() {
        let entity = products();
        let dialect = PostgresDialect;
        let options = parse_query_options("$filter=Category.Name eq 'x'", &Limits::default()).unwrap();
        assert!(build_select(&entity, &dialect, &options).is_err());
    }

    #[test]
    fn search_matches_across_textual_columns() {
        let entity = products();
        let dialect = PostgresDialect;
        let options = parse_query_options("$search=bike", &Limits::default()).unwrap();
        let built = build_select(&entity, &dialect, &options).unwrap();
        assert!(built.sql.contains("ILIKE"));
    }

    #[test]
    fn insert_binds_every_supplied_property() {
        let entity = products();
        let dialect = PostgresDialect;
        let mut data = OrderedEntity::new();
        data.insert("Name", serde_json::json!("Bike"));
        data.insert("Price", serde_json::json!(199.99));
        let built = build_insert(&entity, &dialect, &data).unwrap();
        assert_eq!(built.sql, "INSERT INTO \"products\" (\"Name\", \"Price\") VALUES (:param1, :param2)");
        assert_eq!(built.args.len(), 2);
    }

    #[test]
    fn insert_with_no_data_is_rejected() {
        let entity = products();
        let dialect = PostgresDialect;
        assert!(build_insert(&entity, &dialect, &OrderedEntity::new()).is_err());
    }

    #[test]
    fn update_sets_non_key_columns_and_filters_by_key() {
        let entity = products();
        let dialect = PostgresDialect;
        let mut data = OrderedEntity::new();
        data.insert("Price", serde_json::json!(149.0));
        let mut keys = OrderedEntity::new();
        keys.insert("ID", serde_json::json!(7));
        let built = build_update(&entity, &dialect, &data, &keys).unwrap();
        assert_eq!(built.sql, "UPDATE \"products\" SET \"Price\" = :param1 WHERE \"ID\" = :param2");
        assert_eq!(built.args.len(), 2);
    }

    #[test]
    fn update_ignores_key_values_present_in_data() {
        let entity = products();
        let dialect = PostgresDialect;
        let mut data = OrderedEntity::new();
        data.insert("ID", serde_json::json!(99));
        data.insert("Name", serde_json::json!("Renamed"));
        let mut keys = OrderedEntity::new();
        keys.insert("ID", serde_json::json!(7));
        let built = build_update(&entity, &dialect, &data, &keys).unwrap();
        assert!(!built.sql.contains("\"ID\" = :param1"));
        assert!(built.sql.contains("\"Name\" = :param1"));
    }

    #[test]
    fn delete_filters_by_key() {
        let entity = products();
        let dialect = PostgresDialect;
        let mut keys = OrderedEntity::new();
        keys.insert("ID", serde_json::json!(7));
        let built = build_delete(&entity, &dialect, &keys).unwrap();
        assert_eq!(built.sql, "DELETE FROM \"products\" WHERE \"ID\" = :param1");
        assert_eq!(built.args.len(), 1);
    }

    #[test]
    fn delete_missing_key_value_is_rejected() {
        let entity = products();
        let dialect = PostgresDialect;
        assert!(build_delete(&entity, &dialect, &OrderedEntity::new()).is_err());
    }
}
