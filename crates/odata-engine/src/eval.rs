//! In-memory evaluation of a filter expression tree against a single
//! materialized row (spec §4.9: the N:1 expand path evaluates the inner
//! `$filter` against the one candidate row rather than pushing it into SQL,
//! so a non-matching filter yields `null` instead of an empty candidate
//! set).
//!
//! Per the REDESIGN FLAGS in the specification, comparisons here compare in
//! the operand's declared or inferred type rather than falling back to a
//! lexicographic string compare for every operator.

use chrono::{DateTime, Datelike, Timelike, Utc};
use odata_core::{EntityMetadata, Error, OrderedEntity, ParseNode, Result};
use odata_lang::kinds;
use serde_json::Value;
use std::cmp::Ordering;

/// Evaluates `node` as a boolean predicate against `row`.
pub fn eval_predicate(node: &ParseNode, row: &OrderedEntity, entity: &EntityMetadata) -> Result<bool> {
    match eval_scalar(node, row, entity)? {
        Value::Bool(b) => Ok(b),
        other => Err(Error::type_error(format!("expression did not evaluate to a boolean: {other}"))),
    }
}

fn eval_scalar(node: &ParseNode, row: &OrderedEntity, entity: &EntityMetadata) -> Result<Value> {
    match node.token.kind {
        kinds::IDENT => {
            let property = entity
                .find_property(&node.token.value)
                .ok_or_else(|| Error::semantic(format!("unknown property '{}'", node.token.value)))?;
            Ok(row.get(&property.name).cloned().unwrap_or(Value::Null))
        }
        kinds::STRING => Ok(Value::String(node.token.value.clone())),
        kinds::BOOL => Ok(Value::Bool(node.token.value.eq_ignore_ascii_case("true"))),
        kinds::NULL => Ok(Value::Null),
        kinds::NUMBER => match &node.token.semantic_reference {
            Some(odata_core::SemanticValue::Int64(i)) => Ok(Value::Number((*i).into())),
            Some(odata_core::SemanticValue::Float64(f)) => Ok(serde_json::Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null)),
            _ => node
                .token
                .value
                .parse::<i64>()
                .map(|v| Value::Number(v.into()))
                .or_else(|_| node.token.value.parse::<f64>().map(|v| serde_json::Number::from_f64(v).map(Value::Number).unwrap_or(Value::Null)))
                .map_err(|_| Error::type_error(format!("invalid numeric literal '{}'", node.token.value))),
        },
        kinds::FUNCTION => eval_function(node, row, entity),
        kinds::EQ | kinds::NE => {
            let ordering = compare(&eval_scalar(&node.children[0], row, entity)?, &eval_scalar(&node.children[1], row, entity)?)?;
            let equal = ordering == Some(Ordering::Equal);
            Ok(Value::Bool(if node.token.kind == kinds::EQ { equal } else { !equal }))
        }
        kinds::GT | kinds::GE | kinds::LT | kinds::LE => {
            let left = eval_scalar(&node.children[0], row, entity)?;
            let right = eval_scalar(&node.children[1], row, entity)?;
            let Some(ordering) = compare(&left, &right)? else {
                return Ok(Value::Bool(false));
            };
            let result = match node.token.kind {
                kinds::GT => ordering == Ordering::Greater,
                kinds::GE => ordering != Ordering::Less,
                kinds::LT => ordering == Ordering::Less,
                kinds::LE => ordering != Ordering::Greater,
                _ => unreachable!(),
            };
            Ok(Value::Bool(result))
        }
        kinds::ADD | kinds::SUB | kinds::MUL | kinds::DIV | kinds::MOD => {
            let left = as_f64(&eval_scalar(&node.children[0], row, entity)?)?;
            let right = as_f64(&eval_scalar(&node.children[1], row, entity)?)?;
            let result = match node.token.kind {
                kinds::ADD => left + right,
                kinds::SUB => left - right,
                kinds::MUL => left * right,
                kinds::DIV => left / right,
                kinds::MOD => left % right,
                _ => unreachable!(),
            };
            Ok(serde_json::Number::from_f64(result).map(Value::Number).unwrap_or(Value::Null))
        }
        kinds::AND => Ok(Value::Bool(eval_predicate(&node.children[0], row, entity)? && eval_predicate(&node.children[1], row, entity)?)),
        kinds::OR => Ok(Value::Bool(eval_predicate(&node.children[0], row, entity)? || eval_predicate(&node.children[1], row, entity)?)),
        kinds::NOT => Ok(Value::Bool(!eval_predicate(&node.children[0], row, entity)?)),
        other => Err(Error::build(format!("token kind {other} cannot be evaluated in memory"))),
    }
}

fn as_f64(value: &Value) -> Result<f64> {
    value.as_f64().ok_or_else(|| Error::type_error(format!("expected a number, got {value}")))
}

fn as_str(value: &Value) -> Result<&str> {
    value.as_str().ok_or_else(|| Error::type_error(format!("expected a string, got {value}")))
}

fn as_datetime(value: &Value) -> Result<DateTime<Utc>> {
    let raw = as_str(value)?;
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| Error::type_error(format!("'{raw}' is not a valid RFC 3339 timestamp")))
}

/// Compares two scalar JSON values, preferring numeric/boolean comparison
/// over a lexicographic fallback when both operands are of the same kind.
/// `Ok(None)` means one side is `null` (no ordering, comparisons are false).
fn compare(left: &Value, right: &Value) -> Result<Option<Ordering>> {
    if left.is_null() || right.is_null() {
        return Ok(None);
    }
    if let (Some(l), Some(r)) = (left.as_f64(), right.as_f64()) {
        return Ok(l.partial_cmp(&r));
    }
    if let (Some(l), Some(r)) = (left.as_bool(), right.as_bool()) {
        return Ok(Some(l.cmp(&r)));
    }
    if let (Some(l), Some(r)) = (left.as_str(), right.as_str()) {
        return Ok(Some(l.cmp(r)));
    }
    Err(Error::type_error(format!("cannot compare {left} and {right}")))
}

fn eval_function(node: &ParseNode, row: &OrderedEntity, entity: &EntityMetadata) -> Result<Value> {
    let name = node.token.value.to_ascii_lowercase();
    let args: Result<Vec<Value>> = node.children.iter().map(|c| eval_scalar(c, row, entity)).collect();
    let args = args?;

    match name.as_str() {
        "contains" => Ok(Value::Bool(as_str(&args[0])?.contains(as_str(&args[1])?))),
        "startswith" => Ok(Value::Bool(as_str(&args[0])?.starts_with(as_str(&args[1])?))),
        "endswith" => Ok(Value::Bool(as_str(&args[0])?.ends_with(as_str(&args[1])?))),
        "indexof" => {
            let haystack = as_str(&args[0])?;
            let needle = as_str(&args[1])?;
            let idx = haystack.find(needle).map(|b| haystack[..b].chars().count() as i64).unwrap_or(-1);
            Ok(Value::Number(idx.into()))
        }
        "substring" => {
            let source: Vec<char> = as_str(&args[0])?.chars().collect();
            let start = as_f64(&args[1])? as usize;
            let text = match args.get(2) {
                Some(len) => source.into_iter().skip(start).take(as_f64(len)? as usize).collect::<String>(),
                None => source.into_iter().skip(start).collect::<String>(),
            };
            Ok(Value::String(text))
        }
        "concat" => Ok(Value::String(format!("{}{}", as_str(&args[0])?, as_str(&args[1])?))),
        "tolower" => Ok(Value::String(as_str(&args[0])?.to_lowercase())),
        "toupper" => Ok(Value::String(as_str(&args[0])?.to_uppercase())),
        "trim" => Ok(Value::String(as_str(&args[0])?.trim().to_string())),
        "length" => Ok(Value::Number((as_str(&args[0])?.chars().count() as i64).into())),
        "year" => Ok(Value::Number(as_datetime(&args[0])?.year().into())),
        "month" => Ok(Value::Number(as_datetime(&args[0])?.month().into())),
        "day" => Ok(Value::Number(as_datetime(&args[0])?.day().into())),
        "hour" => Ok(Value::Number(as_datetime(&args[0])?.hour().into())),
        "minute" => Ok(Value::Number(as_datetime(&args[0])?.minute().into())),
        "second" => Ok(Value::Number(as_datetime(&args[0])?.second().into())),
        "round" => Ok(serde_json::Number::from_f64(as_f64(&args[0])?.round()).map(Value::Number).unwrap_or(Value::Null)),
        "floor" => Ok(serde_json::Number::from_f64(as_f64(&args[0])?.floor()).map(Value::Number).unwrap_or(Value::Null)),
        "ceiling" => Ok(serde_json::Number::from_f64(as_f64(&args[0])?.ceil()).map(Value::Number).unwrap_or(Value::Null)),
        "now" => Ok(Value::String(Utc::now().to_rfc3339())),
        other => Err(Error::build(format!("function '{other}' is not supported in in-memory evaluation"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use odata_core::{PropertyMetadata, PropertyType, Token};

    fn ativos() -> EntityMetadata {
        EntityMetadata::new(
            "FabTarefa",
            vec![
                PropertyMetadata::scalar("ID", PropertyType::Int64).key(),
                PropertyMetadata::scalar("Ativo", PropertyType::String),
            ],
        )
    }

    fn row(ativo: &str) -> OrderedEntity {
        let mut row = OrderedEntity::new();
        row.insert("ID", serde_json::json!(1));
        row.insert("Ativo", serde_json::json!(ativo));
        row
    }

    fn eq_tree(value: &str) -> ParseNode {
        ParseNode::new(
            Token::new(kinds::EQ, "eq"),
            vec![
                ParseNode::leaf(Token::new(kinds::IDENT, "Ativo")),
                ParseNode::leaf(Token::new(kinds::STRING, value)),
            ],
        )
    }

    #[test]
    fn matching_predicate_is_true() {
        assert!(eval_predicate(&eq_tree("S"), &row("S"), &ativos()).unwrap());
    }

    #[test]
    fn non_matching_predicate_is_false() {
        assert!(!eval_predicate(&eq_tree("S"), &row("N"), &ativos()).unwrap());
    }

    #[test]
    fn numeric_comparison_is_type_aware_not_lexicographic() {
        let entity = EntityMetadata::new("Items", vec![PropertyMetadata::scalar("Qty", PropertyType::Int32)]);
        let mut row = OrderedEntity::new();
        row.insert("Qty", serde_json::json!(9));
        let tree = ParseNode::new(
            Token::new(kinds::GT, "gt"),
            vec![
                ParseNode::leaf(Token::new(kinds::IDENT, "Qty")),
                ParseNode::leaf(Token::new(kinds::NUMBER, "10").with_semantic(odata_core::SemanticValue::Int64(10))),
            ],
        );
        // Lexicographically "9" > "10", but numerically 9 < 10.
        assert!(!eval_predicate(&tree, &row, &entity).unwrap());
    }

    #[test]
    fn comparison_against_null_is_false() {
        let entity = ativos();
        let mut row = OrderedEntity::new();
        row.insert("Ativo", Value::Null);
        let tree = eq_tree("S");
        assert!(!eval_predicate(&tree, &row, &entity).unwrap());
    }
}
