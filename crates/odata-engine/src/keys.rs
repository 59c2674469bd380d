//! Parses the `($key)` segment of a single-entity URL (spec §6 `GET
//! /<EntitySet>($key)`) into a typed [`OrderedEntity`], and turns that back
//! into an `AND`-chained equality [`ParseNode`] for `odata_sql::build_select`.

use odata_core::{EntityMetadata, Error, OrderedEntity, ParseNode, PropertyType, Result, SemanticValue, Token};
use odata_lang::kinds;
use odata_lang::text::split_top_level;
use serde_json::Value;

fn coerce_literal(raw: &str, property_type: PropertyType, property_name: &str) -> Result<Value> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("null") {
        return Ok(Value::Null);
    }
    match property_type {
        PropertyType::String | PropertyType::DateTime | PropertyType::Date | PropertyType::TimeOfDay => {
            let unquoted = raw
                .strip_prefix('\'')
                .and_then(|s| s.strip_suffix('\''))
                .unwrap_or(raw);
            Ok(Value::String(unquoted.replace("''", "'")))
        }
        PropertyType::Bool => raw
            .parse::<bool>()
            .map(Value::Bool)
            .map_err(|_| Error::type_error(format!("key value for '{property_name}' is not a boolean"))),
        PropertyType::Int32 | PropertyType::Int64 => raw
            .parse::<i64>()
            .map(|v| Value::Number(v.into()))
            .map_err(|_| Error::type_error(format!("key value for '{property_name}' is not an integer"))),
        PropertyType::Float32 | PropertyType::Float64 => raw
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| Error::type_error(format!("key value for '{property_name}' is not a number"))),
        PropertyType::Bytes => Ok(Value::String(raw.to_string())),
    }
}

/// Parses `53` (single key) or `ID=53,Name='x'` (composite key) against
/// `entity`'s declared key properties, in declaration order for the bare
/// single-key form.
pub fn parse_key_segment(entity: &EntityMetadata, raw: &str) -> Result<OrderedEntity> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(Error::parse("empty key segment"));
    }

    let mut keys: Vec<_> = entity.key_properties().collect();
    if keys.is_empty() {
        return Err(Error::build(format!("entity '{}' declares no key properties", entity.name)));
    }

    let mut result = OrderedEntity::new();
    if !raw.contains('=') {
        if keys.len() != 1 {
            return Err(Error::parse(format!(
                "entity '{}' has a composite key; use Name=Value,... form",
                entity.name
            )));
        }
        let property = keys.remove(0);
        let value = coerce_literal(raw, property.property_type, &property.name)?;
        result.insert(property.name.clone(), value);
        return Ok(result);
    }

    for pair in split_top_level(raw, &[',']) {
        let (name, value) = pair
            .split_once('=')
            .ok_or_else(|| Error::parse(format!("malformed key segment clause: {pair}")))?;
        let name = name.trim();
        let property = entity
            .find_property(name)
            .filter(|p| p.is_key)
            .ok_or_else(|| Error::semantic(format!("'{name}' is not a key property of '{}'", entity.name)))?;
        let coerced = coerce_literal(value, property.property_type, &property.name)?;
        result.insert(property.name.clone(), coerced);
    }

    for property in &keys {
        if result.get(&property.name).is_none() {
            return Err(Error::parse(format!("key segment is missing '{}' ", property.name)));
        }
    }
    Ok(result)
}

fn json_to_literal_node(value: &Value, property_type: PropertyType, property_name: &str) -> Result<ParseNode> {
    if value.is_null() {
        return Ok(ParseNode::leaf(Token::new(kinds::NULL, "null")));
    }
    match property_type {
        PropertyType::Int32 | PropertyType::Int64 => {
            let n = value
                .as_i64()
                .ok_or_else(|| Error::type_error(format!("'{property_name}' expects an integer")))?;
            Ok(ParseNode::leaf(Token::new(kinds::NUMBER, n.to_string()).with_semantic(SemanticValue::Int64(n))))
        }
        PropertyType::Float32 | PropertyType::Float64 => {
            let f = value
                .as_f64()
                .ok_or_else(|| Error::type_error(format!("'{property_name}' expects a number")))?;
            Ok(ParseNode::leaf(Token::new(kinds::NUMBER, f.to_string()).with_semantic(SemanticValue::Float64(f))))
        }
        PropertyType::Bool => {
            let b = value
                .as_bool()
                .ok_or_else(|| Error::type_error(format!("'{property_name}' expects a boolean")))?;
            Ok(ParseNode::leaf(Token::new(kinds::BOOL, b.to_string())))
        }
        _ => {
            let s = value
                .as_str()
                .ok_or_else(|| Error::type_error(format!("'{property_name}' expects a string")))?;
            Ok(ParseNode::leaf(Token::new(kinds::STRING, s.to_string())))
        }
    }
}

/// Builds `prop1 eq v1 and prop2 eq v2 and ...` over every key property, for
/// use as the `$filter` of a single-entity `GET`/`PATCH`/`DELETE`.
pub fn key_filter_tree(entity: &EntityMetadata, keys: &OrderedEntity) -> Result<ParseNode> {
    let mut clauses = Vec::new();
    for property in entity.key_properties() {
        let value = keys
            .get(&property.name)
            .ok_or_else(|| Error::build(format!("missing key value for '{}'", property.name)))?;
        let literal = json_to_literal_node(value, property.property_type, &property.name)?;
        let ident = ParseNode::leaf(Token::new(kinds::IDENT, property.name.clone()));
        clauses.push(ParseNode::new(Token::new(kinds::EQ, "eq"), vec![ident, literal]));
    }
    clauses
        .into_iter()
        .reduce(|left, right| ParseNode::new(Token::new(kinds::AND, "and"), vec![left, right]))
        .ok_or_else(|| Error::build(format!("entity '{}' has no key properties", entity.name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use odata_core::{EntityMetadata, PropertyMetadata};

    fn users() -> EntityMetadata {
        EntityMetadata::new(
            "Users",
            vec![
                PropertyMetadata::scalar("ID", PropertyType::Int64).key(),
                PropertyMetadata::scalar("Name", PropertyType::String),
            ],
        )
    }

    fn composite() -> EntityMetadata {
        EntityMetadata::new(
            "Memberships",
            vec![
                PropertyMetadata::scalar("UserID", PropertyType::Int64).key(),
                PropertyMetadata::scalar("GroupID", PropertyType::Int64).key(),
            ],
        )
    }

    #[test]
    fn single_key_is_coerced_to_declared_type() {
        let keys = parse_key_segment(&users(), "53").unwrap();
        assert_eq!(keys.get("ID"), Some(&serde_json::json!(53)));
    }

    #[test]
    fn single_key_rejects_composite_entity() {
        assert!(parse_key_segment(&composite(), "53").is_err());
    }

    #[test]
    fn composite_key_parses_every_property() {
        let keys = parse_key_segment(&composite(), "UserID=1,GroupID=2").unwrap();
        assert_eq!(keys.get("UserID"), Some(&serde_json::json!(1)));
        assert_eq!(keys.get("GroupID"), Some(&serde_json::json!(2)));
    }

    #[test]
    fn composite_key_missing_property_is_rejected() {
        assert!(parse_key_segment(&composite(), "UserID=1").is_err());
    }

    #[test]
    fn key_filter_tree_and_chains_every_key() {
        let keys = parse_key_segment(&composite(), "UserID=1,GroupID=2").unwrap();
        let tree = key_filter_tree(&composite(), &keys).unwrap();
        assert_eq!(tree.token.kind, kinds::AND);
    }
}
