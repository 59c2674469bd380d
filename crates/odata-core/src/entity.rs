use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::collections::HashMap;

/// A row materialization that preserves property insertion order so the
/// serialized JSON matches the metadata-declared order: scanned properties,
/// then computed aliases, then expanded/linked navigation properties.
/// Lookup is O(1) via a side index, falling back to a case-insensitive scan
/// on miss.
#[derive(Debug, Clone, Default)]
pub struct OrderedEntity {
    fields: Vec<(String, Value)>,
    index: HashMap<String, usize>,
}

impl OrderedEntity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        if let Some(&idx) = self.index.get(&name) {
            self.fields[idx].1 = value;
            return;
        }
        self.index.insert(name.clone(), self.fields.len());
        self.fields.push((name, value));
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        if let Some(&idx) = self.index.get(name) {
            return Some(&self.fields[idx].1);
        }
        self.fields
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for OrderedEntity {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (k, v) in &self.fields {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// Produced (§3/§6): the envelope returned for a collection or single-entity
/// request. `@odata.context` always points at the entity set's metadata
/// document; `count` is present only when `$count=true` was requested.
#[derive(Debug, Clone, Serialize)]
pub struct ODataResponse {
    #[serde(rename = "@odata.context")]
    pub context: String,
    #[serde(rename = "@odata.count", skip_serializing_if = "Option::is_none")]
    pub count: Option<i64>,
    pub value: ODataValue,
}

#[derive(Debug, Clone)]
pub enum ODataValue {
    Collection(Vec<OrderedEntity>),
    Single(Box<OrderedEntity>),
}

impl Serialize for ODataValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Collection(entities) => entities.serialize(serializer),
            Self::Single(entity) => entity.serialize(serializer),
        }
    }
}

impl ODataResponse {
    pub fn collection(entity_set: impl Into<String>, entities: Vec<OrderedEntity>) -> Self {
        Self {
            context: format!("$metadata#{}", entity_set.into()),
            count: None,
            value: ODataValue::Collection(entities),
        }
    }

    pub fn with_count(mut self, count: i64) -> Self {
        self.count = Some(count);
        self
    }

    pub fn single(entity_set: impl Into<String>, entity: OrderedEntity) -> Self {
        Self {
            context: format!("$metadata#{}/$entity", entity_set.into()),
            count: None,
            value: ODataValue::Single(Box::new(entity)),
        }
    }
}

/// Produced error shape (§6): `{"error": {"code", "message"}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ODataErrorBody {
    pub error: ODataErrorDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ODataErrorDetail {
    pub code: String,
    pub message: String,
}

impl ODataErrorBody {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ODataErrorDetail { code: code.into(), message: message.into() },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn insertion_order_is_preserved() {
        let mut entity = OrderedEntity::new();
        entity.insert("Name", json!("John"));
        entity.insert("Age", json!(30));
        let keys: Vec<_> = entity.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["Name", "Age"]);
    }

    #[test]
    fn lookup_falls_back_to_case_insensitive() {
        let mut entity = OrderedEntity::new();
        entity.insert("Name", json!("John"));
        assert_eq!(entity.get("name"), Some(&json!("John")));
        assert_eq!(entity.get("NAME"), Some(&json!("John")));
    }

    #[test]
    fn re_insert_updates_value_without_moving_position() {
        let mut entity = OrderedEntity::new();
        entity.insert("Name", json!("John"));
        entity.insert("Age", json!(30));
        entity.insert("Name", json!("Jane"));
        let keys: Vec<_> = entity.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["Name", "Age"]);
        assert_eq!(entity.get("Name"), Some(&json!("Jane")));
    }

    #[test]
    fn collection_response_context_names_entity_set() {
        let resp = ODataResponse::collection("Users", vec![]);
        assert_eq!(resp.context, "$metadata#Users");
    }

    #[test]
    fn single_response_context_has_entity_suffix() {
        let resp = ODataResponse::single("Users", OrderedEntity::new());
        assert_eq!(resp.context, "$metadata#Users/$entity");
    }

    #[test]
    fn error_body_serializes_to_spec_shape() {
        let body = ODataErrorBody::new("NotFound", "Users/1 not found");
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["error"]["code"], "NotFound");
        assert_eq!(value["error"]["message"], "Users/1 not found");
    }
}
