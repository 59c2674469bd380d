use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One of the string type tags a property may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PropertyType {
    Int32,
    Int64,
    Float32,
    Float64,
    String,
    Bool,
    Bytes,
    DateTime,
    Date,
    TimeOfDay,
}

impl PropertyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::String => "string",
            Self::Bool => "bool",
            Self::Bytes => "[]byte",
            Self::DateTime => "datetime",
            Self::Date => "date",
            Self::TimeOfDay => "timeofday",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Int32 | Self::Int64 | Self::Float32 | Self::Float64)
    }

    pub fn is_textual(&self) -> bool {
        matches!(self, Self::String | Self::Bytes)
    }
}

/// The two ends of a navigation join, named as declared in metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub local_property: String,
    pub referenced_property: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyMetadata {
    pub name: String,
    pub column_name: Option<String>,
    #[serde(rename = "type")]
    pub property_type: PropertyType,
    pub is_key: bool,
    pub is_nullable: bool,
    pub is_navigation: bool,
    pub is_collection: bool,
    pub related_type: Option<String>,
    pub relationship: Option<Relationship>,
}

impl PropertyMetadata {
    pub fn scalar(name: impl Into<String>, property_type: PropertyType) -> Self {
        Self {
            name: name.into(),
            column_name: None,
            property_type,
            is_key: false,
            is_nullable: true,
            is_navigation: false,
            is_collection: false,
            related_type: None,
            relationship: None,
        }
    }

    pub fn key(mut self) -> Self {
        self.is_key = true;
        self.is_nullable = false;
        self
    }

    pub fn not_nullable(mut self) -> Self {
        self.is_nullable = false;
        self
    }

    pub fn with_column(mut self, column_name: impl Into<String>) -> Self {
        self.column_name = Some(column_name.into());
        self
    }

    pub fn navigation(
        name: impl Into<String>,
        related_type: impl Into<String>,
        is_collection: bool,
        relationship: Relationship,
    ) -> Self {
        Self {
            name: name.into(),
            column_name: None,
            property_type: PropertyType::String,
            is_key: false,
            is_nullable: true,
            is_navigation: true,
            is_collection,
            related_type: Some(related_type.into()),
            relationship: Some(relationship),
        }
    }

    /// Column to use in generated SQL, falling back to the property name.
    pub fn column(&self) -> &str {
        self.column_name.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityMetadata {
    pub name: String,
    pub table_name: Option<String>,
    pub properties: Vec<PropertyMetadata>,
}

impl EntityMetadata {
    pub fn new(name: impl Into<String>, properties: Vec<PropertyMetadata>) -> Self {
        Self { name: name.into(), table_name: None, properties }
    }

    pub fn with_table(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = Some(table_name.into());
        self
    }

    pub fn table(&self) -> &str {
        self.table_name.as_deref().unwrap_or(&self.name)
    }

    /// Case-insensitive property lookup; metadata order defines canonical
    /// casing and output field order.
    pub fn find_property(&self, name: &str) -> Option<&PropertyMetadata> {
        self.properties
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    pub fn key_properties(&self) -> impl Iterator<Item = &PropertyMetadata> {
        self.properties.iter().filter(|p| p.is_key)
    }

    pub fn scalar_properties(&self) -> impl Iterator<Item = &PropertyMetadata> {
        self.properties.iter().filter(|p| !p.is_navigation)
    }

    pub fn navigation_properties(&self) -> impl Iterator<Item = &PropertyMetadata> {
        self.properties.iter().filter(|p| p.is_navigation)
    }
}

/// Process-scoped, read-only-after-registration lookup of `EntityMetadata`
/// by entity name, used by the semantic analyzer and the expand engine to
/// resolve `related_type` names (§6 "metadata registry").
#[derive(Debug, Clone, Default)]
pub struct MetadataRegistry {
    entities: HashMap<String, EntityMetadata>,
}

impl MetadataRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, metadata: EntityMetadata) {
        self.entities.insert(metadata.name.to_ascii_lowercase(), metadata);
    }

    pub fn get(&self, name: &str) -> Option<&EntityMetadata> {
        self.entities.get(&name.to_ascii_lowercase())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entities.values().map(|e| e.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> EntityMetadata {
        EntityMetadata::new(
            "Users",
            vec![
                PropertyMetadata::scalar("ID", PropertyType::Int64).key(),
                PropertyMetadata::scalar("Name", PropertyType::String),
                PropertyMetadata::scalar("Age", PropertyType::Int32),
            ],
        )
    }

    #[test]
    fn table_falls_back_to_name() {
        let meta = users();
        assert_eq!(meta.table(), "Users");
    }

    #[test]
    fn find_property_is_case_insensitive() {
        let meta = users();
        assert_eq!(meta.find_property("age").unwrap().name, "Age");
        assert!(meta.find_property("missing").is_none());
    }

    #[test]
    fn column_falls_back_to_property_name() {
        let prop = PropertyMetadata::scalar("Name", PropertyType::String);
        assert_eq!(prop.column(), "Name");
        let renamed = prop.with_column("full_name");
        assert_eq!(renamed.column(), "full_name");
    }

    #[test]
    fn registry_lookup_is_case_insensitive() {
        let mut registry = MetadataRegistry::new();
        registry.register(users());
        assert!(registry.get("users").is_some());
        assert!(registry.get("USERS").is_some());
        assert!(registry.get("Orders").is_none());
    }
}
