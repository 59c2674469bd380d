//! A process-scoped, read-only-after-boot handle to a [`MetadataRegistry`]
//! (spec §6 "metadata registry"), grounded on the teacher's
//! `SearchParameterRegistry` (indexed once at startup from loaded packages,
//! never mutated afterward). Here entity definitions come from a declarative
//! schema file rather than FHIR packages, but the shape is the same: load
//! once, share an immutable `Arc` with every request.

use odata_core::{EntityMetadata, MetadataRegistry};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("failed to read schema file {path}: {source}")]
    Read { path: String, #[source] source: std::io::Error },
    #[error("failed to parse schema file {path}: {source}")]
    Parse { path: String, #[source] source: toml::de::Error },
}

#[derive(Debug, Deserialize)]
struct SchemaFile {
    entities: Vec<EntityMetadata>,
}

/// An immutable, cheaply-cloneable handle to the registered entity set.
#[derive(Debug, Clone)]
pub struct EntityRegistry(Arc<MetadataRegistry>);

impl EntityRegistry {
    pub fn new(registry: MetadataRegistry) -> Self {
        Self(Arc::new(registry))
    }

    /// Loads entity definitions from a TOML schema file shaped as
    /// `[[entities]] name = "..." table_name = "..." [[entities.properties]] ...`.
    pub fn load_schema_file(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let path_ref = path.as_ref();
        let text = std::fs::read_to_string(path_ref)
            .map_err(|source| RegistryError::Read { path: path_ref.display().to_string(), source })?;
        let parsed: SchemaFile = toml::from_str(&text)
            .map_err(|source| RegistryError::Parse { path: path_ref.display().to_string(), source })?;

        let mut registry = MetadataRegistry::new();
        for entity in parsed.entities {
            registry.register(entity);
        }
        Ok(Self::new(registry))
    }

    pub fn inner(&self) -> &MetadataRegistry {
        &self.0
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.names()
    }
}

impl std::ops::Deref for EntityRegistry {
    type Target = MetadataRegistry;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_entities_from_a_schema_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [[entities]]
            name = "Products"
            table_name = "products"

            [[entities.properties]]
            name = "ID"
            type = "int64"
            is_key = true
            is_nullable = false
            is_navigation = false
            is_collection = false

            [[entities.properties]]
            name = "Name"
            type = "string"
            is_key = false
            is_nullable = true
            is_navigation = false
            is_collection = false
            "#
        )
        .unwrap();

        let registry = EntityRegistry::load_schema_file(file.path()).unwrap();
        assert!(registry.get("products").is_some());
        assert_eq!(registry.get("products").unwrap().table(), "products");
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = EntityRegistry::load_schema_file("/nonexistent/schema.toml").unwrap_err();
        assert!(matches!(err, RegistryError::Read { .. }));
    }
}
