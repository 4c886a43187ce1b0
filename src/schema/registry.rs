//! Entity registry
//!
//! Entities are loaded once at startup from a JSON schema file of the form
//! `{ "entities": [ ... ] }` and are read-only afterwards. Malformed files
//! fail the load as a whole; nothing is registered partially.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use super::errors::{SchemaError, SchemaResult};
use super::types::EntityDescriptor;

#[derive(Debug, Deserialize)]
struct SchemaFile {
    entities: Vec<EntityDescriptor>,
}

/// Read-only registry of entities indexed by name.
#[derive(Debug, Default)]
pub struct EntityRegistry {
    entities: BTreeMap<String, EntityDescriptor>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the registry from a schema file on disk.
    pub fn load(path: &Path) -> SchemaResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| SchemaError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&content, &path.display().to_string())
    }

    /// Parses a registry from JSON text. `origin` names the source in errors.
    pub fn from_json(content: &str, origin: &str) -> SchemaResult<Self> {
        let file: SchemaFile = serde_json::from_str(content)
            .map_err(|e| SchemaError::malformed(origin, format!("Invalid JSON: {}", e)))?;

        let mut registry = Self::new();
        for entity in file.entities {
            registry.register(entity)?;
        }
        Ok(registry)
    }

    /// Registers an entity directly (for tests or programmatic setup).
    pub fn register(&mut self, entity: EntityDescriptor) -> SchemaResult<()> {
        if self.entities.contains_key(&entity.name) {
            return Err(SchemaError::DuplicateEntity(entity.name));
        }
        self.entities.insert(entity.name.clone(), entity);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&EntityDescriptor> {
        self.entities.get(name)
    }

    pub fn entities(&self) -> impl Iterator<Item = &EntityDescriptor> {
        self.entities.values()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
