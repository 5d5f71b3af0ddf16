//! Persistence engine abstraction.
//!
//! An engine owns entities, collections, scalar values, and named sequences.
//! Several engines may be registered under distinct names; a mock selects one
//! by name and an empty name falls back to the configured default. Engines
//! are the only shared mutable state in the server and must behave as if
//! every operation ran under a per-key mutual-exclusion discipline.

pub mod actions;
pub mod file;
pub mod memory;

pub use actions::EntityActions;
pub use file::FileEngine;
pub use memory::MemoryEngine;

use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Failure of an engine operation.
#[derive(Debug, Error)]
pub enum PersistError {
    /// The named entity, collection, value, or sequence does not exist
    #[error("{0:?} was not found")]
    NotFound(String),

    /// The name is empty or would escape the engine's namespace
    #[error("invalid name {0:?}")]
    InvalidName(String),

    /// Underlying I/O failure
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Storage contract every engine implements.
pub trait PersistEngine: Send + Sync {
    /// Engine name used for registry lookup and back-fill.
    fn name(&self) -> &str;

    /// Read an entity's content.
    fn read(&self, name: &str) -> Result<String, PersistError>;

    /// Write (overwrite) an entity's content.
    fn write(&self, name: &str, content: &str) -> Result<(), PersistError>;

    /// Delete an entity.
    fn delete(&self, name: &str) -> Result<(), PersistError>;

    /// Read a whole collection, assembled as a JSON array.
    fn read_collection(&self, name: &str) -> Result<String, PersistError>;

    /// Delete a whole collection.
    fn delete_collection(&self, name: &str) -> Result<(), PersistError>;

    /// Return the current value of a named counter, then advance it by
    /// `increment`. Counters start at 1; an increment of 0 is a pure read.
    fn get_sequence(&self, name: &str, increment: i64) -> Result<i64, PersistError>;

    /// Read a scalar value.
    fn get_value(&self, key: &str) -> Result<String, PersistError>;

    /// Write a scalar value.
    fn set_value(&self, key: &str, value: &str) -> Result<(), PersistError>;
}

/// Registry of named engines with a default fallback.
pub struct EngineRegistry {
    engines: HashMap<String, Arc<dyn PersistEngine>>,
    default_name: String,
}

impl EngineRegistry {
    /// Create a registry whose default is the given engine.
    pub fn new(default_engine: Arc<dyn PersistEngine>) -> Self {
        let default_name = default_engine.name().to_string();
        let mut engines = HashMap::new();
        engines.insert(default_name.clone(), default_engine);
        Self {
            engines,
            default_name,
        }
    }

    /// Register an additional engine under its own name.
    pub fn register(&mut self, engine: Arc<dyn PersistEngine>) {
        self.engines.insert(engine.name().to_string(), engine);
    }

    /// Look an engine up by name. Empty or unknown names resolve to the
    /// default engine.
    pub fn get(&self, name: &str) -> Arc<dyn PersistEngine> {
        if !name.is_empty() {
            if let Some(engine) = self.engines.get(name) {
                return Arc::clone(engine);
            }
        }
        Arc::clone(&self.engines[&self.default_name])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_default_fallback() {
        let mut registry = EngineRegistry::new(Arc::new(MemoryEngine::new("memory")));
        registry.register(Arc::new(MemoryEngine::new("scratch")));

        assert_eq!(registry.get("").name(), "memory");
        assert_eq!(registry.get("scratch").name(), "scratch");
        assert_eq!(registry.get("no-such-engine").name(), "memory");
    }
}
