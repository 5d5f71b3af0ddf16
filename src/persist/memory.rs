//! In-memory persistence engine.
//!
//! The default engine when no file root is configured. Collections are
//! modeled as a `name/` key prefix; iteration order is deterministic.

use super::{PersistEngine, PersistError};
use crate::json;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, PoisonError};

/// Mutex-guarded in-memory engine.
pub struct MemoryEngine {
    name: String,
    entities: Mutex<BTreeMap<String, String>>,
    values: Mutex<HashMap<String, String>>,
    sequences: Mutex<HashMap<String, i64>>,
}

impl MemoryEngine {
    /// Create an empty engine registered under `name`.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            entities: Mutex::new(BTreeMap::new()),
            values: Mutex::new(HashMap::new()),
            sequences: Mutex::new(HashMap::new()),
        }
    }
}

impl PersistEngine for MemoryEngine {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&self, name: &str) -> Result<String, PersistError> {
        let entities = self.entities.lock().unwrap_or_else(PoisonError::into_inner);
        entities
            .get(name)
            .cloned()
            .ok_or_else(|| PersistError::NotFound(name.to_string()))
    }

    fn write(&self, name: &str, content: &str) -> Result<(), PersistError> {
        if name.is_empty() {
            return Err(PersistError::InvalidName(name.to_string()));
        }
        let mut entities = self.entities.lock().unwrap_or_else(PoisonError::into_inner);
        entities.insert(name.to_string(), content.to_string());
        Ok(())
    }

    fn delete(&self, name: &str) -> Result<(), PersistError> {
        let mut entities = self.entities.lock().unwrap_or_else(PoisonError::into_inner);
        entities
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| PersistError::NotFound(name.to_string()))
    }

    fn read_collection(&self, name: &str) -> Result<String, PersistError> {
        let prefix = format!("{name}/");
        let entities = self.entities.lock().unwrap_or_else(PoisonError::into_inner);
        let items: Vec<String> = entities
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(&prefix))
            .map(|(_, content)| json::wrap_non_json(content))
            .collect();

        if items.is_empty() {
            return Err(PersistError::NotFound(name.to_string()));
        }
        Ok(format!("[{}]", items.join(",")))
    }

    fn delete_collection(&self, name: &str) -> Result<(), PersistError> {
        let prefix = format!("{name}/");
        let mut entities = self.entities.lock().unwrap_or_else(PoisonError::into_inner);
        let keys: Vec<String> = entities
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(&prefix))
            .map(|(key, _)| key.clone())
            .collect();

        if keys.is_empty() {
            return Err(PersistError::NotFound(name.to_string()));
        }
        for key in keys {
            entities.remove(&key);
        }
        Ok(())
    }

    fn get_sequence(&self, name: &str, increment: i64) -> Result<i64, PersistError> {
        let mut sequences = self.sequences.lock().unwrap_or_else(PoisonError::into_inner);
        let counter = sequences.entry(name.to_string()).or_insert(1);
        let current = *counter;
        *counter = current + increment;
        Ok(current)
    }

    fn get_value(&self, key: &str) -> Result<String, PersistError> {
        let values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values
            .get(key)
            .cloned()
            .ok_or_else(|| PersistError::NotFound(key.to_string()))
    }

    fn set_value(&self, key: &str, value: &str) -> Result<(), PersistError> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_round_trip() {
        let engine = MemoryEngine::new("memory");
        engine.write("users/1.json", r#"{"id": 1}"#).unwrap();

        assert_eq!(engine.read("users/1.json").unwrap(), r#"{"id": 1}"#);
        engine.delete("users/1.json").unwrap();
        assert!(matches!(
            engine.read("users/1.json"),
            Err(PersistError::NotFound(_))
        ));
    }

    #[test]
    fn test_collection_assembles_array() {
        let engine = MemoryEngine::new("memory");
        engine.write("users/1.json", r#"{"id": 1}"#).unwrap();
        engine.write("users/2.json", r#"{"id": 2}"#).unwrap();
        engine.write("orders/1.json", r#"{"id": 9}"#).unwrap();

        assert_eq!(
            engine.read_collection("users").unwrap(),
            r#"[{"id": 1},{"id": 2}]"#
        );
    }

    #[test]
    fn test_collection_wraps_non_json_items() {
        let engine = MemoryEngine::new("memory");
        engine.write("notes/1.txt", "plain text").unwrap();

        assert_eq!(
            engine.read_collection("notes").unwrap(),
            r#"[{"non_json_content":"plain text"}]"#
        );
    }

    #[test]
    fn test_missing_collection() {
        let engine = MemoryEngine::new("memory");
        assert!(matches!(
            engine.read_collection("users"),
            Err(PersistError::NotFound(_))
        ));
    }

    #[test]
    fn test_delete_collection() {
        let engine = MemoryEngine::new("memory");
        engine.write("users/1.json", "{}").unwrap();
        engine.write("users/2.json", "{}").unwrap();

        engine.delete_collection("users").unwrap();
        assert!(engine.read_collection("users").is_err());
    }

    #[test]
    fn test_sequence_semantics() {
        let engine = MemoryEngine::new("memory");

        // Increment 0 is a pure read
        assert_eq!(engine.get_sequence("users", 0).unwrap(), 1);
        assert_eq!(engine.get_sequence("users", 0).unwrap(), 1);

        // Increment 1 returns consecutive values
        assert_eq!(engine.get_sequence("users", 1).unwrap(), 1);
        assert_eq!(engine.get_sequence("users", 1).unwrap(), 2);
        assert_eq!(engine.get_sequence("users", 0).unwrap(), 3);
    }

    #[test]
    fn test_values() {
        let engine = MemoryEngine::new("memory");
        assert!(engine.get_value("color").is_err());

        engine.set_value("color", "green").unwrap();
        assert_eq!(engine.get_value("color").unwrap(), "green");
    }

    #[test]
    fn test_concurrent_sequence_increments_are_distinct() {
        use std::sync::Arc;

        let engine = Arc::new(MemoryEngine::new("memory"));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let engine = Arc::clone(&engine);
            handles.push(std::thread::spawn(move || {
                (0..100)
                    .map(|_| engine.get_sequence("shared", 1).unwrap())
                    .collect::<Vec<_>>()
            }));
        }

        let mut seen = std::collections::HashSet::new();
        for handle in handles {
            for value in handle.join().unwrap() {
                assert!(seen.insert(value), "duplicate sequence value {value}");
            }
        }
        assert_eq!(seen.len(), 800);
    }
}
