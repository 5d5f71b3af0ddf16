//! Persist-action executor.
//!
//! Runs a mock's declared actions in fixed order: write, append, delete.
//! A write failure aborts the whole call; later actions otherwise run even
//! when an earlier one logged a failure of its own. Appends never corrupt
//! stored JSON: JSON merges with JSON, a non-JSON value against a JSON
//! document is skipped with a log line, anything else concatenates.

use super::{EngineRegistry, PersistEngine};
use crate::definition::MockDefinition;
use crate::json;
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

/// Applies the persist actions declared by a matched mock.
pub struct EntityActions {
    engines: Arc<EngineRegistry>,
}

impl EntityActions {
    /// Create an executor over the given engine registry.
    pub fn new(engines: Arc<EngineRegistry>) -> Self {
        Self { engines }
    }

    /// Resolve the mock's engine, back-filling the resolved name onto the
    /// per-request mock when it was left empty.
    fn engine_for(&self, mock: &mut MockDefinition) -> Arc<dyn PersistEngine> {
        let engine = self.engines.get(&mock.persist.engine);
        if mock.persist.engine.is_empty() {
            mock.persist.engine = engine.name().to_string();
        }
        engine
    }

    /// Execute the mock's actions against its engine.
    pub fn apply_actions(&self, mock: &mut MockDefinition) {
        if mock.persist.actions.is_empty() {
            return;
        }

        let engine = self.engine_for(mock);
        let entity = mock.persist.entity.clone();

        if let Some(content) = mock.persist.actions.get("write") {
            if let Err(e) = engine.write(&entity, content) {
                warn!(entity = %entity, error = %e, "error writing entity");
                return;
            }
        }

        if let Some(value) = mock.persist.actions.get("append") {
            let existing = if !mock.persist.collection.is_empty() {
                engine.read_collection(&mock.persist.collection)
            } else {
                engine.read(&entity)
            };
            let existing = match existing {
                Ok(content) => content,
                Err(e) => {
                    warn!(entity = %entity, error = %e, "error reading entity for append");
                    return;
                }
            };

            let combined = match (parse_document(&existing), parse_document(value)) {
                (Some(base), Some(patch)) => json::merge(&base, &patch).to_string(),
                (Some(_), None) => {
                    warn!(content = %value, "there is no way to append this content");
                    existing
                }
                _ => format!("{existing}{value}"),
            };

            if let Err(e) = engine.write(&entity, &combined) {
                warn!(entity = %entity, error = %e, "error appending to entity");
            }
        }

        if mock.persist.actions.contains_key("delete") {
            let result = if !mock.persist.collection.is_empty() {
                engine.delete_collection(&mock.persist.collection)
            } else {
                engine.delete(&entity)
            };
            if let Err(e) = result {
                warn!(entity = %entity, error = %e, "error deleting entity");
            }
        }
    }
}

fn parse_document(input: &str) -> Option<Value> {
    match serde_json::from_str::<Value>(input) {
        Ok(value @ (Value::Object(_) | Value::Array(_))) => Some(value),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{RequestPattern, ResponseTemplate};
    use crate::persist::MemoryEngine;
    use std::collections::HashMap;

    fn setup() -> (Arc<EngineRegistry>, EntityActions) {
        let registry = Arc::new(EngineRegistry::new(Arc::new(MemoryEngine::new("memory"))));
        let actions = EntityActions::new(Arc::clone(&registry));
        (registry, actions)
    }

    fn make_mock(entity: &str, actions: &[(&str, &str)]) -> MockDefinition {
        MockDefinition {
            name: "test".to_string(),
            request: RequestPattern {
                method: String::new(),
                path: "/".to_string(),
                query: HashMap::new(),
                headers: HashMap::new(),
                body: None,
            },
            response: ResponseTemplate {
                status: 200,
                headers: HashMap::new(),
                body: String::new(),
            },
            persist: crate::definition::PersistSpec {
                entity: entity.to_string(),
                actions: actions
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                ..Default::default()
            },
            control: Default::default(),
            notify: Default::default(),
        }
    }

    #[test]
    fn test_write_action() {
        let (registry, actions) = setup();
        let mut mock = make_mock("users/1.json", &[("write", r#"{"id": 1}"#)]);

        actions.apply_actions(&mut mock);
        assert_eq!(registry.get("").read("users/1.json").unwrap(), r#"{"id": 1}"#);
    }

    #[test]
    fn test_engine_name_back_fill() {
        let (_registry, actions) = setup();
        let mut mock = make_mock("a.json", &[("write", "{}")]);
        assert!(mock.persist.engine.is_empty());

        actions.apply_actions(&mut mock);
        assert_eq!(mock.persist.engine, "memory");
    }

    #[test]
    fn test_append_merges_json() {
        let (registry, actions) = setup();
        registry
            .get("")
            .write("users/1.json", r#"{"a": 1, "b": 2}"#)
            .unwrap();

        let mut mock = make_mock("users/1.json", &[("append", r#"{"a": 3, "c": 4}"#)]);
        actions.apply_actions(&mut mock);

        let stored: serde_json::Value =
            serde_json::from_str(&registry.get("").read("users/1.json").unwrap()).unwrap();
        assert_eq!(stored, serde_json::json!({"a": 3, "b": 2, "c": 4}));
    }

    #[test]
    fn test_append_skips_non_json_value_on_json_document() {
        let (registry, actions) = setup();
        registry.get("").write("users/1.json", r#"{"a": 1}"#).unwrap();

        let mut mock = make_mock("users/1.json", &[("append", "not json")]);
        actions.apply_actions(&mut mock);

        assert_eq!(registry.get("").read("users/1.json").unwrap(), r#"{"a": 1}"#);
    }

    #[test]
    fn test_append_concatenates_plain_content() {
        let (registry, actions) = setup();
        registry.get("").write("log.txt", "line one\n").unwrap();

        let mut mock = make_mock("log.txt", &[("append", "line two\n")]);
        actions.apply_actions(&mut mock);

        assert_eq!(
            registry.get("").read("log.txt").unwrap(),
            "line one\nline two\n"
        );
    }

    #[test]
    fn test_append_to_missing_entity_is_skipped() {
        let (registry, actions) = setup();
        let mut mock = make_mock("missing.json", &[("append", r#"{"a": 1}"#)]);

        actions.apply_actions(&mut mock);
        assert!(registry.get("").read("missing.json").is_err());
    }

    #[test]
    fn test_delete_action() {
        let (registry, actions) = setup();
        registry.get("").write("users/1.json", "{}").unwrap();

        let mut mock = make_mock("users/1.json", &[("delete", "")]);
        actions.apply_actions(&mut mock);

        assert!(registry.get("").read("users/1.json").is_err());
    }

    #[test]
    fn test_delete_collection_when_declared() {
        let (registry, actions) = setup();
        registry.get("").write("users/1.json", "{}").unwrap();
        registry.get("").write("users/2.json", "{}").unwrap();

        let mut mock = make_mock("ignored.json", &[("delete", "")]);
        mock.persist.collection = "users".to_string();
        actions.apply_actions(&mut mock);

        assert!(registry.get("").read_collection("users").is_err());
    }
}
