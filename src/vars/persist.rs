//! `persist.*` tag resolution.
//!
//! Exposes the mock's persist spec (entity/collection names, entity id) and
//! the content stored under them. A failed content read does more than miss
//! the tag: it marks the whole response as entity-missing, which the
//! orchestrator turns into a 404 with an empty body.

use super::{tag_inner, Filler};
use crate::definition::MockDefinition;
use crate::json;
use crate::persist::{EngineRegistry, PersistEngine};
use crate::regex_util::{self, get_string_part};
use regex::{Captures, Regex};
use std::cell::Cell;
use std::sync::LazyLock;

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*persist\.(.+?)\s*\}\}").unwrap());

// Guards the dotted-path form so embedded regexes are not mistaken for paths
static PROP_PATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\w+\.)*\w+$").unwrap());

const ENTITY_NAME_PREFIX: &str = "persist.entity.name";

/// Filler bound to the engine registry, instantiated per (mock, request).
pub struct PersistFiller<'a> {
    engines: &'a EngineRegistry,
    entity_missing: Cell<bool>,
}

impl<'a> PersistFiller<'a> {
    pub fn new(engines: &'a EngineRegistry) -> Self {
        Self {
            engines,
            entity_missing: Cell::new(false),
        }
    }

    /// Whether any content read failed during filling.
    pub fn entity_missing(&self) -> bool {
        self.entity_missing.get()
    }

    fn replace_string(&self, mock: &MockDefinition, tag: &str) -> Option<String> {
        if tag == "persist.entity.name" {
            return Some(mock.persist.entity.clone());
        }
        if tag == "persist.entity.id" {
            return Some(mock.persist.entity_id.clone());
        }
        if tag == "persist.collection.name" {
            return Some(mock.persist.collection.clone());
        }
        if let Some(rest) = tag.strip_prefix("persist.entity.content") {
            let engine = self.engines.get(&mock.persist.engine);
            let content = match engine.read(&mock.persist.entity) {
                Ok(content) => content,
                Err(_) => {
                    self.entity_missing.set(true);
                    String::new()
                }
            };
            if let Some(path) = rest.strip_prefix('.') {
                if !PROP_PATH_RE.is_match(path) {
                    return None;
                }
                return json::get_property_value(&content, path).ok();
            }
            return Some(content);
        }
        if tag == "persist.collection.content" {
            let engine = self.engines.get(&mock.persist.engine);
            return match engine.read_collection(&mock.persist.collection) {
                Ok(content) => Some(content),
                Err(_) => {
                    self.entity_missing.set(true);
                    Some(String::new())
                }
            };
        }
        None
    }

    // `persist.entity.name.<regex>`: apply the embedded pattern to the
    // entity name and substitute its `value` group
    fn regex_parts(&self, mock: &MockDefinition, inner: &str) -> Option<(String, String)> {
        let rest = inner.strip_prefix(ENTITY_NAME_PREFIX)?;
        let pattern = rest.get(1..)?;
        if pattern.is_empty() {
            return None;
        }
        Some((mock.persist.entity.clone(), pattern.to_string()))
    }

    fn replace_regex(&self, mock: &MockDefinition, tag: &str) -> Option<String> {
        let (input, pattern) = self.regex_parts(mock, tag)?;
        get_string_part(&input, &pattern, "value")
    }
}

impl Filler for PersistFiller<'_> {
    fn fill(&self, mock: &MockDefinition, input: &str, multiple_match: bool) -> String {
        if !multiple_match {
            return TAG_RE
                .replace_all(input, |caps: &Captures| {
                    let raw = &caps[0];
                    let tag = tag_inner(raw);
                    self.replace_string(mock, tag)
                        .or_else(|| self.replace_regex(mock, tag))
                        .unwrap_or_else(|| raw.to_string())
                })
                .into_owned();
        }

        let scalar = TAG_RE
            .replace_all(input, |caps: &Captures| {
                let raw = &caps[0];
                self.replace_string(mock, tag_inner(raw))
                    .unwrap_or_else(|| raw.to_string())
            })
            .into_owned();

        match regex_util::get_collection_items(&scalar, |inner| self.regex_parts(mock, inner)) {
            // a leading comma marks a single entity wrapped as a collection
            Some(results) if results.len() == 1 => format!(",{}", results[0]),
            Some(results) => results.join(","),
            None => scalar,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::MemoryEngine;
    use crate::vars::tests::make_mock;
    use std::sync::Arc;

    fn registry() -> EngineRegistry {
        EngineRegistry::new(Arc::new(MemoryEngine::new("memory")))
    }

    #[test]
    fn test_spec_fields() {
        let engines = registry();
        let filler = PersistFiller::new(&engines);
        let mut mock = make_mock();
        mock.persist.entity = "users/1.json".to_string();
        mock.persist.entity_id = "1".to_string();
        mock.persist.collection = "users".to_string();

        assert_eq!(
            filler.fill(&mock, "{{ persist.entity.name }}", false),
            "users/1.json"
        );
        assert_eq!(filler.fill(&mock, "{{ persist.entity.id }}", false), "1");
        assert_eq!(
            filler.fill(&mock, "{{ persist.collection.name }}", false),
            "users"
        );
    }

    #[test]
    fn test_entity_content() {
        let engines = registry();
        engines
            .get("")
            .write("users/1.json", r#"{"name": "jane"}"#)
            .unwrap();

        let filler = PersistFiller::new(&engines);
        let mut mock = make_mock();
        mock.persist.entity = "users/1.json".to_string();

        assert_eq!(
            filler.fill(&mock, "{{ persist.entity.content }}", false),
            r#"{"name": "jane"}"#
        );
        assert!(!filler.entity_missing());
    }

    #[test]
    fn test_entity_content_property() {
        let engines = registry();
        engines
            .get("")
            .write("users/1.json", r#"{"name": "jane", "age": 30}"#)
            .unwrap();

        let filler = PersistFiller::new(&engines);
        let mut mock = make_mock();
        mock.persist.entity = "users/1.json".to_string();

        assert_eq!(
            filler.fill(&mock, "{{ persist.entity.content.name }}", false),
            "jane"
        );
        assert_eq!(
            filler.fill(&mock, "{{ persist.entity.content.age }}", false),
            "30"
        );
    }

    #[test]
    fn test_missing_entity_flags_response() {
        let engines = registry();
        let filler = PersistFiller::new(&engines);
        let mut mock = make_mock();
        mock.persist.entity = "missing.json".to_string();

        let out = filler.fill(&mock, "{{ persist.entity.content }}", false);
        assert_eq!(out, "");
        assert!(filler.entity_missing());
    }

    #[test]
    fn test_collection_content() {
        let engines = registry();
        engines.get("").write("users/1.json", r#"{"id":1}"#).unwrap();
        engines.get("").write("users/2.json", r#"{"id":2}"#).unwrap();

        let filler = PersistFiller::new(&engines);
        let mut mock = make_mock();
        mock.persist.collection = "users".to_string();

        assert_eq!(
            filler.fill(&mock, "{{ persist.collection.content }}", false),
            r#"[{"id":1},{"id":2}]"#
        );
    }

    #[test]
    fn test_missing_collection_flags_response() {
        let engines = registry();
        let filler = PersistFiller::new(&engines);
        let mut mock = make_mock();
        mock.persist.collection = "users".to_string();

        let out = filler.fill(&mock, "{{ persist.collection.content }}", false);
        assert_eq!(out, "");
        assert!(filler.entity_missing());
    }

    #[test]
    fn test_entity_name_regex_extraction() {
        let engines = registry();
        let filler = PersistFiller::new(&engines);
        let mut mock = make_mock();
        mock.persist.entity = "users/42.json".to_string();

        assert_eq!(
            filler.fill(&mock, r"{{ persist.entity.name.users/(?P<value>\d+) }}", false),
            "42"
        );
    }

    #[test]
    fn test_unknown_selector_left_verbatim() {
        let engines = registry();
        let filler = PersistFiller::new(&engines);
        let mock = make_mock();

        assert_eq!(
            filler.fill(&mock, "{{ persist.other }}", false),
            "{{ persist.other }}"
        );
    }
}
