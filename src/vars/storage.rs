//! `storage.*` tag resolution.
//!
//! Call-style selectors over the mock's engine: `Sequence(name[, inc])`,
//! `GetValue(key)`, `SetValue(key, value)`. Substitution is iterated up to a
//! fixed number of passes so nested arguments resolve inner-first, e.g.
//! `{{ storage.SetValue({{ request.body.username\=(?P<value>.+?)(?:&|$) }}, {{ storage.Sequence(users, 1) }}) }}`.

use super::{tag_inner, Filler};
use crate::definition::MockDefinition;
use crate::persist::{EngineRegistry, PersistEngine};
use crate::regex_util::get_group;
use regex::{Captures, Regex};
use std::sync::LazyLock;
use tracing::debug;

/// Upper bound on substitution passes; reached only by pathological nesting.
pub(crate) const MAX_STORAGE_PASSES: usize = 3;

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*storage\.([^{]+?)\s*\}\}").unwrap());

// Argument-list grammar: quotes optional, whitespace tolerant
static SEQUENCE_ARGS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"\(\s*(?:'|")?(?P<name>.+?)(?:'|")?\s*,\s*(?P<increase>\d+?)\s*\)|\(\s*(?:'|")?(?P<nameOnly>.+?)(?:'|")?\s*\)"#,
    )
    .unwrap()
});

static SET_VALUE_ARGS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\(\s*(?:'|")?(?P<key>.+?)(?:'|")?\s*,\s*(?:'|")?(?P<value>.+?)(?:'|")?\s*\)"#)
        .unwrap()
});

static GET_VALUE_ARGS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\(\s*(?:'|")?(?P<key>.+?)(?:'|")?\s*\)"#).unwrap());

/// Filler bound to the engine registry.
pub struct StorageFiller<'a> {
    engines: &'a EngineRegistry,
}

impl<'a> StorageFiller<'a> {
    pub fn new(engines: &'a EngineRegistry) -> Self {
        Self { engines }
    }

    fn process(&self, mock: &MockDefinition, input: &str) -> String {
        TAG_RE
            .replace_all(input, |caps: &Captures| {
                let raw = &caps[0];
                let tag = tag_inner(raw);
                let result = if let Some(args) = tag.strip_prefix("storage.Sequence") {
                    self.call_sequence(mock, args)
                } else if let Some(args) = tag.strip_prefix("storage.GetValue") {
                    self.call_get_value(mock, args)
                } else if let Some(args) = tag.strip_prefix("storage.SetValue") {
                    self.call_set_value(mock, args)
                } else {
                    None
                };
                result.unwrap_or_else(|| raw.to_string())
            })
            .into_owned()
    }

    fn call_sequence(&self, mock: &MockDefinition, args: &str) -> Option<String> {
        // single-argument form first; the two-argument alternative otherwise
        let (name, increase) = match get_group(&SEQUENCE_ARGS_RE, args, "nameOnly") {
            Some(name) if !name.is_empty() => (name, 0),
            _ => {
                let name = get_group(&SEQUENCE_ARGS_RE, args, "name")?;
                let increase = match get_group(&SEQUENCE_ARGS_RE, args, "increase") {
                    Some(text) if !text.is_empty() => match text.parse::<i64>() {
                        Ok(value) => value,
                        Err(e) => {
                            debug!(error = %e, "error parsing increase value");
                            return None;
                        }
                    },
                    _ => 0,
                };
                (name, increase)
            }
        };

        let engine = self.engines.get(&mock.persist.engine);
        engine
            .get_sequence(&name, increase)
            .ok()
            .map(|value| value.to_string())
    }

    fn call_get_value(&self, mock: &MockDefinition, args: &str) -> Option<String> {
        let key = get_group(&GET_VALUE_ARGS_RE, args, "key")?;
        let engine = self.engines.get(&mock.persist.engine);
        engine.get_value(&key).ok()
    }

    fn call_set_value(&self, mock: &MockDefinition, args: &str) -> Option<String> {
        let key = get_group(&SET_VALUE_ARGS_RE, args, "key")?;
        let value = get_group(&SET_VALUE_ARGS_RE, args, "value")?;
        let engine = self.engines.get(&mock.persist.engine);
        engine.set_value(&key, &value).ok()?;
        Some(value)
    }
}

impl Filler for StorageFiller<'_> {
    fn fill(&self, mock: &MockDefinition, input: &str, _multiple_match: bool) -> String {
        let mut text = input.to_string();
        let mut passes = 0;
        // iterate until a fixed point so outer tags observe inner results
        while passes < MAX_STORAGE_PASSES && TAG_RE.is_match(&text) {
            let next = self.process(mock, &text);
            if next == text {
                break;
            }
            text = next;
            passes += 1;
        }
        text
    }
}
