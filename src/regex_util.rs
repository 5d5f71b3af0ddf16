//! Regex primitives shared by every filler.
//!
//! User-authored patterns arrive inside tags at request time; they are
//! compiled per use and fail soft (an uncompilable or unmatched pattern
//! simply reports nothing, leaving the tag for the fail-open policy).

use regex::Regex;
use std::sync::LazyLock;

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*(.+?)\s*\}\}").unwrap());

/// Match `pattern` once against `input` and return the value of the named
/// capture group, if the pattern compiles, matches, and the group
/// participated.
pub fn get_string_part(input: &str, pattern: &str, group: &str) -> Option<String> {
    let re = Regex::new(pattern).ok()?;
    get_group(&re, input, group)
}

/// [`get_string_part`] over an already-compiled pattern.
pub fn get_group(re: &Regex, input: &str, group: &str) -> Option<String> {
    let captures = re.captures(input)?;
    captures.name(group).map(|m| m.as_str().to_string())
}

/// Scan every `{{ ... }}` tag in `input`. For each tag, `extract` maps the
/// tag's inner text to a (source text, pattern) pair; every non-overlapping
/// match of the pattern inside the source contributes its `value` group to
/// the result, in order. Returns `None` when no tag yields anything.
pub fn get_collection_items<F>(input: &str, extract: F) -> Option<Vec<String>>
where
    F: Fn(&str) -> Option<(String, String)>,
{
    let mut results = Vec::new();

    for captures in TAG_RE.captures_iter(input) {
        let inner = &captures[1];
        let Some((source, pattern)) = extract(inner) else {
            continue;
        };
        let Ok(re) = Regex::new(&pattern) else {
            continue;
        };
        for found in re.captures_iter(&source) {
            if let Some(value) = found.name("value") {
                results.push(value.as_str().to_string());
            }
        }
    }

    if results.is_empty() {
        None
    } else {
        Some(results)
    }
}
