//! `request.*` tag resolution.
//!
//! Resolves tags against the inbound request: whole body, dotted body
//! properties (JSON or query-string), query/cookie/path parameters, and the
//! embedded-regex forms `request.url.<regex>` / `request.body.<regex>` whose
//! `value` group is substituted.

use super::{tag_inner, Filler};
use crate::definition::{InboundRequest, MockDefinition, RouteParams};
use crate::json;
use crate::regex_util::{self, get_string_part};
use regex::{Captures, Regex};
use std::sync::LazyLock;

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*request\.(.+?)\s*\}\}").unwrap());

/// Filler bound to the current request and its route parameters.
pub struct RequestFiller<'a> {
    request: &'a InboundRequest,
    params: &'a RouteParams,
}

impl<'a> RequestFiller<'a> {
    pub fn new(request: &'a InboundRequest, params: &'a RouteParams) -> Self {
        Self { request, params }
    }

    fn replace_string(&self, tag: &str) -> Option<String> {
        if tag == "request.body" {
            return Some(self.request.body.clone());
        }
        if let Some(path) = tag.strip_prefix("request.body.") {
            return json::get_property_value(&self.request.body, path).ok();
        }
        if let Some(name) = tag.strip_prefix("request.query.") {
            return self.request.query.get(name)?.first().cloned();
        }
        if let Some(name) = tag.strip_prefix("request.path.") {
            return self.params.get(name).cloned();
        }
        if let Some(name) = tag.strip_prefix("request.cookie.") {
            return self.request.cookies.get(name).cloned();
        }
        None
    }

    fn regex_parts(&self, inner: &str) -> Option<(String, String)> {
        if let Some(pattern) = inner.strip_prefix("request.url.") {
            return Some((self.request.path.clone(), pattern.to_string()));
        }
        if let Some(pattern) = inner.strip_prefix("request.body.") {
            return Some((self.request.body.clone(), pattern.to_string()));
        }
        None
    }

    fn replace_regex(&self, tag: &str) -> Option<String> {
        let (input, pattern) = self.regex_parts(tag)?;
        get_string_part(&input, &pattern, "value")
    }
}

impl Filler for RequestFiller<'_> {
    fn fill(&self, _mock: &MockDefinition, input: &str, multiple_match: bool) -> String {
        if !multiple_match {
            return TAG_RE
                .replace_all(input, |caps: &Captures| {
                    let raw = &caps[0];
                    let tag = tag_inner(raw);
                    self.replace_string(tag)
                        .or_else(|| self.replace_regex(tag))
                        .unwrap_or_else(|| raw.to_string())
                })
                .into_owned();
        }

        // Collection mode: resolve scalars first, then expand the remaining
        // tags against every match of their embedded pattern.
        let scalar = TAG_RE
            .replace_all(input, |caps: &Captures| {
                let raw = &caps[0];
                self.replace_string(tag_inner(raw))
                    .unwrap_or_else(|| raw.to_string())
            })
            .into_owned();

        match regex_util::get_collection_items(&scalar, |inner| self.regex_parts(inner)) {
            // a leading comma marks a single entity wrapped as a collection
            Some(results) if results.len() == 1 => format!(",{}", results[0]),
            Some(results) => results.join(","),
            None => scalar,
        }
    }
}
