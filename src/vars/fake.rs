//! `fake.*` tag resolution.

use super::{tag_inner, Filler};
use crate::definition::MockDefinition;
use crate::fakedata::DataFaker;
use regex::{Captures, Regex};
use std::sync::LazyLock;

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*fake\.([^{]+?)\s*\}\}").unwrap());

static METHOD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?P<method>\w+)\((?P<parameter>.*?)\)").unwrap());

/// Filler bound to a synthetic-data generator.
pub struct FakeFiller<'a> {
    fake: &'a dyn DataFaker,
}

impl<'a> FakeFiller<'a> {
    pub fn new(fake: &'a dyn DataFaker) -> Self {
        Self { fake }
    }

    fn call_method(&self, selector: &str) -> Option<String> {
        // `Name(3)` dispatches with an integer argument; anything else is
        // looked up as-is (so `Name(x)` misses instead of erroring)
        if let Some(caps) = METHOD_RE.captures(selector) {
            if let Ok(arg) = caps["parameter"].trim().parse::<i64>() {
                return self.fake.call(&caps["method"], Some(arg));
            }
        }
        self.fake.call(selector, None)
    }
}

impl Filler for FakeFiller<'_> {
    fn fill(&self, _mock: &MockDefinition, input: &str, _multiple_match: bool) -> String {
        TAG_RE
            .replace_all(input, |caps: &Captures| {
                let raw = &caps[0];
                let tag = tag_inner(raw);
                tag.strip_prefix("fake.")
                    .and_then(|selector| self.call_method(selector))
                    .unwrap_or_else(|| raw.to_string())
            })
            .into_owned()
    }
}
