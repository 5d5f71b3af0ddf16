//! Request matching logic.
//!
//! Matches inbound requests against mock request patterns. Path patterns are
//! compiled once into anchored regexes: `:name` segments bind a single
//! non-empty segment, `*` swallows the remainder. The same template
//! comparison is reused for body templates, so a pattern can also be matched
//! against JSON-shaped candidates.

use crate::definition::{BodyPattern, InboundRequest, RequestPattern, RouteParams};
use regex::Regex;
use std::collections::HashMap;

/// Compile a `:name`/`*` template into an anchored regex with named groups.
pub fn compile_template(pattern: &str) -> Result<Regex, regex::Error> {
    let mut expr = String::with_capacity(pattern.len() + 8);
    expr.push('^');

    let mut literal = String::new();
    let mut chars = pattern.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            ':' if chars
                .peek()
                .is_some_and(|c| c.is_ascii_alphabetic() || *c == '_') =>
            {
                expr.push_str(&regex::escape(&literal));
                literal.clear();

                let mut name = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        name.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                expr.push_str("(?P<");
                expr.push_str(&name);
                expr.push_str(">[^/]+)");
            }
            '*' => {
                expr.push_str(&regex::escape(&literal));
                literal.clear();
                expr.push_str(".*");
            }
            _ => literal.push(ch),
        }
    }
    expr.push_str(&regex::escape(&literal));
    expr.push('$');

    Regex::new(&expr)
}

/// Match a compiled template against a candidate string, binding parameters.
pub fn match_template(template: &Regex, candidate: &str) -> Option<RouteParams> {
    let captures = template.captures(candidate)?;
    let mut params = RouteParams::new();
    for name in template.capture_names().flatten() {
        if let Some(m) = captures.name(name) {
            params.insert(name.to_string(), m.as_str().to_string());
        }
    }
    Some(params)
}

/// A request pattern with its templates pre-compiled.
pub struct CompiledPattern {
    path: Regex,
    body_template: Option<Regex>,
}

impl CompiledPattern {
    /// Compile the templates of a request pattern.
    pub fn compile(pattern: &RequestPattern) -> Result<Self, regex::Error> {
        let path = compile_template(&pattern.path)?;
        let body_template = match &pattern.body {
            Some(BodyPattern::Template { template }) => Some(compile_template(template)?),
            _ => None,
        };
        Ok(Self {
            path,
            body_template,
        })
    }

    /// Check the full pattern against a request. Returns the bound route
    /// parameters when every declared predicate holds.
    pub fn matches(&self, pattern: &RequestPattern, req: &InboundRequest) -> Option<RouteParams> {
        // Method
        if !pattern.method.is_empty() && !pattern.method.eq_ignore_ascii_case(&req.method) {
            return None;
        }

        // Path
        let mut params = match_template(&self.path, &req.path)?;

        // Query parameters
        for (name, value) in &pattern.query {
            let found = req
                .query
                .get(name)
                .and_then(|values| values.first())
                .is_some_and(|v| v == value);
            if !found {
                return None;
            }
        }

        // Headers (case-insensitive names)
        for (name, value) in &pattern.headers {
            let found = req
                .headers
                .iter()
                .filter(|(k, _)| k.eq_ignore_ascii_case(name))
                .any(|(_, values)| values.iter().any(|v| v == value));
            if !found {
                return None;
            }
        }

        // Body
        if let Some(body) = &pattern.body {
            match body {
                BodyPattern::Exact { value } => {
                    if &req.body != value {
                        return None;
                    }
                }
                BodyPattern::Template { .. } => {
                    let template = self.body_template.as_ref()?;
                    let bound = match_template(template, &req.body)?;
                    params.extend(bound);
                }
                BodyPattern::JsonPath { expressions } => {
                    let json = serde_json::from_str::<serde_json::Value>(&req.body).ok()?;
                    if !matches_json_paths(&json, expressions) {
                        return None;
                    }
                }
            }
        }

        Some(params)
    }
}

fn matches_json_paths(
    json: &serde_json::Value,
    expressions: &HashMap<String, serde_json::Value>,
) -> bool {
    use jsonpath_rust::JsonPath;

    for (path_expr, expected) in expressions {
        let path = match JsonPath::try_from(path_expr.as_str()) {
            Ok(p) => p,
            Err(_) => return false,
        };

        let results = path.find(json);

        // A null expected value only asserts that the path resolves
        let matches = if expected.is_null() {
            !results.is_null()
        } else {
            results == *expected
        };
        if !matches {
            return false;
        }
    }
    true
}

/// Parse a query string into key-value pairs, keeping value order.
pub fn parse_query_string(query: &str) -> HashMap<String, Vec<String>> {
    let mut params: HashMap<String, Vec<String>> = HashMap::new();

    for part in query.split('&') {
        if part.is_empty() {
            continue;
        }
        let (key, value) = match part.split_once('=') {
            Some((key, value)) => (urlencoding_decode(key), urlencoding_decode(value)),
            None => (urlencoding_decode(part), String::new()),
        };
        params.entry(key).or_default().push(value);
    }

    params
}

/// Simple URL decoding.
pub(crate) fn urlencoding_decode(s: &str) -> String {
    let mut result = String::new();
    let mut chars = s.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '%' {
            let hex: String = chars.by_ref().take(2).collect();
            if hex.len() == 2 {
                if let Ok(byte) = u8::from_str_radix(&hex, 16) {
                    result.push(byte as char);
                    continue;
                }
            }
            result.push('%');
            result.push_str(&hex);
        } else if ch == '+' {
            result.push(' ');
        } else {
            result.push(ch);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::RequestPattern;

    fn make_pattern(path: &str) -> RequestPattern {
        RequestPattern {
            method: String::new(),
            path: path.to_string(),
            query: HashMap::new(),
            headers: HashMap::new(),
            body: None,
        }
    }

    fn request(method: &str, path: &str) -> InboundRequest {
        InboundRequest {
            method: method.to_string(),
            path: path.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_literal_path() {
        let pattern = make_pattern("/api/users");
        let compiled = CompiledPattern::compile(&pattern).unwrap();

        assert!(compiled.matches(&pattern, &request("GET", "/api/users")).is_some());
        assert!(compiled.matches(&pattern, &request("GET", "/api/posts")).is_none());
    }

    #[test]
    fn test_parameter_binding() {
        let pattern = make_pattern("/users/:userId");
        let compiled = CompiledPattern::compile(&pattern).unwrap();

        let params = compiled.matches(&pattern, &request("GET", "/users/1")).unwrap();
        assert_eq!(params.get("userId"), Some(&"1".to_string()));

        let params = compiled.matches(&pattern, &request("GET", "/users/42")).unwrap();
        assert_eq!(params.get("userId"), Some(&"42".to_string()));

        // A parameter never matches an empty segment
        assert!(compiled.matches(&pattern, &request("GET", "/users/")).is_none());
    }

    #[test]
    fn test_multiple_parameters() {
        let pattern = make_pattern("/users/:role/:userId");
        let compiled = CompiledPattern::compile(&pattern).unwrap();

        let params = compiled
            .matches(&pattern, &request("GET", "/users/administrators/1"))
            .unwrap();
        assert_eq!(params.get("role"), Some(&"administrators".to_string()));
        assert_eq!(params.get("userId"), Some(&"1".to_string()));
    }

    #[test]
    fn test_trailing_glob() {
        let pattern = make_pattern("/users/*");
        let compiled = CompiledPattern::compile(&pattern).unwrap();

        assert!(compiled.matches(&pattern, &request("GET", "/users/1")).is_some());
        assert!(compiled
            .matches(&pattern, &request("GET", "/users/1/orders/2"))
            .is_some());
        assert!(compiled.matches(&pattern, &request("GET", "/orders/1")).is_none());
    }

    #[test]
    fn test_template_against_json_candidate() {
        // Template comparison also works on non-path content
        let template = compile_template("{ \"test\" : :testValue }").unwrap();
        let params = match_template(&template, "{ \"test\" : 1 }").unwrap();
        assert_eq!(params.get("testValue"), Some(&"1".to_string()));
    }

    #[test]
    fn test_method_matching() {
        let mut pattern = make_pattern("/api/users");
        pattern.method = "GET".to_string();
        let compiled = CompiledPattern::compile(&pattern).unwrap();

        assert!(compiled.matches(&pattern, &request("GET", "/api/users")).is_some());
        assert!(compiled.matches(&pattern, &request("get", "/api/users")).is_some());
        assert!(compiled.matches(&pattern, &request("DELETE", "/api/users")).is_none());
    }

    #[test]
    fn test_query_matching() {
        let mut pattern = make_pattern("/api/users");
        pattern.query.insert("page".to_string(), "1".to_string());
        let compiled = CompiledPattern::compile(&pattern).unwrap();

        let mut req = request("GET", "/api/users");
        req.query.insert("page".to_string(), vec!["1".to_string()]);
        assert!(compiled.matches(&pattern, &req).is_some());

        req.query.insert("page".to_string(), vec!["2".to_string()]);
        assert!(compiled.matches(&pattern, &req).is_none());

        req.query.remove("page");
        assert!(compiled.matches(&pattern, &req).is_none());
    }

    #[test]
    fn test_header_matching() {
        let mut pattern = make_pattern("/api/users");
        pattern
            .headers
            .insert("authorization".to_string(), "Bearer token".to_string());
        let compiled = CompiledPattern::compile(&pattern).unwrap();

        let mut req = request("GET", "/api/users");
        req.headers
            .insert("Authorization".to_string(), vec!["Bearer token".to_string()]);
        assert!(compiled.matches(&pattern, &req).is_some());

        req.headers.clear();
        assert!(compiled.matches(&pattern, &req).is_none());
    }

    #[test]
    fn test_body_template_binds_params() {
        let mut pattern = make_pattern("/login");
        pattern.body = Some(BodyPattern::Template {
            template: "user=:user&pass=:pass".to_string(),
        });
        let compiled = CompiledPattern::compile(&pattern).unwrap();

        let mut req = request("POST", "/login");
        req.body = "user=jane&pass=secret".to_string();
        let params = compiled.matches(&pattern, &req).unwrap();
        assert_eq!(params.get("user"), Some(&"jane".to_string()));
        assert_eq!(params.get("pass"), Some(&"secret".to_string()));
    }

    #[test]
    fn test_body_json_path_matching() {
        let mut pattern = make_pattern("/api/users");
        let mut expressions = HashMap::new();
        expressions.insert("$.name".to_string(), serde_json::json!(["John"]));
        pattern.body = Some(BodyPattern::JsonPath { expressions });
        let compiled = CompiledPattern::compile(&pattern).unwrap();

        let mut req = request("POST", "/api/users");
        req.body = r#"{"name": "John"}"#.to_string();
        assert!(compiled.matches(&pattern, &req).is_some());

        req.body = r#"{"name": "Jane"}"#.to_string();
        assert!(compiled.matches(&pattern, &req).is_none());
    }

    #[test]
    fn test_parse_query_string() {
        let params = parse_query_string("foo=bar&baz=qux&foo=again");
        assert_eq!(
            params.get("foo"),
            Some(&vec!["bar".to_string(), "again".to_string()])
        );
        assert_eq!(params.get("baz"), Some(&vec!["qux".to_string()]));

        let params = parse_query_string("name=John%20Doe");
        assert_eq!(params.get("name"), Some(&vec!["John Doe".to_string()]));
    }
}
