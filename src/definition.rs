//! Mock definition data model.
//!
//! A mock definition maps a request pattern to a response template plus
//! optional persistence, control, and notification behavior. Definitions are
//! loaded once and treated as the immutable read model during matching; the
//! dispatcher clones the matched definition before resolution so fillers can
//! mutate the per-request copy.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Route parameters bound by the router for one (pattern, request) pair.
pub type RouteParams = HashMap<String, String>;

/// A single mock definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MockDefinition {
    /// Unique name for this mock
    pub name: String,

    /// Request pattern to match
    pub request: RequestPattern,

    /// Response template to resolve and return
    pub response: ResponseTemplate,

    /// Persisted-state interaction
    #[serde(default)]
    pub persist: PersistSpec,

    /// Delay / randomized status / proxy behavior
    #[serde(default)]
    pub control: ControlSpec,

    /// Outbound notification fired after resolution
    #[serde(default)]
    pub notify: NotifySpec,
}

impl MockDefinition {
    /// Validate the definition.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.name.is_empty() {
            anyhow::bail!("mock name cannot be empty");
        }
        self.request.validate()?;
        self.response.validate()?;
        self.persist.validate()?;
        Ok(())
    }
}

/// Request matching configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RequestPattern {
    /// HTTP method to match (empty = any)
    #[serde(default)]
    pub method: String,

    /// Path pattern: literal segments, `:name` parameters, and `*` globs
    pub path: String,

    /// Query parameters that must be present with the given value
    #[serde(default)]
    pub query: HashMap<String, String>,

    /// Headers that must be present with the given value
    #[serde(default)]
    pub headers: HashMap<String, String>,

    /// Body predicate
    #[serde(default)]
    pub body: Option<BodyPattern>,
}

impl RequestPattern {
    /// Validate the pattern.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.path.is_empty() {
            anyhow::bail!("request path pattern cannot be empty");
        }
        crate::matcher::compile_template(&self.path)
            .map_err(|e| anyhow::anyhow!("invalid path pattern {:?}: {}", self.path, e))?;
        if let Some(body) = &self.body {
            body.validate()?;
        }
        Ok(())
    }
}

/// Body matching configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BodyPattern {
    /// Exact body match
    Exact { value: String },
    /// Template match with `:name` parameter binding
    Template { template: String },
    /// JSON path expressions and expected values
    JsonPath {
        expressions: HashMap<String, serde_json::Value>,
    },
}

impl BodyPattern {
    /// Validate the body pattern.
    pub fn validate(&self) -> anyhow::Result<()> {
        if let BodyPattern::Template { template } = self {
            crate::matcher::compile_template(template)
                .map_err(|e| anyhow::anyhow!("invalid body template {:?}: {}", template, e))?;
        }
        Ok(())
    }
}

/// Response template. Status, header values, and body may carry unresolved
/// `{{ namespace.selector }}` tags.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResponseTemplate {
    /// HTTP status code
    #[serde(default = "default_status")]
    pub status: u16,

    /// Response headers
    #[serde(default)]
    pub headers: HashMap<String, String>,

    /// Response body
    #[serde(default)]
    pub body: String,
}

fn default_status() -> u16 {
    200
}

impl ResponseTemplate {
    /// Validate the response template.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.status < 100 || self.status > 599 {
            anyhow::bail!("invalid status code: {}", self.status);
        }
        Ok(())
    }
}

/// Persisted-state interaction declared by a mock.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PersistSpec {
    /// Engine name; empty resolves to the configured default and is
    /// back-filled on the per-request copy
    #[serde(default)]
    pub engine: String,

    /// Entity name (typically a file-like name such as `users/1.json`)
    #[serde(default)]
    pub entity: String,

    /// Entity id exposed to templates
    #[serde(default)]
    pub entity_id: String,

    /// Collection name; non-empty switches reads/deletes to the collection
    /// and enables collection-mode body resolution
    #[serde(default)]
    pub collection: String,

    /// Actions to apply after resolution: `write`, `append`, `delete`
    /// mapped to their associated content
    #[serde(default)]
    pub actions: HashMap<String, String>,
}

impl PersistSpec {
    /// Validate the persist spec.
    pub fn validate(&self) -> anyhow::Result<()> {
        for action in self.actions.keys() {
            if !matches!(action.as_str(), "write" | "append" | "delete") {
                anyhow::bail!("unknown persist action: {:?}", action);
            }
        }
        Ok(())
    }

    /// Whether the spec declares anything at all.
    pub fn is_empty(&self) -> bool {
        self.engine.is_empty()
            && self.entity.is_empty()
            && self.entity_id.is_empty()
            && self.collection.is_empty()
            && self.actions.is_empty()
    }
}

/// Control behaviors consumed by the dispatcher, outside the resolution core.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ControlSpec {
    /// Latency simulation
    #[serde(default)]
    pub delay: Option<DelayConfig>,

    /// Replace the resolved status with a random 5xx on some requests
    #[serde(default)]
    pub randomized_status: bool,

    /// Forward the request to this base URL instead of resolving the template
    #[serde(default)]
    pub proxy_base_url: Option<String>,
}

/// Delay/latency simulation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DelayConfig {
    /// Fixed delay in milliseconds
    #[serde(default)]
    pub fixed_ms: u64,

    /// Minimum delay for random range (ms)
    #[serde(default)]
    pub min_ms: u64,

    /// Maximum delay for random range (ms)
    #[serde(default)]
    pub max_ms: u64,
}

impl DelayConfig {
    /// Calculate the actual delay to apply.
    pub fn calculate(&self) -> u64 {
        if self.fixed_ms > 0 {
            return self.fixed_ms;
        }
        if self.max_ms > self.min_ms {
            use rand::Rng;
            let mut rng = rand::thread_rng();
            return rng.gen_range(self.min_ms..=self.max_ms);
        }
        self.min_ms
    }
}

/// Outbound notification fired after response resolution.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NotifySpec {
    /// Webhook call
    #[serde(default)]
    pub webhook: Option<WebhookSpec>,
}

impl NotifySpec {
    /// Whether any notification is declared.
    pub fn is_empty(&self) -> bool {
        self.webhook.is_none()
    }
}

/// A webhook notification target. The body may carry tags and is resolved
/// alongside the response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WebhookSpec {
    /// Target URL
    pub url: String,

    /// HTTP method
    #[serde(default = "default_webhook_method")]
    pub method: String,

    /// Request body
    #[serde(default)]
    pub body: String,

    /// Extra request headers
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

fn default_webhook_method() -> String {
    "POST".to_string()
}

/// An inbound request, already translated from the transport layer.
/// Read-only during matching and resolution.
#[derive(Debug, Clone, Default)]
pub struct InboundRequest {
    /// HTTP method, uppercase
    pub method: String,
    /// Request path, without query string
    pub path: String,
    /// Query parameters, each key with its ordered values
    pub query: HashMap<String, Vec<String>>,
    /// Request headers, each key with its ordered values
    pub headers: HashMap<String, Vec<String>>,
    /// Cookies
    pub cookies: HashMap<String, String>,
    /// Raw body
    pub body: String,
}
