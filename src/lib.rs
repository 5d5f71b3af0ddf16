//! apimock
//!
//! A programmable HTTP test-double server. Inbound requests are matched
//! against user-authored mock definitions; the matched response template is
//! resolved through a chain of fillers that substitute `{{ tag }}`
//! placeholders from request data, synthetic data, and a persisted
//! key/entity store.
//!
//! # Features
//!
//! - **Request Matching**: first-match routing by method, path pattern
//!   (`:name` parameters, `*` globs), query, headers, and body
//! - **Templated Responses**: `{{ request.* }}`, `{{ fake.* }}`,
//!   `{{ persist.* }}`, and `{{ storage.* }}` tags in body and headers
//! - **Persisted State**: entities, collections, scalar values, and atomic
//!   sequences behind pluggable engines (in-memory, file-system)
//! - **Persist Actions**: write/append/delete side effects per mock, with
//!   non-destructive JSON deep-merge on append
//! - **Control Behaviors**: latency simulation, randomized 5xx statuses,
//!   proxy forwarding
//! - **Webhook Notifications**: fire-and-forget calls after resolution
//!
//! # Example Configuration
//!
//! ```yaml
//! mocks:
//!   - name: user-by-id
//!     request:
//!       method: GET
//!       path: /users/:id
//!     response:
//!       status: 200
//!       headers:
//!         Content-Type: application/json
//!       body: '{"id": "{{ request.path.id }}", "name": "{{ fake.FullName }}"}'
//! ```

pub mod config;
pub mod definition;
pub mod fakedata;
pub mod json;
pub mod matcher;
pub mod notify;
pub mod persist;
pub mod proxy;
pub mod regex_util;
pub mod router;
pub mod server;
pub mod vars;

pub use config::ServerConfig;
pub use definition::{InboundRequest, MockDefinition};
pub use router::Router;
pub use server::Dispatcher;
pub use vars::VarsProcessor;
