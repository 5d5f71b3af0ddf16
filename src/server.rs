//! HTTP dispatcher.
//!
//! Owns the transport boundary: translates axum requests into
//! [`InboundRequest`], routes them, drives template resolution and persist
//! actions on a per-request clone of the matched mock, applies control
//! behaviors, and writes the resolved response back to the wire. The
//! resolution core itself stays transport-agnostic.

use crate::config::ServerConfig;
use crate::definition::{InboundRequest, MockDefinition, ResponseTemplate};
use crate::matcher::parse_query_string;
use crate::notify::Notifier;
use crate::persist::EntityActions;
use crate::proxy;
use crate::router::Router;
use crate::vars::VarsProcessor;
use axum::body::Body;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::time::Duration;
use tracing::{debug, info, warn};

const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// The mock HTTP server request handler.
pub struct Dispatcher {
    mocks: Vec<MockDefinition>,
    router: Router,
    processor: VarsProcessor,
    actions: EntityActions,
    notifier: Arc<dyn Notifier>,
    default_response: Option<ResponseTemplate>,
}

impl Dispatcher {
    /// Build a dispatcher over a validated configuration.
    pub fn new(
        config: ServerConfig,
        processor: VarsProcessor,
        actions: EntityActions,
        notifier: Arc<dyn Notifier>,
    ) -> anyhow::Result<Self> {
        let router = Router::new(&config.mocks)?;
        Ok(Self {
            mocks: config.mocks,
            router,
            processor,
            actions,
            notifier,
            default_response: config.default_response,
        })
    }

    /// Serve until ctrl-c.
    pub async fn serve(self: Arc<Self>, addr: SocketAddr) -> anyhow::Result<()> {
        let app = axum::Router::new().fallback(handle).with_state(self);
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!(%addr, "mock server listening");
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }

    async fn dispatch(&self, req: axum::extract::Request) -> Response {
        let request = match translate_request(req).await {
            Ok(request) => request,
            Err(response) => return response,
        };

        if request.path == "/favicon.ico" {
            return StatusCode::OK.into_response();
        }

        info!(method = %request.method, path = %request.path, "new request");

        let Some(matched) = self.router.route(&self.mocks, &request) else {
            warn!(method = %request.method, path = %request.path, "no matching mock found");
            return self.default_response();
        };

        let mut mock = matched.mock.clone();
        let params = matched.params;

        if let Some(base_url) = mock.control.proxy_base_url.clone() {
            return proxy::forward(&base_url, &request).await;
        }

        self.processor.eval(&request, &params, &mut mock);
        self.actions.apply_actions(&mut mock);

        if !mock.notify.is_empty() {
            let notifier = Arc::clone(&self.notifier);
            let spec = mock.notify.clone();
            tokio::spawn(async move {
                notifier.notify(&spec).await;
            });
        }

        if mock.control.randomized_status {
            mock.response.status = randomized_status(mock.response.status);
        }

        if let Some(delay) = &mock.control.delay {
            let delay_ms = delay.calculate();
            if delay_ms > 0 {
                debug!(mock = %mock.name, delay_ms, "applying delay");
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }

        write_response(&mock.response)
    }

    fn default_response(&self) -> Response {
        match &self.default_response {
            Some(template) => write_response(template),
            None => {
                let mut headers = HashMap::new();
                headers.insert("Content-Type".to_string(), "application/json".to_string());
                write_response(&ResponseTemplate {
                    status: 404,
                    headers,
                    body: r#"{"error": "not_found", "message": "no matching mock found"}"#
                        .to_string(),
                })
            }
        }
    }
}

async fn handle(State(dispatcher): State<Arc<Dispatcher>>, req: axum::extract::Request) -> Response {
    dispatcher.dispatch(req).await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to install ctrl-c handler");
    }
}

/// Translate a transport request into the definition model.
async fn translate_request(req: axum::extract::Request) -> Result<InboundRequest, Response> {
    let (parts, body) = req.into_parts();

    let method = parts.method.as_str().to_uppercase();
    let path = parts.uri.path().to_string();
    let query = parse_query_string(parts.uri.query().unwrap_or(""));

    let mut headers: HashMap<String, Vec<String>> = HashMap::new();
    for (name, value) in &parts.headers {
        if let Ok(text) = value.to_str() {
            headers
                .entry(name.as_str().to_string())
                .or_default()
                .push(text.to_string());
        }
    }

    let cookies = headers
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("cookie"))
        .and_then(|(_, values)| values.first())
        .map(|header| parse_cookies(header))
        .unwrap_or_default();

    let bytes = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(error = %e, "failed to read request body");
            return Err(StatusCode::PAYLOAD_TOO_LARGE.into_response());
        }
    };
    let body = String::from_utf8_lossy(&bytes).into_owned();

    Ok(InboundRequest {
        method,
        path,
        query,
        headers,
        cookies,
        body,
    })
}

fn parse_cookies(header: &str) -> HashMap<String, String> {
    let mut cookies = HashMap::new();
    for pair in header.split(';') {
        if let Some((name, value)) = pair.split_once('=') {
            cookies.insert(name.trim().to_string(), value.trim().to_string());
        }
    }
    cookies
}

/// Translate a resolved response template to the wire.
fn write_response(response: &ResponseTemplate) -> Response {
    let status =
        StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut builder = Response::builder().status(status);
    for (name, value) in &response.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
        .body(Body::from(response.body.clone()))
        .unwrap_or_else(|e| {
            warn!(error = %e, "failed to build response");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        })
}

fn randomized_status(current: u16) -> u16 {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    if rng.gen_bool(0.5) {
        rng.gen_range(500..504)
    } else {
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakedata::FakeProvider;
    use crate::notify::HttpNotifier;
    use crate::persist::{EngineRegistry, MemoryEngine, PersistEngine};

    fn dispatcher(yaml: &str) -> (Arc<EngineRegistry>, Dispatcher) {
        let config: ServerConfig = serde_yaml::from_str(yaml).unwrap();
        config.validate().unwrap();

        let engines = Arc::new(EngineRegistry::new(Arc::new(MemoryEngine::new("memory"))));
        let processor = VarsProcessor::new(
            Arc::new(FakeProvider::standard()),
            Arc::clone(&engines),
        );
        let actions = EntityActions::new(Arc::clone(&engines));
        let dispatcher =
            Dispatcher::new(config, processor, actions, Arc::new(HttpNotifier::new())).unwrap();
        (engines, dispatcher)
    }

    fn get(path: &str) -> axum::extract::Request {
        http::Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap()
    }

    fn post(path: &str, body: &str) -> axum::extract::Request {
        http::Request::builder()
            .method("POST")
            .uri(path)
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), MAX_BODY_BYTES)
            .await
            .unwrap();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    const CONFIG: &str = r#"
mocks:
  - name: hello
    request:
      method: GET
      path: /hello
    response:
      status: 200
      body: "Hello, World!"

  - name: user-by-id
    request:
      method: GET
      path: /users/:id
    response:
      status: 200
      headers:
        Content-Type: application/json
      body: '{"id": "{{ request.path.id }}"}'

  - name: create-user
    request:
      method: POST
      path: /users
    response:
      status: 201
      body: "{{ request.body }}"
    persist:
      entity: "users/{{ request.body.name }}.json"
      actions:
        write: "{{ request.body }}"
"#;

    #[tokio::test]
    async fn test_static_response() {
        let (_engines, dispatcher) = dispatcher(CONFIG);
        let response = dispatcher.dispatch(get("/hello")).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "Hello, World!");
    }

    #[tokio::test]
    async fn test_templated_response() {
        let (_engines, dispatcher) = dispatcher(CONFIG);
        let response = dispatcher.dispatch(get("/users/42")).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, r#"{"id": "42"}"#);
    }

    #[tokio::test]
    async fn test_unmatched_request_gets_default_404() {
        let (_engines, dispatcher) = dispatcher(CONFIG);
        let response = dispatcher.dispatch(get("/nope")).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(body_text(response).await.contains("not_found"));
    }

    #[tokio::test]
    async fn test_persist_action_runs_after_resolution() {
        let (engines, dispatcher) = dispatcher(CONFIG);
        let response = dispatcher
            .dispatch(post("/users", r#"{"name": "jane"}"#))
            .await;

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(
            engines.get("").read("users/jane.json").unwrap(),
            r#"{"name": "jane"}"#
        );
    }

    #[tokio::test]
    async fn test_configured_default_response() {
        let yaml = r#"
default_response:
  status: 501
  body: "nothing here"
"#;
        let (_engines, dispatcher) = dispatcher(yaml);
        let response = dispatcher.dispatch(get("/anything")).await;

        assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
        assert_eq!(body_text(response).await, "nothing here");
    }
}
