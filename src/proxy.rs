//! Proxy forwarding.
//!
//! A mock with a `proxy_base_url` short-circuits resolution: the inbound
//! request is replayed against the base URL and the upstream answer is
//! passed through verbatim.

use crate::definition::InboundRequest;
use axum::body::Body;
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use tracing::{debug, warn};

/// Forward the request and translate the upstream answer back.
pub async fn forward(base_url: &str, request: &InboundRequest) -> Response {
    let url = format!("{}{}", base_url.trim_end_matches('/'), request.path);
    debug!(url = %url, method = %request.method, "proxying request");

    let method = reqwest::Method::from_bytes(request.method.as_bytes())
        .unwrap_or(reqwest::Method::GET);
    let client = reqwest::Client::new();
    let mut outbound = client.request(method, &url).body(request.body.clone());

    for (name, values) in &request.headers {
        if name.eq_ignore_ascii_case("host") {
            continue;
        }
        for value in values {
            outbound = outbound.header(name.as_str(), value.as_str());
        }
    }

    let query: Vec<(String, String)> = request
        .query
        .iter()
        .flat_map(|(key, values)| values.iter().map(move |v| (key.clone(), v.clone())))
        .collect();
    if !query.is_empty() {
        outbound = outbound.query(&query);
    }

    let upstream = match outbound.send().await {
        Ok(upstream) => upstream,
        Err(e) => {
            warn!(url = %url, error = %e, "proxy request failed");
            return StatusCode::BAD_GATEWAY.into_response();
        }
    };

    let status =
        StatusCode::from_u16(upstream.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    let mut builder = Response::builder().status(status);
    for (name, value) in upstream.headers() {
        if let Ok(text) = value.to_str() {
            builder = builder.header(name.as_str(), text);
        }
    }

    let body = match upstream.bytes().await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(url = %url, error = %e, "error reading upstream body");
            return StatusCode::BAD_GATEWAY.into_response();
        }
    };

    builder
        .body(Body::from(body))
        .unwrap_or_else(|_| StatusCode::BAD_GATEWAY.into_response())
}
