//! Axum middleware adapter.
//!
//! Buffers the request body (bounded), hands a `RequestContext` to the
//! pipeline, and translates the verdict back into HTTP.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::extract::{ConnectInfo, State};
use axum::http::{header, HeaderName, HeaderValue, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Map, Value};

use crate::detect::percent_decode;
use crate::pipeline::{Pipeline, RequestContext};
use crate::risk::RiskAction;

/// Bodies beyond this are rejected outright rather than scanned.
const MAX_BODY_BYTES: usize = 1024 * 1024;

const WARNING_HEADER: HeaderName = HeaderName::from_static("x-security-warning");

/// Evaluate every request through the pipeline before the inner handler.
pub async fn security_middleware(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(pipeline): State<Arc<Pipeline>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let identity = client_identity(&request, addr, pipeline.trusted_proxy_header());
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let query = parse_query(request.uri().query().unwrap_or(""));

    let (parts, body) = request.into_parts();
    let bytes = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(_) => {
            return (StatusCode::PAYLOAD_TOO_LARGE, "payload too large").into_response();
        }
    };
    let body_value = if bytes.is_empty() {
        Value::Null
    } else {
        // Non-JSON bodies are scanned as a single string leaf.
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };

    let mut ctx = RequestContext::new(&identity, &method, &path);
    ctx.query = query;
    ctx.body = body_value;
    ctx.payload_size = bytes.len();

    let verdict = pipeline.evaluate(&ctx);

    match verdict.action {
        RiskAction::Block => {
            let status =
                StatusCode::from_u16(verdict.http_status).unwrap_or(StatusCode::FORBIDDEN);
            let body = json!({
                "error": "request rejected",
                "reasons": verdict.reasons,
            });
            let mut response = (status, Json(body)).into_response();
            if let Some(retry) = verdict.retry_after_secs {
                if let Ok(value) = HeaderValue::from_str(&retry.to_string()) {
                    response.headers_mut().insert(header::RETRY_AFTER, value);
                }
            }
            response
        }
        RiskAction::Warn => {
            let request = Request::from_parts(parts, Body::from(bytes));
            let mut response = next.run(request).await;
            if let Some(warning) = verdict.warning_header.as_deref() {
                if let Ok(value) = HeaderValue::from_str(warning) {
                    response.headers_mut().insert(WARNING_HEADER, value);
                }
            }
            response
        }
        RiskAction::Allow => {
            let request = Request::from_parts(parts, Body::from(bytes));
            next.run(request).await
        }
    }
}

/// Resolve the client identity: first hop of the trusted proxy header when
/// configured, otherwise the peer address.
fn client_identity(
    request: &Request<Body>,
    addr: SocketAddr,
    trusted_header: Option<&str>,
) -> String {
    if let Some(name) = trusted_header {
        if let Some(value) = request
            .headers()
            .get(name)
            .and_then(|value| value.to_str().ok())
        {
            if let Some(first) = value.split(',').next() {
                let first = first.trim();
                if !first.is_empty() {
                    return first.to_string();
                }
            }
        }
    }
    addr.ip().to_string()
}

/// Parse a raw query string into a JSON object. Repeated keys collect into
/// arrays; an empty query becomes `Null`.
fn parse_query(raw: &str) -> Value {
    if raw.is_empty() {
        return Value::Null;
    }
    let mut map = Map::new();
    for pair in raw.split('&') {
        if pair.is_empty() {
            continue;
        }
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let key = percent_decode(&key.replace('+', " "));
        let value = Value::String(percent_decode(&value.replace('+', " ")));
        match map.entry(key) {
            serde_json::map::Entry::Vacant(slot) => {
                slot.insert(value);
            }
            serde_json::map::Entry::Occupied(mut slot) => {
                let existing = slot.get_mut();
                if let Value::Array(items) = existing {
                    items.push(value);
                } else {
                    let first = existing.take();
                    *existing = Value::Array(vec![first, value]);
                }
            }
        }
    }
    Value::Object(map)
}
