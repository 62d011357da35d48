//! HTTP adapter tests: the pipeline as axum middleware.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Request, StatusCode};
use axum::routing::post;
use axum::{middleware, Router};
use gatehouse::config::SecurityConfig;
use gatehouse::pipeline::{security_middleware, Pipeline};
use tower::ServiceExt;

fn quiet_config() -> SecurityConfig {
    let mut config = SecurityConfig::default();
    config.risk.ddos.burst_threshold = 10_000;
    config.risk.ddos.sustained_threshold = 100_000;
    config.risk.ddos.suspicious_threshold = 100_000;
    config.rate_limit.default_limit = 100_000;
    config
}

fn app(pipeline: Arc<Pipeline>) -> Router {
    Router::new()
        .route("/api/login", post(|| async { "ok" }))
        .layer(middleware::from_fn_with_state(pipeline, security_middleware))
}

fn json_post(uri: &str, peer: &str, body: &str) -> Request<Body> {
    let addr: SocketAddr = format!("{peer}:40000").parse().unwrap();
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .extension(ConnectInfo(addr))
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn benign_request_passes_through() {
    let app = app(Arc::new(Pipeline::new(quiet_config())));
    let response = app
        .oneshot(json_post(
            "/api/login",
            "203.0.113.50",
            r#"{"username": "alice", "password": "hunter2"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn injection_attempt_is_rejected_with_400() {
    let app = app(Arc::new(Pipeline::new(quiet_config())));
    let response = app
        .oneshot(json_post(
            "/api/login",
            "203.0.113.51",
            r#"{"username": "admin' OR 1=1"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn repeat_offender_gets_403_with_retry_after() {
    let app = app(Arc::new(Pipeline::new(quiet_config())));
    let body = r#"{"username": "admin' OR 1=1"}"#;
    for _ in 0..5 {
        app.clone()
            .oneshot(json_post("/api/login", "203.0.113.52", body))
            .await
            .unwrap();
    }
    let response = app
        .oneshot(json_post("/api/login", "203.0.113.52", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let retry = response
        .headers()
        .get("retry-after")
        .expect("retry-after header")
        .to_str()
        .unwrap();
    assert!(retry.parse::<u64>().unwrap() <= 3600);
}

#[tokio::test]
async fn query_string_is_scanned() {
    let app = app(Arc::new(Pipeline::new(quiet_config())));
    let response = app
        .oneshot(json_post(
            "/api/login?redirect=javascript%3Aalert(1)",
            "203.0.113.53",
            "",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn trusted_proxy_header_separates_clients() {
    let mut config = quiet_config();
    config.pipeline.trusted_proxy_header = Some("x-forwarded-for".to_string());
    let app = app(Arc::new(Pipeline::new(config)));
    let body = r#"{"username": "admin' OR 1=1"}"#;

    // One forwarded client earns a blacklist...
    for _ in 0..5 {
        let mut request = json_post("/api/login", "10.0.0.1", body);
        request
            .headers_mut()
            .insert("x-forwarded-for", "203.0.113.60".parse().unwrap());
        app.clone().oneshot(request).await.unwrap();
    }

    // ...while another behind the same proxy is clean.
    let mut request = json_post("/api/login", "10.0.0.1", r#"{"username": "bob"}"#);
    request
        .headers_mut()
        .insert("x-forwarded-for", "203.0.113.61".parse().unwrap());
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn warned_requests_carry_the_advisory_header() {
    let mut config = quiet_config();
    config.risk.ddos.suspicious_threshold = 2;
    let app = app(Arc::new(Pipeline::new(config)));

    for _ in 0..2 {
        app.clone()
            .oneshot(json_post("/api/login", "203.0.113.54", "{}"))
            .await
            .unwrap();
    }
    let response = app
        .oneshot(json_post("/api/login", "203.0.113.54", "{}"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-security-warning"));
}
