//! Integration tests for the HTTP adapter and diagnostics router.
//!
//! Run with: `cargo test --test http_tests`

use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::{middleware, routing::get, Router};
use tower::ServiceExt;

use reasonkit_cors::cors::{cors_layer, enforce_origin_policy, OriginGuard};
use reasonkit_cors::handlers::{status_router, AppState};
use reasonkit_cors::metrics::OriginMetrics;
use reasonkit_cors::policy::{OriginConfig, OriginPolicy, PolicyOptions};

struct TestApp {
    router: Router,
    metrics: Arc<OriginMetrics>,
}

fn app(origins: &str) -> TestApp {
    let policy = Arc::new(OriginPolicy::build(
        &OriginConfig::from(origins),
        &PolicyOptions::for_environment(true),
    ));
    let metrics = Arc::new(OriginMetrics::new());
    let state = Arc::new(AppState::new(policy.clone(), metrics.clone()));
    let guard = OriginGuard::new(policy.clone(), metrics.clone());

    let router = Router::new()
        .route("/api/ping", get(|| async { "pong" }))
        .merge(status_router(state))
        .layer(cors_layer(policy))
        .layer(middleware::from_fn_with_state(guard, enforce_origin_policy));

    TestApp { router, metrics }
}

fn get_request(uri: &str, origin: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(uri);
    if let Some(origin) = origin {
        builder = builder.header(header::ORIGIN, origin);
    }
    builder.body(Body::empty()).unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_allowed_origin_gets_cors_headers() {
    let app = app("https://example.com");

    let response = app
        .router
        .oneshot(get_request("/api/ping", Some("https://www.example.com")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "https://www.example.com"
    );
    assert_eq!(body_text(response).await, "pong");
}

#[tokio::test]
async fn test_denied_origin_is_forbidden() {
    let app = app("https://example.com");

    let response = app
        .router
        .oneshot(get_request("/api/ping", Some("https://evil.example")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());

    let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(json["origin"], "https://evil.example");
    assert_eq!(json["error"], "Origin not allowed: https://evil.example");

    assert_eq!(app.metrics.denied_total.load(Ordering::Relaxed), 1);
    assert_eq!(app.metrics.denied_for("https://evil.example"), 1);
}

#[tokio::test]
async fn test_request_without_origin_passes() {
    let app = app("https://example.com");

    let response = app
        .router
        .oneshot(get_request("/api/ping", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());
    assert_eq!(app.metrics.absent_total.load(Ordering::Relaxed), 1);
}

#[tokio::test]
async fn test_preflight_for_wildcard_origin() {
    let app = app("https://*.example.com");

    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/ping")
        .header(header::ORIGIN, "https://tenant.example.com")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();

    let response = app.router.oneshot(request).await.unwrap();

    assert!(response.status().is_success());
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "https://tenant.example.com"
    );
    assert_eq!(response.headers()[header::ACCESS_CONTROL_MAX_AGE], "3600");
    assert_eq!(app.metrics.wildcard_total.load(Ordering::Relaxed), 1);
}

#[tokio::test]
async fn test_preflight_for_denied_origin_is_forbidden() {
    let app = app("https://example.com");

    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/ping")
        .header(header::ORIGIN, "https://evil.example")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();

    let response = app.router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_permissive_policy_admits_everything() {
    let app = app("");

    let response = app
        .router
        .oneshot(get_request("/api/ping", Some("https://anything.example")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "https://anything.example"
    );
}

#[tokio::test]
async fn test_policy_endpoint() {
    let app = app("https://app.acme.io, https://*.partners.acme.io");

    let response = app
        .router
        .oneshot(get_request("/cors/policy", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(json["allowAll"], false);
    assert_eq!(
        json["exactOrigins"],
        serde_json::json!(["https://app.acme.io", "https://partners.acme.io"])
    );
    assert_eq!(
        json["wildcardOrigins"],
        serde_json::json!(["https://*.partners.acme.io"])
    );
    assert!(json["timestamp"].is_string());
}

#[tokio::test]
async fn test_check_endpoint() {
    let app = app("https://app.acme.io");

    let response = app
        .router
        .clone()
        .oneshot(get_request(
            "/cors/check?origin=https%3A%2F%2FAPP.acme.io%3A443",
            None,
        ))
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(json["allowed"], true);
    assert_eq!(json["canonical"], "https://app.acme.io");

    let response = app
        .router
        .oneshot(get_request("/cors/check?origin=http%3A%2F%2Fapp.acme.io", None))
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(json["allowed"], false);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = app("https://example.com");

    let denied = app
        .router
        .clone()
        .oneshot(get_request("/api/ping", Some("https://evil.example")))
        .await
        .unwrap();
    assert_eq!(denied.status(), StatusCode::FORBIDDEN);

    let response = app
        .router
        .oneshot(get_request("/metrics", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let text = body_text(response).await;
    assert!(text.contains("reasonkit_cors_denied_total 1\n"));
    assert!(text.contains("reasonkit_cors_denied_by_origin_total{origin=\"https://evil.example\"} 1\n"));
}
