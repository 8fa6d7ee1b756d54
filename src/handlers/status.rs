//! Health and diagnostics handlers for the origin policy server.
//!
//! This module provides HTTP endpoints for inspecting a running policy:
//! - `/health` - Simple health check for systemd/load balancers
//! - `/cors/policy` - The effective policy (exact set, wildcard sources)
//! - `/cors/check?origin=...` - Explain the decision for one origin
//! - `/metrics` - Decision counters in Prometheus text format
//!
//! # Architecture
//!
//! ```text
//! HTTP Request ──> Axum Router ──> handler ──> AppState
//!                                     │          │
//!                                     ▼          ▼
//!                            validate_origin  OriginPolicy
//!                                     │        + OriginMetrics
//!                                     ▼
//!                               JSON / text Response
//! ```
//!
//! # Example Response
//!
//! ```json
//! {
//!   "name": "reasonkit-cors",
//!   "version": "0.1.1",
//!   "timestamp": "2026-01-01T12:00:00+00:00",
//!   "allowAll": false,
//!   "exactOrigins": ["https://acme.io", "https://app.acme.io"],
//!   "wildcardOrigins": ["https://*.acme.io"]
//! }
//! ```

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::cors::validate_origin;
use crate::metrics::OriginMetrics;
use crate::policy::{OriginPolicy, PolicyDescription};

/// Server version from Cargo.toml
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Server name from Cargo.toml
pub const SERVER_NAME: &str = env!("CARGO_PKG_NAME");

/// Content type of the Prometheus text exposition format
const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

// ============================================================================
// Response Types
// ============================================================================

/// Health check response for simple liveness probes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Health status (always "healthy" if responding)
    pub status: String,

    /// Server uptime in seconds
    pub uptime_seconds: u64,
}

/// Effective policy, as served by `/cors/policy`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyResponse {
    /// Server name
    pub name: String,

    /// Server version (from Cargo.toml)
    pub version: String,

    /// RFC 3339 timestamp of when the response was generated
    pub timestamp: String,

    /// Policy contents
    #[serde(flatten)]
    pub policy: PolicyDescription,
}

/// Query parameters of `/cors/check`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckParams {
    /// Origin to evaluate; missing means "no Origin header"
    #[serde(default)]
    pub origin: Option<String>,
}

// ============================================================================
// Application State
// ============================================================================

/// Shared state of the diagnostics router.
///
/// # Usage
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use reasonkit_cors::handlers::AppState;
/// use reasonkit_cors::metrics::OriginMetrics;
/// use reasonkit_cors::policy::OriginPolicy;
///
/// let state = Arc::new(AppState::new(
///     Arc::new(OriginPolicy::permissive()),
///     Arc::new(OriginMetrics::new()),
/// ));
/// ```
#[derive(Debug)]
pub struct AppState {
    policy: Arc<OriginPolicy>,
    metrics: Arc<OriginMetrics>,
    start_time: Instant,
}

impl AppState {
    /// Create state over a built policy and its metrics.
    pub fn new(policy: Arc<OriginPolicy>, metrics: Arc<OriginMetrics>) -> Self {
        Self {
            policy,
            metrics,
            start_time: Instant::now(),
        }
    }

    /// The served policy.
    #[inline]
    pub fn policy(&self) -> &OriginPolicy {
        &self.policy
    }

    /// Decision metrics.
    #[inline]
    pub fn metrics(&self) -> &OriginMetrics {
        &self.metrics
    }

    /// Get the server uptime in seconds.
    #[inline]
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

// ============================================================================
// HTTP Handlers
// ============================================================================

/// Health check endpoint handler.
///
/// # Route
/// `GET /health`
///
/// # Example
///
/// ```bash
/// curl http://localhost:9102/health
/// # {"status":"healthy","uptime_seconds":42}
/// ```
#[instrument(skip_all)]
pub async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    debug!("Health check requested");
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            uptime_seconds: state.uptime_seconds(),
        }),
    )
}

/// Effective policy endpoint handler.
///
/// # Route
/// `GET /cors/policy`
#[instrument(skip_all)]
pub async fn policy_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    debug!("Policy description requested");

    let response = PolicyResponse {
        name: SERVER_NAME.to_string(),
        version: SERVER_VERSION.to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        policy: state.policy().describe(),
    };

    (StatusCode::OK, Json(response))
}

/// Origin check endpoint handler.
///
/// Evaluates `origin` without recording it in the request metrics.
///
/// # Route
/// `GET /cors/check?origin=https://app.example.com`
///
/// # Example
///
/// ```bash
/// curl 'http://localhost:9102/cors/check?origin=https://app.example.com'
/// # {"allowed":true,"origin":"https://app.example.com","canonical":"https://app.example.com","reason":"Origin is in the allow list"}
/// ```
#[instrument(skip_all)]
pub async fn check_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CheckParams>,
) -> impl IntoResponse {
    let origin = params.origin.unwrap_or_default();
    debug!(origin = %origin, "Origin check requested");
    (StatusCode::OK, Json(validate_origin(state.policy(), &origin)))
}

/// Prometheus metrics endpoint handler.
///
/// # Route
/// `GET /metrics`
#[instrument(skip_all)]
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)],
        state.metrics().to_prometheus_format(),
    )
}

// ============================================================================
// Router Setup
// ============================================================================

/// Create the diagnostics router.
///
/// # Routes
/// - `GET /health` - Simple health check
/// - `GET /cors/policy` - Effective policy
/// - `GET /cors/check` - Decision for one origin
/// - `GET /metrics` - Prometheus counters
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use axum::Router;
/// use reasonkit_cors::handlers::{status_router, AppState};
/// use reasonkit_cors::metrics::OriginMetrics;
/// use reasonkit_cors::policy::OriginPolicy;
///
/// let state = Arc::new(AppState::new(
///     Arc::new(OriginPolicy::permissive()),
///     Arc::new(OriginMetrics::new()),
/// ));
/// let app: Router = status_router(state);
/// ```
pub fn status_router<S>(state: Arc<AppState>) -> axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    use axum::routing::get;

    axum::Router::new()
        .route("/health", get(health_handler))
        .route("/cors/policy", get(policy_handler))
        .route("/cors/check", get(check_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

// ============================================================================
// Tests
// ============================================================================
