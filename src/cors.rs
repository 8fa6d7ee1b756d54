//! CORS (Cross-Origin Resource Sharing) adapter for ReasonKit services
//!
//! This module wires an [`OriginPolicy`] into the HTTP stack:
//!
//! - [`cors_layer`] builds a `tower-http` [`CorsLayer`] whose origin predicate
//!   is the policy, so allowed origins get the usual `Access-Control-*` headers.
//! - [`enforce_origin_policy`] is an axum middleware that rejects requests from
//!   denied origins with `403 Forbidden` and a body naming the origin.
//! - [`validate_origin`] explains a single decision for diagnostics.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use axum::{middleware, routing::get, Router};
//! use reasonkit_cors::cors::{cors_layer, enforce_origin_policy, OriginGuard};
//! use reasonkit_cors::metrics::OriginMetrics;
//! use reasonkit_cors::policy::{OriginConfig, OriginPolicy, PolicyOptions};
//!
//! let policy = Arc::new(OriginPolicy::build(
//!     &OriginConfig::from("https://app.example.com"),
//!     &PolicyOptions::default(),
//! ));
//! let guard = OriginGuard::new(policy.clone(), Arc::new(OriginMetrics::new()));
//!
//! let app: Router = Router::new()
//!     .route("/api/ping", get(|| async { "pong" }))
//!     .layer(cors_layer(policy))
//!     .layer(middleware::from_fn_with_state(guard, enforce_origin_policy));
//! ```

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use http::{header, header::HeaderValue, request::Parts, Method};
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::metrics::OriginMetrics;
use crate::policy::{OriginDecision, OriginPolicy};

/// Standard allowed headers for API requests
pub const ALLOWED_HEADERS: [http::header::HeaderName; 2] =
    [http::header::CONTENT_TYPE, http::header::AUTHORIZATION];

/// Standard allowed methods for API requests
pub const ALLOWED_METHODS: [Method; 6] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::PATCH,
    Method::DELETE,
    Method::OPTIONS,
];

/// Default max age for preflight cache (1 hour)
pub const DEFAULT_MAX_AGE_SECS: u64 = 3600;

/// Creates a CORS layer that admits exactly the origins `policy` allows.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use reasonkit_cors::cors::cors_layer;
/// use reasonkit_cors::policy::{OriginConfig, OriginPolicy, PolicyOptions};
///
/// let policy = OriginPolicy::build(&OriginConfig::from("https://example.com"), &PolicyOptions::default());
/// let layer = cors_layer(Arc::new(policy));
/// ```
pub fn cors_layer(policy: Arc<OriginPolicy>) -> CorsLayer {
    cors_layer_with_settings(policy, CorsSettings::default())
}

/// Creates a CORS layer with custom header settings.
///
/// # Arguments
///
/// * `policy` - Origin policy used as the origin predicate
/// * `settings` - Methods, headers, credentials and preflight cache options
pub fn cors_layer_with_settings(policy: Arc<OriginPolicy>, settings: CorsSettings) -> CorsLayer {
    let mut layer = CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _parts: &Parts| {
                policy.is_allowed(Some(&header_text(origin)))
            },
        ))
        .allow_methods(settings.allowed_methods.clone())
        .allow_headers(settings.allowed_headers.clone())
        .max_age(Duration::from_secs(settings.max_age_secs));

    if settings.allow_credentials {
        layer = layer.allow_credentials(true);
    }

    if settings.expose_headers {
        layer = layer.expose_headers([header::CONTENT_LENGTH, header::CONTENT_TYPE]);
    }

    layer
}

/// Header options for the CORS layer.
#[derive(Debug, Clone)]
pub struct CorsSettings {
    /// Whether to allow credentials (cookies, auth headers)
    pub allow_credentials: bool,
    /// Whether to expose response headers to the client
    pub expose_headers: bool,
    /// Maximum age for preflight cache in seconds
    pub max_age_secs: u64,
    /// Allowed HTTP methods
    pub allowed_methods: Vec<Method>,
    /// Allowed request headers
    pub allowed_headers: Vec<http::header::HeaderName>,
}

impl Default for CorsSettings {
    fn default() -> Self {
        Self {
            allow_credentials: false,
            expose_headers: false,
            max_age_secs: DEFAULT_MAX_AGE_SECS,
            allowed_methods: ALLOWED_METHODS.to_vec(),
            allowed_headers: ALLOWED_HEADERS.to_vec(),
        }
    }
}

impl CorsSettings {
    /// Create settings with the defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum age for preflight cache.
    pub fn with_max_age(mut self, secs: u64) -> Self {
        self.max_age_secs = secs;
        self
    }

    /// Enable or disable credentials support.
    pub fn with_allow_credentials(mut self, allow: bool) -> Self {
        self.allow_credentials = allow;
        self
    }

    /// Enable or disable header exposure.
    pub fn with_expose_headers(mut self, expose: bool) -> Self {
        self.expose_headers = expose;
        self
    }

    /// Set allowed HTTP methods.
    pub fn with_methods(mut self, methods: Vec<Method>) -> Self {
        self.allowed_methods = methods;
        self
    }

    /// Set allowed request headers.
    pub fn with_headers(mut self, headers: Vec<http::header::HeaderName>) -> Self {
        self.allowed_headers = headers;
        self
    }
}

/// State for [`enforce_origin_policy`].
#[derive(Debug, Clone)]
pub struct OriginGuard {
    policy: Arc<OriginPolicy>,
    metrics: Arc<OriginMetrics>,
}

impl OriginGuard {
    /// Create a guard over `policy`, recording decisions into `metrics`.
    pub fn new(policy: Arc<OriginPolicy>, metrics: Arc<OriginMetrics>) -> Self {
        Self { policy, metrics }
    }

    /// Evaluate the `Origin` header of a request and record the decision.
    pub fn check(&self, origin: Option<&HeaderValue>) -> OriginDecision {
        let origin = origin.map(header_text);
        let decision = self.policy.decide(origin.as_deref());
        self.metrics.record_decision(&decision);
        decision
    }
}

/// Rejects requests whose `Origin` header the policy denies.
///
/// Requests without an `Origin` header pass through untouched.
///
/// # Errors
///
/// Returns [`Error::OriginRejected`] (rendered as `403 Forbidden`) for denied
/// origins.
pub async fn enforce_origin_policy(
    State(guard): State<OriginGuard>,
    request: Request,
    next: Next,
) -> Result<Response> {
    let origin = request.headers().get(header::ORIGIN);

    match guard.check(origin) {
        OriginDecision::Denied(canonical) => {
            let origin = origin.map(header_text).unwrap_or_default();
            warn!(
                origin = %origin,
                canonical = %canonical,
                method = %request.method(),
                path = %request.uri().path(),
                "Rejected cross-origin request"
            );
            Err(Error::origin_rejected(origin))
        }
        decision => {
            debug!(?decision, "Cross-origin request admitted");
            Ok(next.run(request).await)
        }
    }
}

/// Result of CORS validation containing diagnostic information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorsValidationResult {
    /// Whether the origin is allowed
    pub allowed: bool,
    /// The origin that was checked
    pub origin: String,
    /// Canonical comparison key, when the origin was evaluated against rules
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canonical: Option<String>,
    /// Reason for the decision
    pub reason: String,
}

/// Validates an origin against `policy` and explains the decision.
///
/// # Example
///
/// ```rust
/// use reasonkit_cors::cors::validate_origin;
/// use reasonkit_cors::policy::{OriginConfig, OriginPolicy, PolicyOptions};
///
/// let policy = OriginPolicy::build(
///     &OriginConfig::from("https://*.example.com"),
///     &PolicyOptions::for_environment(true),
/// );
/// let result = validate_origin(&policy, "https://api.example.com");
/// assert!(result.allowed);
/// println!("Reason: {}", result.reason);
/// ```
pub fn validate_origin(policy: &OriginPolicy, origin: &str) -> CorsValidationResult {
    let decision = policy.decide(Some(origin));
    let allowed = decision.is_allowed();

    let (canonical, reason) = match decision {
        OriginDecision::Absent => (None, "No origin supplied; same-origin requests are always allowed".to_string()),
        OriginDecision::AllowAll => (None, "Policy allows all origins".to_string()),
        OriginDecision::Exact(key) => (Some(key), "Origin is in the allow list".to_string()),
        OriginDecision::Wildcard { origin, pattern } => {
            (Some(origin), format!("Origin matches wildcard pattern {}", pattern))
        }
        OriginDecision::Denied(key) => (Some(key), "Origin not allowed by policy".to_string()),
    };

    CorsValidationResult {
        allowed,
        origin: origin.to_string(),
        canonical,
        reason,
    }
}

fn header_text(value: &HeaderValue) -> String {
    String::from_utf8_lossy(value.as_bytes()).into_owned()
}
