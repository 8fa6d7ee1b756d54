//! ReasonKit CORS - Origin Policy Engine for ReasonKit Services
//!
//! This crate decides whether a cross-origin browser request may reach an API,
//! based on nothing but its `Origin` header and an operator-supplied allow
//! list.
//!
//! # Features
//!
//! - **Origin Policy**: Exact, wildcard and allow-all rules with canonical
//!   origin comparison (case, default ports, trailing slashes)
//! - **Aliasing**: `www` ⇄ apex aliases and development loopback aliases
//! - **HTTP Adapter**: `tower-http` CORS layer and an axum guard that answers
//!   denied origins with `403 Forbidden`
//! - **Diagnostics**: Policy, decision and Prometheus endpoints
//!
//! # Architecture
//!
//! ```text
//! PolicyConfig ──▶ OriginPolicy::build ──▶ Arc<OriginPolicy>
//!  (env / JSON)                                 │
//!                           ┌───────────────────┼───────────────────┐
//!                           ▼                   ▼                   ▼
//!                     ┌──────────┐      ┌──────────────┐     ┌─────────────┐
//!                     │CorsLayer │      │ OriginGuard  │     │ Diagnostics │
//!                     └──────────┘      └──────┬───────┘     └─────────────┘
//!                                              ▼
//!                                        OriginMetrics
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use reasonkit_cors::policy::{OriginConfig, OriginPolicy, PolicyOptions};
//!
//! let policy = OriginPolicy::build(
//!     &OriginConfig::from("https://acme.io, https://*.acme.io"),
//!     &PolicyOptions::for_environment(true),
//! );
//!
//! assert!(policy.is_allowed(Some("https://www.acme.io")));
//! assert!(policy.is_allowed(Some("https://app.acme.io")));
//! assert!(!policy.is_allowed(Some("https://acme.io.evil.com")));
//! assert!(policy.is_allowed(None));
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod config;
pub mod cors;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod policy;

// Re-exports for convenience
pub use config::PolicyConfig;
pub use cors::{cors_layer, enforce_origin_policy, validate_origin, OriginGuard};
pub use error::{ConfigError, Error, Result};
pub use metrics::OriginMetrics;
pub use policy::{OriginConfig, OriginDecision, OriginPolicy, PolicyOptions};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
