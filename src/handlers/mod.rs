//! HTTP handlers for the diagnostics server.

pub mod status;

pub use status::{
    check_handler, health_handler, metrics_handler, policy_handler, status_router, AppState,
    CheckParams, HealthResponse, PolicyResponse,
};
