//! Origin decision metrics
//!
//! Counts the decisions taken by the origin guard and renders them in
//! Prometheus text format:
//! - Atomic counters for evaluated, allowed, denied and origin-less requests
//! - A per-origin breakdown of denials, so operators can see who is knocking
//!
//! # Example
//!
//! ```rust
//! use reasonkit_cors::metrics::OriginMetrics;
//! use reasonkit_cors::policy::OriginDecision;
//!
//! let metrics = OriginMetrics::new();
//! metrics.record_decision(&OriginDecision::Denied("https://evil.example".to_string()));
//!
//! let output = metrics.to_prometheus_format();
//! assert!(output.contains("reasonkit_cors_denied_total 1"));
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{OnceLock, RwLock};

use crate::policy::OriginDecision;

/// Upper bound on distinct origins tracked in the denial breakdown
const MAX_TRACKED_DENIED_ORIGINS: usize = 256;

/// Label used once the denial breakdown is full
const OVERFLOW_LABEL: &str = "other";

/// Decision counters for the origin guard.
#[derive(Debug, Default)]
pub struct OriginMetrics {
    /// Requests evaluated by the guard
    pub evaluated_total: AtomicU64,
    /// Requests admitted (any rule, including absent origin)
    pub allowed_total: AtomicU64,
    /// Requests rejected
    pub denied_total: AtomicU64,
    /// Requests that carried no `Origin` header
    pub absent_total: AtomicU64,
    /// Requests admitted by a wildcard pattern
    pub wildcard_total: AtomicU64,

    denied_by_origin: RwLock<HashMap<String, u64>>,
}

impl OriginMetrics {
    /// Create an empty metrics set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one guard decision.
    pub fn record_decision(&self, decision: &OriginDecision) {
        self.evaluated_total.fetch_add(1, Ordering::Relaxed);

        match decision {
            OriginDecision::Denied(origin) => {
                self.denied_total.fetch_add(1, Ordering::Relaxed);
                self.record_denied_origin(origin);
            }
            OriginDecision::Absent => {
                self.absent_total.fetch_add(1, Ordering::Relaxed);
                self.allowed_total.fetch_add(1, Ordering::Relaxed);
            }
            OriginDecision::Wildcard { .. } => {
                self.wildcard_total.fetch_add(1, Ordering::Relaxed);
                self.allowed_total.fetch_add(1, Ordering::Relaxed);
            }
            OriginDecision::AllowAll | OriginDecision::Exact(_) => {
                self.allowed_total.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    fn record_denied_origin(&self, origin: &str) {
        if let Ok(mut breakdown) = self.denied_by_origin.write() {
            let key = if breakdown.contains_key(origin)
                || breakdown.len() < MAX_TRACKED_DENIED_ORIGINS
            {
                origin.to_string()
            } else {
                OVERFLOW_LABEL.to_string()
            };
            *breakdown.entry(key).or_insert(0) += 1;
        }
    }

    /// Denials recorded for a canonical origin.
    pub fn denied_for(&self, origin: &str) -> u64 {
        self.denied_by_origin
            .read()
            .ok()
            .and_then(|breakdown| breakdown.get(origin).copied())
            .unwrap_or(0)
    }

    /// Convert metrics to Prometheus text format
    pub fn to_prometheus_format(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!(
            "reasonkit_cors_evaluated_total {}\n",
            self.evaluated_total.load(Ordering::Relaxed)
        ));
        output.push_str(&format!(
            "reasonkit_cors_allowed_total {}\n",
            self.allowed_total.load(Ordering::Relaxed)
        ));
        output.push_str(&format!(
            "reasonkit_cors_denied_total {}\n",
            self.denied_total.load(Ordering::Relaxed)
        ));
        output.push_str(&format!(
            "reasonkit_cors_absent_origin_total {}\n",
            self.absent_total.load(Ordering::Relaxed)
        ));
        output.push_str(&format!(
            "reasonkit_cors_wildcard_match_total {}\n",
            self.wildcard_total.load(Ordering::Relaxed)
        ));

        if let Ok(breakdown) = self.denied_by_origin.read() {
            let mut origins: Vec<_> = breakdown.iter().collect();
            origins.sort();
            for (origin, count) in origins {
                output.push_str(&format!(
                    "reasonkit_cors_denied_by_origin_total{{origin=\"{}\"}} {}\n",
                    escape_label(origin),
                    count
                ));
            }
        }

        output
    }
}

fn escape_label(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

/// Global metrics instance for the origin guard
pub static METRICS: OnceLock<OriginMetrics> = OnceLock::new();

/// Get or initialize the global metrics instance
pub fn global_metrics() -> &'static OriginMetrics {
    METRICS.get_or_init(OriginMetrics::new)
}
