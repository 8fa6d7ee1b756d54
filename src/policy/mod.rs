//! Origin policy engine
//!
//! Decides whether a cross-origin request, identified only by its `Origin`
//! header value, may access the API.
//!
//! # Architecture
//!
//! ```text
//! OriginConfig ──▶ parse_entries ──┬──▶ allow-all token ──────────────┐
//!                                  ├──▶ WildcardMatcher (+ apex root) │
//!                                  └──▶ normalize_config_entry        │
//!                                               │                     │
//!                                               ▼                     ▼
//!                                      alias::expand ──────▶ OriginPolicy
//!                                                                │
//!                                             Origin header ──▶ is_allowed
//! ```

pub mod alias;
pub mod entries;
pub mod evaluator;
pub mod origin;
pub mod wildcard;

pub use alias::{AliasOptions, DEFAULT_DEVELOPMENT_PORTS};
pub use entries::{parse_entries, OriginConfig};
pub use evaluator::{
    canonical_request_key, OriginDecision, OriginPolicy, PolicyDescription, PolicyOptions,
    ALLOW_ALL_TOKENS,
};
pub use origin::{
    is_local_address, normalize, normalize_config_entry, normalize_request_origin,
    OriginComponents, NULL_ORIGIN,
};
pub use wildcard::{wildcard_root, WildcardMatcher};
