//! Policy construction and per-request evaluation.
//!
//! An [`OriginPolicy`] is built once from configuration and never mutated
//! afterwards, so it can be shared behind an `Arc` by every request task
//! without locking.
//!
//! # Precedence
//!
//! 1. A missing or empty `Origin` is always allowed (same-origin or non-browser
//!    caller).
//! 2. Allow-all policies accept everything.
//! 3. The canonical origin is looked up in the exact set.
//! 4. Wildcard patterns are tried in configuration order.
//! 5. Everything else is denied.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use super::alias::{self, AliasOptions, DEFAULT_DEVELOPMENT_PORTS};
use super::entries::{parse_entries, OriginConfig};
use super::origin::{normalize_config_entry, normalize_request_origin, NULL_ORIGIN};
use super::wildcard::{is_wildcard, wildcard_root, WildcardMatcher};

/// Configuration tokens that switch the policy to allow-all (case-insensitive).
pub const ALLOW_ALL_TOKENS: [&str; 3] = ["*", "true", "all"];

/// Options applied while building a policy.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyOptions {
    /// Expand local origins into loopback/scheme/port aliases
    pub allow_development_origins: bool,
    /// Ports tried for local web origins during development expansion
    pub development_port_hints: Vec<u16>,
    /// Bridge `www.` and apex hosts
    pub include_www_aliases: bool,
    /// Extra entries merged after the primary configuration
    pub additional_origins: OriginConfig,
}

impl PolicyOptions {
    /// Defaults for a runtime that is (or is not) flagged as production.
    ///
    /// Development aliasing is only enabled outside production.
    pub fn for_environment(production: bool) -> Self {
        Self {
            allow_development_origins: !production,
            development_port_hints: DEFAULT_DEVELOPMENT_PORTS.to_vec(),
            include_www_aliases: true,
            additional_origins: OriginConfig::Unset,
        }
    }

    /// Enable or disable development aliasing.
    pub fn with_development_origins(mut self, allow: bool) -> Self {
        self.allow_development_origins = allow;
        self
    }

    /// Replace the development port hints.
    pub fn with_port_hints(mut self, ports: Vec<u16>) -> Self {
        self.development_port_hints = ports;
        self
    }

    /// Enable or disable `www` aliasing.
    pub fn with_www_aliases(mut self, include: bool) -> Self {
        self.include_www_aliases = include;
        self
    }

    /// Merge additional origins into the policy.
    pub fn with_additional_origins(mut self, origins: impl Into<OriginConfig>) -> Self {
        self.additional_origins = origins.into();
        self
    }

    fn alias_options(&self) -> AliasOptions {
        AliasOptions {
            allow_development_origins: self.allow_development_origins,
            development_port_hints: self.development_port_hints.clone(),
            include_www_aliases: self.include_www_aliases,
        }
    }
}

impl Default for PolicyOptions {
    fn default() -> Self {
        Self::for_environment(crate::config::is_production())
    }
}

/// Outcome of evaluating one `Origin` value, with the rule that decided it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OriginDecision {
    /// No origin was sent
    Absent,
    /// The policy allows every origin
    AllowAll,
    /// The canonical origin is in the exact set
    Exact(String),
    /// The canonical origin matched a wildcard pattern
    Wildcard {
        /// Canonical key that was matched
        origin: String,
        /// Source of the matching pattern
        pattern: String,
    },
    /// No rule admitted the canonical origin
    Denied(String),
}

impl OriginDecision {
    /// Whether the request may proceed.
    pub fn is_allowed(&self) -> bool {
        !matches!(self, OriginDecision::Denied(_))
    }
}

/// Serializable snapshot of a policy, suitable for diagnostics endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyDescription {
    /// Whether every origin is accepted
    pub allow_all: bool,
    /// Canonical exact origins, sorted
    pub exact_origins: Vec<String>,
    /// Wildcard pattern sources in configuration order
    pub wildcard_origins: Vec<String>,
}

/// An immutable, ready-to-query origin policy.
#[derive(Debug, Clone)]
pub struct OriginPolicy {
    allow_all: bool,
    exact: BTreeSet<String>,
    wildcards: Vec<WildcardMatcher>,
}

impl OriginPolicy {
    /// Build a policy from configuration.
    ///
    /// Never fails: entries that cannot be parsed are kept as lowercased
    /// literals, and a policy that ends up with nothing to match falls back to
    /// allow-all.
    ///
    /// # Example
    ///
    /// ```rust
    /// use reasonkit_cors::policy::{OriginConfig, OriginPolicy, PolicyOptions};
    ///
    /// let policy = OriginPolicy::build(
    ///     &OriginConfig::from("https://example.com, https://*.partners.example.com"),
    ///     &PolicyOptions::for_environment(true),
    /// );
    ///
    /// assert!(policy.is_allowed(Some("https://www.example.com")));
    /// assert!(policy.is_allowed(Some("https://a.b.partners.example.com")));
    /// assert!(!policy.is_allowed(Some("https://evil.example.net")));
    /// ```
    pub fn build(config: &OriginConfig, options: &PolicyOptions) -> Self {
        let mut entries = parse_entries(config);
        entries.extend(parse_entries(&options.additional_origins));

        let mut allow_all = entries.is_empty();
        let mut exact = BTreeSet::new();
        let mut wildcards: Vec<WildcardMatcher> = Vec::new();

        for entry in &entries {
            let lowered = entry.to_lowercase();

            if ALLOW_ALL_TOKENS.contains(&lowered.as_str()) {
                debug!(entry = %entry, "Allow-all token configured");
                allow_all = true;
                continue;
            }

            if is_wildcard(entry) {
                match WildcardMatcher::compile(entry) {
                    Some(matcher) => {
                        debug!(pattern = matcher.source(), "Compiled wildcard origin");
                        if !wildcards.iter().any(|w| w.source() == matcher.source()) {
                            wildcards.push(matcher);
                        }
                    }
                    None => {
                        warn!(entry = %entry, "Wildcard origin could not be compiled, keeping it as a literal");
                        exact.insert(lowered);
                    }
                }

                if let Some(root) = wildcard_root(entry) {
                    insert_literal(&mut exact, &root);
                }
                continue;
            }

            insert_literal(&mut exact, entry);
        }

        alias::expand(&mut exact, &options.alias_options());

        if !allow_all && exact.is_empty() && wildcards.is_empty() {
            warn!("No usable origins configured, allowing all origins");
            allow_all = true;
        }

        info!(
            allow_all,
            exact_origins = exact.len(),
            wildcard_origins = wildcards.len(),
            "Origin policy built"
        );

        Self {
            allow_all,
            exact,
            wildcards,
        }
    }

    /// A policy that accepts every origin.
    pub fn permissive() -> Self {
        Self {
            allow_all: true,
            exact: BTreeSet::new(),
            wildcards: Vec::new(),
        }
    }

    /// Whether a request carrying `origin` may proceed.
    ///
    /// `None` and blank values are always allowed.
    pub fn is_allowed(&self, origin: Option<&str>) -> bool {
        self.decide(origin).is_allowed()
    }

    /// Evaluate `origin` and report which rule decided it.
    pub fn decide(&self, origin: Option<&str>) -> OriginDecision {
        let origin = match origin.map(str::trim) {
            Some(value) if !value.is_empty() => value,
            _ => return OriginDecision::Absent,
        };

        if self.allow_all {
            return OriginDecision::AllowAll;
        }

        let key = canonical_request_key(origin);

        let decision = if self.exact.contains(&key) {
            OriginDecision::Exact(key)
        } else if let Some(matcher) = self.wildcards.iter().find(|w| w.matches(&key)) {
            OriginDecision::Wildcard {
                pattern: matcher.source().to_string(),
                origin: key,
            }
        } else {
            OriginDecision::Denied(key)
        };

        trace!(origin = %origin, ?decision, "Evaluated origin");
        decision
    }

    /// Whether every origin is accepted.
    pub fn allow_all(&self) -> bool {
        self.allow_all
    }

    /// Canonical exact origins, including generated aliases.
    pub fn exact_origins(&self) -> impl Iterator<Item = &str> {
        self.exact.iter().map(String::as_str)
    }

    /// Wildcard pattern sources in configuration order.
    pub fn wildcard_origins(&self) -> impl Iterator<Item = &str> {
        self.wildcards.iter().map(WildcardMatcher::source)
    }

    /// Snapshot of the policy for diagnostics.
    pub fn describe(&self) -> PolicyDescription {
        PolicyDescription {
            allow_all: self.allow_all,
            exact_origins: self.exact_origins().map(str::to_string).collect(),
            wildcard_origins: self.wildcard_origins().map(str::to_string).collect(),
        }
    }
}

impl Default for OriginPolicy {
    fn default() -> Self {
        Self::permissive()
    }
}

/// Comparison key for an incoming `Origin` value.
///
/// The canonical origin when the value can be normalized, `null` for the
/// opaque origin, and the lowercased trimmed value otherwise.
pub fn canonical_request_key(origin: &str) -> String {
    let trimmed = origin.trim();
    if trimmed.eq_ignore_ascii_case(NULL_ORIGIN) {
        return NULL_ORIGIN.to_string();
    }

    normalize_request_origin(trimmed)
        .map(|components| components.to_string())
        .unwrap_or_else(|| trimmed.to_lowercase())
}

fn insert_literal(exact: &mut BTreeSet<String>, entry: &str) {
    if entry.trim().eq_ignore_ascii_case(NULL_ORIGIN) {
        exact.insert(NULL_ORIGIN.to_string());
        return;
    }

    let variants = normalize_config_entry(entry);
    if variants.is_empty() {
        warn!(entry = %entry, "Origin could not be normalized, keeping it as a literal");
        exact.insert(entry.trim().to_lowercase());
        return;
    }

    for origin in variants {
        debug!(origin = %origin, "Allowed exact origin");
        exact.insert(origin.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn production() -> PolicyOptions {
        PolicyOptions::for_environment(true)
    }

    fn development() -> PolicyOptions {
        PolicyOptions::for_environment(false)
    }

    fn strict() -> PolicyOptions {
        production().with_www_aliases(false)
    }

    #[test]
    fn test_empty_config_allows_all() {
        let policy = OriginPolicy::build(&OriginConfig::Unset, &production());
        assert!(policy.allow_all());
        assert!(policy.is_allowed(Some("https://anything.example")));

        let policy = OriginPolicy::build(&OriginConfig::from(" , "), &production());
        assert!(policy.allow_all());
    }

    #[test]
    fn test_allow_all_tokens() {
        for token in ["*", "true", "ALL", "True"] {
            let policy = OriginPolicy::build(&OriginConfig::from(vec![token]), &production());
            assert!(policy.allow_all(), "{token} should enable allow-all");
        }
    }

    #[test]
    fn test_allow_all_token_alongside_origins() {
        let policy = OriginPolicy::build(&OriginConfig::from("https://example.com *"), &strict());
        assert!(policy.allow_all());
        assert!(policy.is_allowed(Some("https://other.example")));
        assert_eq!(policy.describe().exact_origins, vec!["https://example.com"]);
    }

    #[test]
    fn test_missing_origin_always_allowed() {
        let policy = OriginPolicy::build(&OriginConfig::from("https://example.com"), &strict());
        assert!(policy.is_allowed(None));
        assert!(policy.is_allowed(Some("")));
        assert!(policy.is_allowed(Some("   ")));
        assert_eq!(policy.decide(None), OriginDecision::Absent);
    }

    #[test]
    fn test_default_port_equivalence() {
        let policy = OriginPolicy::build(&OriginConfig::from("https://Example.com"), &strict());
        assert!(policy.is_allowed(Some("https://example.com:443")));
        assert!(policy.is_allowed(Some("https://EXAMPLE.com/")));
        assert!(!policy.is_allowed(Some("https://example.com:8443")));
    }

    #[test]
    fn test_wildcard_allows_subdomains_and_apex() {
        let policy =
            OriginPolicy::build(&OriginConfig::from(vec!["https://*.example.com"]), &production());
        assert!(policy.is_allowed(Some("https://a.b.example.com")));
        assert!(policy.is_allowed(Some("https://example.com")));
        assert!(!policy.is_allowed(Some("https://example.evil.com")));

        assert_eq!(
            policy.decide(Some("https://api.example.com")),
            OriginDecision::Wildcard {
                origin: "https://api.example.com".to_string(),
                pattern: "https://*.example.com".to_string(),
            }
        );
    }

    #[test]
    fn test_www_aliases() {
        let policy = OriginPolicy::build(&OriginConfig::from("https://example.com"), &production());
        assert!(policy.is_allowed(Some("https://www.example.com")));

        let policy =
            OriginPolicy::build(&OriginConfig::from("https://www.example.com"), &production());
        assert!(policy.is_allowed(Some("https://example.com")));

        let policy =
            OriginPolicy::build(&OriginConfig::from("https://blog.example.com"), &production());
        assert!(!policy.is_allowed(Some("https://example.com")));
        assert!(!policy.is_allowed(Some("https://www.blog.example.com")));
    }

    #[test]
    fn test_development_aliases() {
        let options = development().with_port_hints(vec![5173]);
        let policy = OriginPolicy::build(&OriginConfig::from("http://localhost:3000"), &options);

        assert!(policy.is_allowed(Some("http://127.0.0.1:3000")));
        assert!(policy.is_allowed(Some("http://localhost:5173")));
        assert!(policy.is_allowed(Some("https://[::1]:3000")));
        assert!(!policy.is_allowed(Some("http://localhost:9999")));
    }

    #[test]
    fn test_development_aliases_disabled_in_production() {
        let policy = OriginPolicy::build(&OriginConfig::from("http://localhost:3000"), &production());
        assert!(policy.is_allowed(Some("http://localhost:3000")));
        assert!(!policy.is_allowed(Some("http://127.0.0.1:3000")));
        assert!(!policy.is_allowed(Some("http://localhost:5173")));
    }

    #[test]
    fn test_null_origin_literal() {
        let policy = OriginPolicy::build(&OriginConfig::from("null"), &production());
        assert!(!policy.allow_all());
        assert!(policy.is_allowed(Some("null")));
        assert!(policy.is_allowed(Some("NULL")));
        assert!(!policy.is_allowed(Some("https://null")));

        let policy = OriginPolicy::build(&OriginConfig::from("https://example.com"), &strict());
        assert!(!policy.is_allowed(Some("null")));
    }

    #[test]
    fn test_strict_allow_list() {
        let policy = OriginPolicy::build(&OriginConfig::from("https://example.com"), &strict());

        assert!(policy.is_allowed(Some("https://example.com")));
        assert!(!policy.is_allowed(Some("https://www.example.com")));
        assert!(!policy.is_allowed(Some("http://example.com")));
        assert!(!policy.is_allowed(Some("https://api.example.com")));
        assert!(!policy.is_allowed(Some("https://example.org")));
        assert_eq!(policy.describe().exact_origins, vec!["https://example.com"]);
    }

    #[test]
    fn test_bare_hosts_get_guessed_schemes() {
        let policy = OriginPolicy::build(&OriginConfig::from("example.com localhost:4000"), &strict());
        let description = policy.describe();

        assert_eq!(
            description.exact_origins,
            vec![
                "http://localhost:4000",
                "https://example.com",
                "https://localhost:4000",
            ]
        );
        assert!(policy.is_allowed(Some("example.com")));
    }

    #[test]
    fn test_unparsable_entry_kept_as_literal() {
        let policy = OriginPolicy::build(&OriginConfig::from(vec!["HTTPS://exa mple.com"]), &strict());
        assert!(!policy.allow_all());
        assert_eq!(policy.describe().exact_origins, vec!["https://exa mple.com"]);
        assert!(policy.is_allowed(Some("https://EXA mple.com")));
    }

    #[test]
    fn test_opaque_literal_matches_verbatim() {
        let policy = OriginPolicy::build(&OriginConfig::from("%%weird%%"), &strict());
        assert!(!policy.allow_all());
        assert!(policy.is_allowed(Some("%%WEIRD%%")));
        assert!(!policy.is_allowed(Some("https://example.com")));
    }

    #[test]
    fn test_additional_origins_are_merged() {
        let options = strict().with_additional_origins(vec!["https://admin.example.com"]);
        let policy = OriginPolicy::build(&OriginConfig::from("https://app.example.com"), &options);

        assert!(policy.is_allowed(Some("https://app.example.com")));
        assert!(policy.is_allowed(Some("https://admin.example.com")));
    }

    #[test]
    fn test_additional_origins_alone_disable_allow_all() {
        let options = strict().with_additional_origins("https://admin.example.com");
        let policy = OriginPolicy::build(&OriginConfig::Unset, &options);
        assert!(!policy.allow_all());
        assert!(!policy.is_allowed(Some("https://app.example.com")));
    }

    #[test]
    fn test_describe_lists_wildcards_in_order() {
        let policy = OriginPolicy::build(
            &OriginConfig::from("https://*.b.example HTTPS://*.A.example/ https://*.b.example"),
            &strict(),
        );
        let description = policy.describe();

        assert!(!description.allow_all);
        assert_eq!(
            description.wildcard_origins,
            vec!["https://*.b.example", "https://*.a.example"]
        );
        assert_eq!(
            description.exact_origins,
            vec!["https://a.example", "https://b.example"]
        );
    }

    #[test]
    fn test_describe_serializes_camel_case() {
        let policy = OriginPolicy::build(&OriginConfig::from("https://example.com"), &strict());
        let json = serde_json::to_value(policy.describe()).unwrap();

        assert_eq!(json["allowAll"], false);
        assert_eq!(json["exactOrigins"][0], "https://example.com");
        assert!(json["wildcardOrigins"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_canonical_request_key() {
        assert_eq!(canonical_request_key(" HTTPS://Example.com:443/ "), "https://example.com");
        assert_eq!(canonical_request_key("example.com"), "https://example.com");
        assert_eq!(canonical_request_key("Null"), "null");
        assert_eq!(canonical_request_key("%%Weird%%"), "%%weird%%");
    }

    #[test]
    fn test_policy_is_shareable_across_threads() {
        use std::sync::Arc;
        use std::thread;

        let policy = Arc::new(OriginPolicy::build(
            &OriginConfig::from("https://example.com https://*.example.org"),
            &production(),
        ));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let policy = Arc::clone(&policy);
                thread::spawn(move || {
                    for _ in 0..1000 {
                        assert!(policy.is_allowed(Some("https://www.example.com")));
                        assert!(policy.is_allowed(Some("https://api.example.org")));
                        assert!(!policy.is_allowed(Some("https://example.net")));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().expect("Thread panicked");
        }
    }
}
