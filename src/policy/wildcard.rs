//! `*`-glob origin patterns.
//!
//! A `*` matches any run of characters, dots included, so
//! `https://*.example.com` admits `https://a.example.com` and
//! `https://a.b.example.com` alike. Matching is case-insensitive and anchored
//! at both ends of the canonical origin string.

use regex::{Regex, RegexBuilder};

/// A compiled wildcard origin pattern.
#[derive(Debug, Clone)]
pub struct WildcardMatcher {
    source: String,
    pattern: Regex,
}

impl WildcardMatcher {
    /// Compile a wildcard entry.
    ///
    /// The entry is lowercased and one trailing `/` is removed before
    /// compilation. Returns `None` only when the regex engine rejects the
    /// translated pattern (for example when it exceeds the size limit).
    pub fn compile(entry: &str) -> Option<Self> {
        let source = strip_trailing_slash(&entry.trim().to_lowercase()).to_string();

        let translated = regex::escape(&source).replace(r"\*", ".*");
        let pattern = RegexBuilder::new(&format!("^{}$", translated))
            .case_insensitive(true)
            .build()
            .ok()?;

        Some(Self { source, pattern })
    }

    /// The normalized pattern text this matcher was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Whether `origin` (a canonical origin string) matches the pattern.
    pub fn matches(&self, origin: &str) -> bool {
        self.pattern.is_match(origin)
    }
}

/// Whether a configuration entry is a wildcard pattern.
pub fn is_wildcard(entry: &str) -> bool {
    entry.contains('*')
}

/// Derive the bare root of a `scheme://*.<root>` pattern.
///
/// `https://*.example.com` yields `https://example.com`, so a subdomain
/// pattern also admits the apex itself. Patterns of any other shape, or whose
/// root still contains a `*`, yield `None`.
pub fn wildcard_root(entry: &str) -> Option<String> {
    let lowered = entry.trim().to_lowercase();
    let normalized = strip_trailing_slash(&lowered);

    let (scheme, rest) = normalized.split_once("://")?;
    let root = rest.strip_prefix("*.")?;

    if scheme.is_empty() || root.is_empty() || root.contains('*') {
        return None;
    }

    Some(format!("{}://{}", scheme, root))
}

fn strip_trailing_slash(value: &str) -> &str {
    value.strip_suffix('/').unwrap_or(value)
}
