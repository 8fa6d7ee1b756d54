//! Origin normalization.
//!
//! Turns origin-like strings into a canonical `(scheme, host, port)` triple so
//! that `https://Example.com`, `https://example.com:443` and
//! `https://example.com/` all compare equal.
//!
//! Nothing in this module returns an error: anything that is not an absolute
//! URL with a host normalizes to `None`.

use std::fmt;
use std::net::Ipv4Addr;
use std::sync::OnceLock;

use regex::Regex;
use url::{Host, Url};

/// Literal origin sent by browsers for opaque contexts (sandboxed iframes, `file:`).
pub const NULL_ORIGIN: &str = "null";

/// Hosts that are treated as one loopback family for development aliasing.
pub const LOOPBACK_HOSTS: [&str; 4] = ["localhost", "127.0.0.1", "0.0.0.0", "::1"];

/// A parsed origin in canonical form.
///
/// Two values compare equal exactly when they denote the same origin.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OriginComponents {
    /// Lowercased scheme without the `://` separator
    pub scheme: String,
    /// Lowercased host; IPv6 literals are stored without brackets
    pub host: String,
    /// Explicit port, `None` when absent or equal to the scheme default
    pub port: Option<u16>,
}

impl OriginComponents {
    /// Build components, applying the same normalization as [`normalize`].
    pub fn new(scheme: &str, host: &str, port: Option<u16>) -> Self {
        let scheme = scheme.to_ascii_lowercase();
        let host = host
            .trim_start_matches('[')
            .trim_end_matches(']')
            .to_ascii_lowercase();
        let port = port.filter(|p| default_port(&scheme) != Some(*p));

        Self { scheme, host, port }
    }

    /// Whether the scheme is `http` or `https`.
    pub fn is_web(&self) -> bool {
        is_web_scheme(&self.scheme)
    }
}

impl fmt::Display for OriginComponents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "{}://[{}]", self.scheme, self.host)?;
        } else {
            write!(f, "{}://{}", self.scheme, self.host)?;
        }
        if let Some(port) = self.port {
            write!(f, ":{}", port)?;
        }
        Ok(())
    }
}

/// Registered default port for the web schemes.
pub fn default_port(scheme: &str) -> Option<u16> {
    match scheme {
        "http" => Some(80),
        "https" => Some(443),
        _ => None,
    }
}

/// Whether `scheme` is one of the two web schemes.
pub fn is_web_scheme(scheme: &str) -> bool {
    scheme == "http" || scheme == "https"
}

/// Parse an absolute URL into canonical origin components.
///
/// Returns `None` for relative references, URLs without a host and anything
/// the URL parser rejects. Path, query and fragment are ignored.
///
/// # Example
///
/// ```rust
/// use reasonkit_cors::policy::normalize;
///
/// let a = normalize("HTTPS://Example.COM:443/").unwrap();
/// let b = normalize("https://example.com").unwrap();
/// assert_eq!(a, b);
/// assert_eq!(a.to_string(), "https://example.com");
/// ```
pub fn normalize(raw: &str) -> Option<OriginComponents> {
    let url = Url::parse(raw.trim()).ok()?;

    let host = match url.host()? {
        Host::Domain(domain) if domain.is_empty() => return None,
        Host::Domain(domain) => domain.to_string(),
        Host::Ipv4(addr) => addr.to_string(),
        Host::Ipv6(addr) => addr.to_string(),
    };

    Some(OriginComponents::new(url.scheme(), &host, url.port()))
}

/// Whether `raw` starts with a `scheme://` prefix.
pub fn has_scheme(raw: &str) -> bool {
    static SCHEME_PREFIX: OnceLock<Regex> = OnceLock::new();
    SCHEME_PREFIX
        .get_or_init(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*://").expect("valid scheme regex"))
        .is_match(raw.trim())
}

/// Whether `host` is a loopback or link-local development address.
///
/// Accepts IPv6 hosts with or without brackets.
pub fn is_local_address(host: &str) -> bool {
    let host = host.to_ascii_lowercase();
    let host = host.trim_start_matches('[').trim_end_matches(']');

    is_loopback_family(host) || host.ends_with(".local") || host.ends_with(".localhost")
}

/// Whether `host` belongs to the loopback family (`localhost`, `127.0.0.1`,
/// `0.0.0.0`, `::1`).
pub fn is_loopback_family(host: &str) -> bool {
    let host = host.trim_start_matches('[').trim_end_matches(']');
    LOOPBACK_HOSTS
        .iter()
        .any(|candidate| candidate.eq_ignore_ascii_case(host))
}

/// Whether `host` is a dotted-quad IPv4 literal.
pub fn is_ipv4_literal(host: &str) -> bool {
    host.parse::<Ipv4Addr>().is_ok()
}

/// Normalize an administrator-supplied origin entry.
///
/// Entries with a scheme are parsed as-is. Bare `host[:port]` entries get a
/// guessed scheme: both `http` and `https` for local addresses, `https` only
/// for everything else. Every guess that parses is returned.
pub fn normalize_config_entry(entry: &str) -> Vec<OriginComponents> {
    let entry = entry.trim();
    if has_scheme(entry) {
        return normalize(entry).into_iter().collect();
    }

    let local = normalize(&format!("http://{}", entry))
        .map(|origin| is_local_address(&origin.host))
        .unwrap_or(false);
    let schemes: &[&str] = if local { &["http", "https"] } else { &["https"] };

    schemes
        .iter()
        .filter_map(|scheme| normalize(&format!("{}://{}", scheme, entry)))
        .collect()
}

/// Normalize the value of an incoming `Origin` header.
///
/// Values carrying a scheme are parsed as-is. Scheme-less values are tried
/// as-is, then with `https://`, then with `http://` prepended; the first
/// interpretation that yields a host wins.
pub fn normalize_request_origin(value: &str) -> Option<OriginComponents> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if has_scheme(value) {
        return normalize(value);
    }

    normalize(value)
        .or_else(|| normalize(&format!("https://{}", value)))
        .or_else(|| normalize(&format!("http://{}", value)))
}
