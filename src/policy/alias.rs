//! Alias expansion over the exact-origin set.
//!
//! Two additive passes run after the configured literals are collected:
//!
//! - **Development aliases**: a configured loopback origin such as
//!   `http://localhost:3000` also admits `127.0.0.1`, `0.0.0.0` and `[::1]`,
//!   both web schemes, and the common front-end dev ports.
//! - **`www` aliases**: `https://example.com` admits `https://www.example.com`
//!   and vice versa. Deeper subdomains are never bridged.
//!
//! Both passes are idempotent: running them again adds nothing.

use std::collections::BTreeSet;

use tracing::debug;

use super::origin::{
    is_ipv4_literal, is_local_address, is_loopback_family, normalize, OriginComponents,
    LOOPBACK_HOSTS,
};

/// Ports commonly used by front-end dev servers (CRA, Vite, Angular, ...).
pub const DEFAULT_DEVELOPMENT_PORTS: [u16; 9] =
    [3000, 3001, 4173, 4200, 5000, 5173, 5174, 8000, 8080];

/// Which alias passes run and with which port hints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasOptions {
    /// Run the development alias pass
    pub allow_development_origins: bool,
    /// Extra ports tried for local web origins
    pub development_port_hints: Vec<u16>,
    /// Run the `www` ⇄ apex pass
    pub include_www_aliases: bool,
}

impl Default for AliasOptions {
    fn default() -> Self {
        Self {
            allow_development_origins: true,
            development_port_hints: DEFAULT_DEVELOPMENT_PORTS.to_vec(),
            include_www_aliases: true,
        }
    }
}

/// Run the enabled passes over `origins`, development aliases first.
pub fn expand(origins: &mut BTreeSet<String>, options: &AliasOptions) {
    if options.allow_development_origins {
        expand_development_aliases(origins, &options.development_port_hints);
    }
    if options.include_www_aliases {
        expand_www_aliases(origins);
    }
}

/// Add loopback host, scheme and port variants of every local origin.
pub fn expand_development_aliases(origins: &mut BTreeSet<String>, port_hints: &[u16]) {
    let local: Vec<OriginComponents> = origins
        .iter()
        .filter_map(|origin| normalize(origin))
        .filter(|origin| is_local_address(&origin.host))
        .collect();

    let before = origins.len();
    for origin in &local {
        for alias in development_aliases(origin, port_hints) {
            origins.insert(alias.to_string());
        }
    }

    debug!(
        local_origins = local.len(),
        added = origins.len() - before,
        "Expanded development origin aliases"
    );
}

/// Add the `www.` counterpart of apex origins and the apex of `www.` origins.
pub fn expand_www_aliases(origins: &mut BTreeSet<String>) {
    let aliases: Vec<String> = origins
        .iter()
        .filter_map(|origin| normalize(origin))
        .filter_map(|origin| www_alias(&origin))
        .map(|alias| alias.to_string())
        .collect();

    let before = origins.len();
    origins.extend(aliases);

    debug!(added = origins.len() - before, "Expanded www origin aliases");
}

fn development_aliases(origin: &OriginComponents, port_hints: &[u16]) -> Vec<OriginComponents> {
    let hosts: Vec<&str> = if is_loopback_family(&origin.host) {
        LOOPBACK_HOSTS.to_vec()
    } else {
        vec![origin.host.as_str()]
    };

    let schemes: Vec<&str> = if origin.is_web() {
        vec!["http", "https"]
    } else {
        vec![origin.scheme.as_str()]
    };

    let ports: Vec<Option<u16>> = if origin.is_web() {
        std::iter::once(None)
            .chain(port_hints.iter().filter(|p| **p > 0).map(|p| Some(*p)))
            .chain(origin.port.map(Some))
            .collect()
    } else {
        vec![origin.port]
    };

    let mut aliases = Vec::with_capacity(hosts.len() * schemes.len() * ports.len());
    for host in &hosts {
        for scheme in &schemes {
            for port in &ports {
                aliases.push(OriginComponents::new(scheme, host, *port));
            }
        }
    }
    aliases
}

fn www_alias(origin: &OriginComponents) -> Option<OriginComponents> {
    let host = origin.host.as_str();
    if is_local_address(host) || is_ipv4_literal(host) || host.contains(':') {
        return None;
    }

    let alias_host = match host.strip_prefix("www.") {
        Some(apex) if apex.split('.').count() >= 2 => apex.to_string(),
        Some(_) => return None,
        None if host.split('.').count() == 2 => format!("www.{}", host),
        None => return None,
    };

    Some(OriginComponents::new(&origin.scheme, &alias_host, origin.port))
}
