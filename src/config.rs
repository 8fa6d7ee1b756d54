//! Policy configuration loading.
//!
//! Settings come from environment variables or a JSON file:
//!
//! - `REASONKIT_CORS_ORIGINS`: allowed origins, comma and/or whitespace separated
//! - `REASONKIT_CORS_ADDITIONAL_ORIGINS`: extra origins merged after the primary list
//! - `REASONKIT_CORS_DEV_ORIGINS`: `true`/`false`, overrides development aliasing
//! - `REASONKIT_CORS_DEV_PORTS`: development port hints, e.g. `3000,5173`
//! - `REASONKIT_CORS_WWW_ALIASES`: `true`/`false`, `www` ⇄ apex aliasing (default: true)
//! - `REASONKIT_ENV`: `production` disables development aliasing by default
//!
//! # Example JSON
//!
//! ```json
//! {
//!   "origins": ["https://app.example.com", "https://*.partners.example.com"],
//!   "include_www_aliases": false,
//!   "development_port_hints": [3000, 5173]
//! }
//! ```

use std::env;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ConfigError, Result};
use crate::policy::{OriginConfig, OriginPolicy, PolicyOptions};

/// Allowed origins
pub const ENV_ORIGINS: &str = "REASONKIT_CORS_ORIGINS";
/// Additional allowed origins
pub const ENV_ADDITIONAL_ORIGINS: &str = "REASONKIT_CORS_ADDITIONAL_ORIGINS";
/// Development aliasing override
pub const ENV_DEV_ORIGINS: &str = "REASONKIT_CORS_DEV_ORIGINS";
/// Development port hints
pub const ENV_DEV_PORTS: &str = "REASONKIT_CORS_DEV_PORTS";
/// `www` aliasing toggle
pub const ENV_WWW_ALIASES: &str = "REASONKIT_CORS_WWW_ALIASES";
/// Runtime environment name
pub const ENV_RUNTIME: &str = "REASONKIT_ENV";

/// Operator-facing policy configuration.
///
/// Unset options fall back to the environment-dependent defaults of
/// [`PolicyOptions`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyConfig {
    /// Allowed origins
    #[serde(default)]
    pub origins: OriginConfig,

    /// Origins merged after `origins`
    #[serde(default)]
    pub additional_origins: OriginConfig,

    /// Development aliasing; defaults to "not production"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_development_origins: Option<bool>,

    /// Development port hints; defaults to common front-end ports
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub development_port_hints: Option<Vec<u16>>,

    /// `www` aliasing; defaults to true
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_www_aliases: Option<bool>,
}

impl PolicyConfig {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a boolean or port variable is malformed.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let origins = lookup(ENV_ORIGINS)
            .map(OriginConfig::Delimited)
            .unwrap_or_default();
        let additional_origins = lookup(ENV_ADDITIONAL_ORIGINS)
            .map(OriginConfig::Delimited)
            .unwrap_or_default();

        let allow_development_origins = lookup(ENV_DEV_ORIGINS)
            .map(|value| parse_bool(ENV_DEV_ORIGINS, &value))
            .transpose()?;
        let include_www_aliases = lookup(ENV_WWW_ALIASES)
            .map(|value| parse_bool(ENV_WWW_ALIASES, &value))
            .transpose()?;
        let development_port_hints = lookup(ENV_DEV_PORTS)
            .map(|value| parse_port_hints(&value))
            .transpose()?;

        debug!(
            origins_set = !origins.is_empty(),
            ?allow_development_origins,
            ?include_www_aliases,
            "Loaded CORS configuration from environment"
        );

        Ok(Self {
            origins,
            additional_origins,
            allow_development_origins,
            development_port_hints,
            include_www_aliases,
        })
    }

    /// Load configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::FileRead`] if the file cannot be read and a JSON
    /// error if it does not match the schema.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        let config: Self = serde_json::from_str(&raw)?;
        info!(path = %path.display(), "Loaded CORS configuration file");
        Ok(config)
    }

    /// Replace the primary origin list.
    pub fn with_origins(mut self, origins: impl Into<OriginConfig>) -> Self {
        self.origins = origins.into();
        self
    }

    /// Resolve unset options against the runtime environment.
    pub fn options(&self) -> PolicyOptions {
        self.options_for(is_production())
    }

    /// Resolve unset options for an explicit production flag.
    pub fn options_for(&self, production: bool) -> PolicyOptions {
        let mut options = PolicyOptions::for_environment(production)
            .with_additional_origins(self.additional_origins.clone());

        if let Some(allow) = self.allow_development_origins {
            options = options.with_development_origins(allow);
        }
        if let Some(ports) = &self.development_port_hints {
            options = options.with_port_hints(ports.clone());
        }
        if let Some(include) = self.include_www_aliases {
            options = options.with_www_aliases(include);
        }

        options
    }

    /// Build the origin policy described by this configuration.
    pub fn build_policy(&self) -> OriginPolicy {
        OriginPolicy::build(&self.origins, &self.options())
    }
}

/// Whether the runtime is flagged as production (`REASONKIT_ENV=production`).
pub fn is_production() -> bool {
    env::var(ENV_RUNTIME)
        .map(|value| is_production_name(&value))
        .unwrap_or(false)
}

fn is_production_name(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "production" | "prod")
}

/// Parse the socket address the diagnostics server binds to.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidBindAddress`] if `host` is not an IP address.
pub fn socket_addr(host: &str, port: u16) -> Result<SocketAddr> {
    let ip: IpAddr = host
        .parse()
        .map_err(|_| ConfigError::InvalidBindAddress(host.to_string()))?;
    Ok(SocketAddr::new(ip, port))
}

fn parse_bool(var: &str, value: &str) -> std::result::Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            var: var.to_string(),
            value: value.to_string(),
        }),
    }
}

fn parse_port_hints(value: &str) -> std::result::Result<Vec<u16>, ConfigError> {
    value
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(|part| match part.parse::<u16>() {
            Ok(port) if port > 0 => Ok(port),
            _ => Err(ConfigError::InvalidPortHint(part.to_string())),
        })
        .collect()
}
