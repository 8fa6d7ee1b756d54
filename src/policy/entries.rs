//! Allowed-origin configuration values.
//!
//! Administrators supply origins either as one delimited string
//! (`"https://a.example, https://b.example"`) or as a list of strings. Both
//! shapes deserialize into [`OriginConfig`] and are flattened by
//! [`parse_entries`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Raw allowed-origin configuration as supplied by the operator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OriginConfig {
    /// Nothing configured
    #[default]
    Unset,
    /// Entries separated by commas and/or whitespace
    Delimited(String),
    /// One entry per item; non-string items are ignored
    List(Vec<Value>),
    /// Any other value (numbers, objects, ...); contributes no entries
    Other(Value),
}

impl OriginConfig {
    /// Whether this configuration yields no entries.
    pub fn is_empty(&self) -> bool {
        parse_entries(self).is_empty()
    }
}

impl From<&str> for OriginConfig {
    fn from(value: &str) -> Self {
        OriginConfig::Delimited(value.to_string())
    }
}

impl From<String> for OriginConfig {
    fn from(value: String) -> Self {
        OriginConfig::Delimited(value)
    }
}

impl From<Vec<String>> for OriginConfig {
    fn from(values: Vec<String>) -> Self {
        OriginConfig::List(values.into_iter().map(Value::String).collect())
    }
}

impl From<Vec<&str>> for OriginConfig {
    fn from(values: Vec<&str>) -> Self {
        OriginConfig::List(values.into_iter().map(|v| Value::String(v.to_string())).collect())
    }
}

impl<const N: usize> From<[&str; N]> for OriginConfig {
    fn from(values: [&str; N]) -> Self {
        OriginConfig::from(values.to_vec())
    }
}

/// Flatten a configuration value into trimmed, non-empty entries.
///
/// # Example
///
/// ```rust
/// use reasonkit_cors::policy::{parse_entries, OriginConfig};
///
/// let entries = parse_entries(&OriginConfig::from("https://a.example,, https://b.example\n"));
/// assert_eq!(entries, vec!["https://a.example", "https://b.example"]);
/// ```
pub fn parse_entries(config: &OriginConfig) -> Vec<String> {
    match config {
        OriginConfig::Delimited(raw) => raw
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|entry| !entry.is_empty())
            .map(str::to_string)
            .collect(),
        OriginConfig::List(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(str::to_string)
            .collect(),
        OriginConfig::Unset | OriginConfig::Other(_) => Vec::new(),
    }
}
