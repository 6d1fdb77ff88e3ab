//! Configuration data models

use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::core::providers::ProviderFamily;

/// Default requests-per-minute budget for a key entry
pub(crate) const DEFAULT_RATE_LIMIT: u32 = 20;

/// Default total timeout for one upstream HTTP call
pub(crate) const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// One configured upstream key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderEntry {
    /// Family this key belongs to
    pub family: ProviderFamily,
    /// API key
    pub api_key: String,
    /// Base URL; for OpenAI-compatible families this is the chat URL itself
    pub api_base: String,
    /// Model identifier
    pub model: String,
    /// Requests allowed per rolling 60 s window
    pub rate_limit: u32,
}

/// Resolved client configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Key entries across all enabled families, in declaration order
    pub providers: Vec<ProviderEntry>,
    /// Total timeout for each upstream HTTP call
    pub request_timeout: Duration,
}

/// Raw YAML document
#[derive(Debug, Deserialize)]
pub(crate) struct RawConfig {
    pub(crate) llm: RawLlmSection,
}

/// Raw `llm` section
#[derive(Debug, Deserialize)]
pub(crate) struct RawLlmSection {
    /// Family name, or comma-separated list of family names
    #[serde(rename = "use")]
    pub(crate) enabled: String,
    /// Total timeout in seconds for one upstream call
    #[serde(default)]
    pub(crate) timeout: Option<u64>,
    /// Family name -> key entry or sequence of key entries
    #[serde(flatten)]
    pub(crate) families: HashMap<String, RawEntries>,
}

/// A family's entries: single mapping shorthand or a sequence
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum RawEntries {
    One(RawEntry),
    Many(Vec<RawEntry>),
}

impl RawEntries {
    pub(crate) fn into_vec(self) -> Vec<RawEntry> {
        match self {
            RawEntries::One(entry) => vec![entry],
            RawEntries::Many(entries) => entries,
        }
    }
}

/// One raw key record; additional keys are ignored
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawEntry {
    pub(crate) api_key: String,
    pub(crate) api_base: String,
    pub(crate) model: Option<String>,
    pub(crate) rate_limit: Option<u32>,
}
