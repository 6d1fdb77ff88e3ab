//! Provider adapter layer
//!
//! One adapter per upstream family. Adapters are pure translation: they
//! build the wire request for a logical call and parse the upstream JSON
//! into a normalized reply. All live state (rate windows, counters,
//! circuit flags) lives in [`instance::ProviderInstance`]; adapters are
//! stateless and never retry.

pub mod anthropic;
pub mod deepseek;
pub mod google;
pub mod instance;
pub mod openai;
pub mod pool;
pub mod siliconflow;
pub mod zhipu;

pub use instance::{InstanceStats, ProviderInstance};
pub use pool::ProviderPool;

use crate::core::types::{ChatReply, EmbedReply, EmbeddingInput, Message, RequestKind, RequestParams};
use crate::utils::error::Result;
use serde_json::Value;
use std::fmt;

/// Upstream API family sharing a single adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProviderFamily {
    /// OpenAI-compatible chat and embeddings
    OpenAi,
    /// Zhipu GLM, OpenAI-compatible chat and embeddings
    Zhipu,
    /// Anthropic messages API, chat only
    Anthropic,
    /// Google Gemini generateContent / embedContent
    Google,
    /// DeepSeek, OpenAI-compatible chat only
    DeepSeek,
    /// SiliconFlow, OpenAI-compatible chat and embeddings
    SiliconFlow,
}

impl ProviderFamily {
    /// All known families, in a stable order
    pub const ALL: [ProviderFamily; 6] = [
        ProviderFamily::OpenAi,
        ProviderFamily::Zhipu,
        ProviderFamily::Anthropic,
        ProviderFamily::Google,
        ProviderFamily::DeepSeek,
        ProviderFamily::SiliconFlow,
    ];

    /// The name used in configuration files
    pub fn config_name(&self) -> &'static str {
        match self {
            ProviderFamily::OpenAi => "openai",
            ProviderFamily::Zhipu => "zhipu",
            ProviderFamily::Anthropic => "anthropic",
            ProviderFamily::Google => "google",
            ProviderFamily::DeepSeek => "deepseek",
            ProviderFamily::SiliconFlow => "siliconflow",
        }
    }

    /// Resolve a configuration name to a family
    pub fn from_config_name(name: &str) -> Option<ProviderFamily> {
        ProviderFamily::ALL
            .iter()
            .copied()
            .find(|family| family.config_name() == name)
    }

    /// Whether this family can serve the given request kind
    pub fn supports(&self, kind: RequestKind) -> bool {
        match kind {
            RequestKind::Chat => true,
            RequestKind::Embed => !matches!(self, ProviderFamily::Anthropic | ProviderFamily::DeepSeek),
        }
    }
}

impl fmt::Display for ProviderFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.config_name())
    }
}

/// Endpoint coordinates for one provider instance
#[derive(Debug, Clone, Copy)]
pub struct Endpoint<'a> {
    /// API key
    pub api_key: &'a str,
    /// Base URL as configured
    pub api_base: &'a str,
    /// Model identifier
    pub model: &'a str,
}

/// A fully built upstream HTTP request (always POST)
#[derive(Debug, Clone)]
pub struct WireRequest {
    /// Target URL
    pub url: String,
    /// Headers to attach
    pub headers: Vec<(&'static str, String)>,
    /// JSON body
    pub body: Value,
}

/// Build the wire request for a chat completion
pub fn build_chat(
    family: ProviderFamily,
    endpoint: Endpoint<'_>,
    messages: &[Message],
    params: &RequestParams,
) -> WireRequest {
    match family {
        ProviderFamily::OpenAi => openai::build_chat(endpoint, messages, params),
        ProviderFamily::Zhipu => zhipu::build_chat(endpoint, messages, params),
        ProviderFamily::Anthropic => anthropic::build_chat(endpoint, messages, params),
        ProviderFamily::Google => google::build_chat(endpoint, messages, params),
        ProviderFamily::DeepSeek => deepseek::build_chat(endpoint, messages, params),
        ProviderFamily::SiliconFlow => siliconflow::build_chat(endpoint, messages, params),
    }
}

/// Parse an upstream chat completion reply
pub fn parse_chat(family: ProviderFamily, json: &Value) -> Result<ChatReply> {
    match family {
        ProviderFamily::OpenAi => openai::parse_chat(json),
        ProviderFamily::Zhipu => zhipu::parse_chat(json),
        ProviderFamily::Anthropic => anthropic::parse_chat(json),
        ProviderFamily::Google => google::parse_chat(json),
        ProviderFamily::DeepSeek => deepseek::parse_chat(json),
        ProviderFamily::SiliconFlow => siliconflow::parse_chat(json),
    }
}

/// Build the wire request for an embedding call
///
/// Fails for families without embedding support; the balancer filters those
/// out during selection, so this is a backstop.
pub fn build_embed(
    family: ProviderFamily,
    endpoint: Endpoint<'_>,
    input: &EmbeddingInput,
    params: &RequestParams,
) -> Result<WireRequest> {
    match family {
        ProviderFamily::OpenAi => Ok(openai::build_embed(endpoint, input, params)),
        ProviderFamily::Zhipu => Ok(zhipu::build_embed(endpoint, input, params)),
        ProviderFamily::Google => Ok(google::build_embed(endpoint, input, params)),
        ProviderFamily::SiliconFlow => Ok(siliconflow::build_embed(endpoint, input, params)),
        ProviderFamily::Anthropic | ProviderFamily::DeepSeek => {
            Err(crate::utils::error::Error::Config(format!(
                "Provider family {} does not support embeddings",
                family
            )))
        }
    }
}

/// Parse an upstream embedding reply
pub fn parse_embed(
    family: ProviderFamily,
    input: &EmbeddingInput,
    json: &Value,
) -> Result<EmbedReply> {
    match family {
        ProviderFamily::OpenAi => openai::parse_embed(input, json),
        ProviderFamily::Zhipu => zhipu::parse_embed(input, json),
        ProviderFamily::Google => google::parse_embed(input, json),
        ProviderFamily::SiliconFlow => siliconflow::parse_embed(input, json),
        ProviderFamily::Anthropic | ProviderFamily::DeepSeek => {
            Err(crate::utils::error::Error::UpstreamFormat(format!(
                "No embedding schema for family {}",
                family
            )))
        }
    }
}
