//! SiliconFlow adapter
//!
//! OpenAI-compatible chat and embeddings. Batch embeddings come back
//! aligned with the input order.

use crate::core::types::{ChatReply, EmbedReply, EmbeddingInput, Message, RequestParams};
use crate::utils::error::Result;
use serde_json::Value;

use super::{openai, Endpoint, WireRequest};

/// Build a SiliconFlow chat completion request
pub fn build_chat(endpoint: Endpoint<'_>, messages: &[Message], params: &RequestParams) -> WireRequest {
    openai::compat_chat(endpoint, messages, params)
}

/// Parse a SiliconFlow chat completion reply
pub fn parse_chat(json: &Value) -> Result<ChatReply> {
    openai::compat_parse_chat(json)
}

/// Build a SiliconFlow embeddings request
pub fn build_embed(endpoint: Endpoint<'_>, input: &EmbeddingInput, params: &RequestParams) -> WireRequest {
    openai::compat_embed(endpoint, input, params)
}

/// Parse a SiliconFlow embeddings reply
pub fn parse_embed(input: &EmbeddingInput, json: &Value) -> Result<EmbedReply> {
    openai::compat_parse_embed(input, json)
}
