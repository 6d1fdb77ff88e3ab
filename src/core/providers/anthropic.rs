//! Anthropic adapter
//!
//! Distinct messages schema: system turns are lifted into a top-level
//! `system` field, `max_tokens` is mandatory, and every request carries the
//! `anthropic-version` header. No embedding endpoint.

use crate::core::types::{ChatReply, Message, MessageRole, RequestParams, Usage};
use crate::utils::error::{Error, Result};
use serde_json::{json, Value};

use super::{Endpoint, WireRequest};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Build an Anthropic messages request
pub fn build_chat(endpoint: Endpoint<'_>, messages: &[Message], params: &RequestParams) -> WireRequest {
    let mut system_parts: Vec<&str> = Vec::new();
    let mut turns: Vec<Value> = Vec::new();
    for message in messages {
        match message.role {
            MessageRole::System => system_parts.push(&message.content),
            MessageRole::User | MessageRole::Assistant => {
                turns.push(json!({
                    "role": message.role,
                    "content": message.content,
                }));
            }
        }
    }

    let mut body = json!({
        "model": endpoint.model,
        "max_tokens": params.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        "messages": turns,
    });
    if !system_parts.is_empty() {
        body["system"] = json!(system_parts.join("\n\n"));
    }
    if let Some(temperature) = params.temperature {
        body["temperature"] = json!(temperature);
    }
    if let Some(top_p) = params.top_p {
        body["top_p"] = json!(top_p);
    }
    params.apply_extra(&mut body);

    WireRequest {
        url: format!("{}/v1/messages", endpoint.api_base.trim_end_matches('/')),
        headers: vec![
            ("x-api-key", endpoint.api_key.to_string()),
            ("anthropic-version", ANTHROPIC_VERSION.to_string()),
            ("Content-Type", "application/json".to_string()),
        ],
        body,
    }
}

/// Parse an Anthropic messages reply
pub fn parse_chat(json: &Value) -> Result<ChatReply> {
    let text = json
        .get("content")
        .and_then(|content| content.get(0))
        .and_then(|block| block.get("text"))
        .and_then(|text| text.as_str())
        .ok_or_else(|| Error::UpstreamFormat("missing content[0].text".to_string()))?;

    let usage = json
        .get("usage")
        .map(|usage| {
            let prompt = usage.get("input_tokens").and_then(|v| v.as_u64()).unwrap_or(0);
            let completion = usage.get("output_tokens").and_then(|v| v.as_u64()).unwrap_or(0);
            Usage {
                prompt_tokens: prompt,
                completion_tokens: completion,
                total_tokens: prompt + completion,
            }
        })
        .unwrap_or_default();

    Ok(ChatReply { text: text.to_string(), usage })
}
