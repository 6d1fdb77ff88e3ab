//! OpenAI adapter
//!
//! Also hosts the shared OpenAI-compatible request/response translation
//! reused by the DeepSeek, Zhipu and SiliconFlow adapters. The configured
//! `api_base` is the chat completions URL itself; the embeddings URL is
//! derived by rewriting the `/chat/completions` suffix.

use crate::core::types::{ChatReply, EmbedReply, EmbeddingInput, EmbeddingOutput, Message, RequestParams, Usage};
use crate::utils::error::{Error, Result};
use serde_json::{json, Value};

use super::{Endpoint, WireRequest};

/// Build an OpenAI chat completion request
pub fn build_chat(endpoint: Endpoint<'_>, messages: &[Message], params: &RequestParams) -> WireRequest {
    compat_chat(endpoint, messages, params)
}

/// Parse an OpenAI chat completion reply
pub fn parse_chat(json: &Value) -> Result<ChatReply> {
    compat_parse_chat(json)
}

/// Build an OpenAI embeddings request
pub fn build_embed(endpoint: Endpoint<'_>, input: &EmbeddingInput, params: &RequestParams) -> WireRequest {
    compat_embed(endpoint, input, params)
}

/// Parse an OpenAI embeddings reply
pub fn parse_embed(input: &EmbeddingInput, json: &Value) -> Result<EmbedReply> {
    compat_parse_embed(input, json)
}

/// OpenAI-compatible chat request: POST to `api_base` with a Bearer key
pub(super) fn compat_chat(
    endpoint: Endpoint<'_>,
    messages: &[Message],
    params: &RequestParams,
) -> WireRequest {
    let mut body = json!({
        "model": endpoint.model,
        "messages": messages,
        "stream": false,
    });
    if let Some(temperature) = params.temperature {
        body["temperature"] = json!(temperature);
    }
    if let Some(max_tokens) = params.max_tokens {
        body["max_tokens"] = json!(max_tokens);
    }
    if let Some(top_p) = params.top_p {
        body["top_p"] = json!(top_p);
    }
    params.apply_extra(&mut body);

    WireRequest {
        url: endpoint.api_base.to_string(),
        headers: bearer_headers(endpoint.api_key),
        body,
    }
}

/// OpenAI-compatible embeddings request
pub(super) fn compat_embed(
    endpoint: Endpoint<'_>,
    input: &EmbeddingInput,
    params: &RequestParams,
) -> WireRequest {
    let mut body = json!({
        "model": endpoint.model,
        "input": input.to_value(),
        "encoding_format": params.encoding_format.as_deref().unwrap_or("float"),
    });
    params.apply_extra(&mut body);

    WireRequest {
        url: embeddings_url(endpoint.api_base),
        headers: bearer_headers(endpoint.api_key),
        body,
    }
}

/// Extract `choices[0].message.content` and usage
pub(super) fn compat_parse_chat(json: &Value) -> Result<ChatReply> {
    let text = json
        .get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(|content| content.as_str())
        .ok_or_else(|| Error::UpstreamFormat("missing choices[0].message.content".to_string()))?;

    Ok(ChatReply { text: text.to_string(), usage: parse_usage(json) })
}

/// Extract `data[i].embedding`, realigned by the `index` field
pub(super) fn compat_parse_embed(input: &EmbeddingInput, json: &Value) -> Result<EmbedReply> {
    let data = json
        .get("data")
        .and_then(|data| data.as_array())
        .ok_or_else(|| Error::UpstreamFormat("missing data array".to_string()))?;

    let mut vectors: Vec<(usize, Vec<f32>)> = Vec::with_capacity(data.len());
    for (position, item) in data.iter().enumerate() {
        let index = item
            .get("index")
            .and_then(|index| index.as_u64())
            .map(|index| index as usize)
            .unwrap_or(position);
        let vector = item
            .get("embedding")
            .and_then(|embedding| embedding.as_array())
            .ok_or_else(|| Error::UpstreamFormat(format!("missing data[{}].embedding", position)))?
            .iter()
            .map(|value| value.as_f64().unwrap_or(0.0) as f32)
            .collect();
        vectors.push((index, vector));
    }
    vectors.sort_by_key(|(index, _)| *index);

    let usage = parse_usage(json);
    let output = match input {
        EmbeddingInput::Single(_) => {
            let vector = vectors
                .into_iter()
                .next()
                .map(|(_, vector)| vector)
                .ok_or_else(|| Error::UpstreamFormat("empty data array".to_string()))?;
            EmbeddingOutput::Single(vector)
        }
        EmbeddingInput::Batch(texts) => {
            if vectors.len() != texts.len() {
                return Err(Error::UpstreamFormat(format!(
                    "expected {} embeddings, got {}",
                    texts.len(),
                    vectors.len()
                )));
            }
            EmbeddingOutput::Batch(vectors.into_iter().map(|(_, vector)| vector).collect())
        }
    };

    Ok(EmbedReply { output, usage })
}

/// Usage block shared by every OpenAI-compatible reply
pub(super) fn parse_usage(json: &Value) -> Usage {
    json.get("usage")
        .cloned()
        .and_then(|usage| serde_json::from_value(usage).ok())
        .unwrap_or_default()
}

/// `Authorization: Bearer` plus JSON content type
pub(super) fn bearer_headers(api_key: &str) -> Vec<(&'static str, String)> {
    vec![
        ("Authorization", format!("Bearer {}", api_key)),
        ("Content-Type", "application/json".to_string()),
    ]
}

/// Rewrite the configured chat URL into the embeddings URL
pub(super) fn embeddings_url(api_base: &str) -> String {
    if api_base.contains("/chat/completions") {
        api_base.replace("/chat/completions", "/embeddings")
    } else {
        format!("{}/embeddings", api_base.trim_end_matches('/'))
    }
}
