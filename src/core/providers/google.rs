//! Google Gemini adapter
//!
//! The model id is part of the URL path and the API key travels as a query
//! parameter. Chat uses `contents`/`parts`; embeddings use `embedContent`
//! for a single text and `batchEmbedContents` for a list.

use crate::core::types::{
    ChatReply, EmbedReply, EmbeddingInput, EmbeddingOutput, Message, MessageRole, RequestParams, Usage,
};
use crate::utils::error::{Error, Result};
use serde_json::{json, Value};

use super::{Endpoint, WireRequest};

/// Build a Gemini generateContent request
pub fn build_chat(endpoint: Endpoint<'_>, messages: &[Message], params: &RequestParams) -> WireRequest {
    let contents: Vec<Value> = messages
        .iter()
        .map(|message| {
            let role = match message.role {
                MessageRole::User | MessageRole::System => "user",
                MessageRole::Assistant => "model",
            };
            json!({
                "role": role,
                "parts": [{"text": message.content}],
            })
        })
        .collect();

    let mut body = json!({ "contents": contents });

    let mut generation_config = json!({});
    if let Some(temperature) = params.temperature {
        generation_config["temperature"] = json!(temperature);
    }
    if let Some(max_tokens) = params.max_tokens {
        generation_config["maxOutputTokens"] = json!(max_tokens);
    }
    if let Some(top_p) = params.top_p {
        generation_config["topP"] = json!(top_p);
    }
    if !generation_config.as_object().map(|c| c.is_empty()).unwrap_or(true) {
        body["generationConfig"] = generation_config;
    }
    params.apply_extra(&mut body);

    WireRequest {
        url: model_url(endpoint, "generateContent"),
        headers: vec![("Content-Type", "application/json".to_string())],
        body,
    }
}

/// Parse a Gemini generateContent reply
pub fn parse_chat(json: &Value) -> Result<ChatReply> {
    let text = json
        .get("candidates")
        .and_then(|candidates| candidates.get(0))
        .and_then(|candidate| candidate.get("content"))
        .and_then(|content| content.get("parts"))
        .and_then(|parts| parts.get(0))
        .and_then(|part| part.get("text"))
        .and_then(|text| text.as_str())
        .ok_or_else(|| Error::UpstreamFormat("missing candidates[0].content.parts[0].text".to_string()))?;

    let usage = json
        .get("usageMetadata")
        .map(|metadata| Usage {
            prompt_tokens: metadata.get("promptTokenCount").and_then(|v| v.as_u64()).unwrap_or(0),
            completion_tokens: metadata.get("candidatesTokenCount").and_then(|v| v.as_u64()).unwrap_or(0),
            total_tokens: metadata.get("totalTokenCount").and_then(|v| v.as_u64()).unwrap_or(0),
        })
        .unwrap_or_default();

    Ok(ChatReply { text: text.to_string(), usage })
}

/// Build a Gemini embedContent / batchEmbedContents request
pub fn build_embed(endpoint: Endpoint<'_>, input: &EmbeddingInput, params: &RequestParams) -> WireRequest {
    let (operation, mut body) = match input {
        EmbeddingInput::Single(text) => (
            "embedContent",
            json!({
                "model": format!("models/{}", endpoint.model),
                "content": {"parts": [{"text": text}]},
            }),
        ),
        EmbeddingInput::Batch(texts) => {
            let requests: Vec<Value> = texts
                .iter()
                .map(|text| {
                    json!({
                        "model": format!("models/{}", endpoint.model),
                        "content": {"parts": [{"text": text}]},
                    })
                })
                .collect();
            ("batchEmbedContents", json!({ "requests": requests }))
        }
    };
    params.apply_extra(&mut body);

    WireRequest {
        url: model_url(endpoint, operation),
        headers: vec![("Content-Type", "application/json".to_string())],
        body,
    }
}

/// Parse a Gemini embedding reply
///
/// The embeddings API reports no token usage; counts stay at zero.
pub fn parse_embed(input: &EmbeddingInput, json: &Value) -> Result<EmbedReply> {
    let output = match input {
        EmbeddingInput::Single(_) => {
            let values = json
                .get("embedding")
                .and_then(|embedding| embedding.get("values"))
                .and_then(|values| values.as_array())
                .ok_or_else(|| Error::UpstreamFormat("missing embedding.values".to_string()))?;
            EmbeddingOutput::Single(to_vector(values))
        }
        EmbeddingInput::Batch(texts) => {
            let embeddings = json
                .get("embeddings")
                .and_then(|embeddings| embeddings.as_array())
                .ok_or_else(|| Error::UpstreamFormat("missing embeddings array".to_string()))?;
            if embeddings.len() != texts.len() {
                return Err(Error::UpstreamFormat(format!(
                    "expected {} embeddings, got {}",
                    texts.len(),
                    embeddings.len()
                )));
            }
            let vectors = embeddings
                .iter()
                .enumerate()
                .map(|(position, embedding)| {
                    embedding
                        .get("values")
                        .and_then(|values| values.as_array())
                        .map(|values| to_vector(values))
                        .ok_or_else(|| {
                            Error::UpstreamFormat(format!("missing embeddings[{}].values", position))
                        })
                })
                .collect::<Result<Vec<_>>>()?;
            EmbeddingOutput::Batch(vectors)
        }
    };

    Ok(EmbedReply { output, usage: Usage::default() })
}

fn to_vector(values: &[Value]) -> Vec<f32> {
    values.iter().map(|value| value.as_f64().unwrap_or(0.0) as f32).collect()
}

fn model_url(endpoint: Endpoint<'_>, operation: &str) -> String {
    format!(
        "{}/v1/models/{}:{}?key={}",
        endpoint.api_base.trim_end_matches('/'),
        endpoint.model,
        operation,
        endpoint.api_key
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{assistant_message, system_message, user_message};

    fn endpoint() -> Endpoint<'static> {
        Endpoint {
            api_key: "g-key",
            api_base: "https://generativelanguage.googleapis.com",
            model: "gemini-1.5-flash",
        }
    }

    #[test]
    fn chat_url_carries_model_and_key() {
        let request = build_chat(endpoint(), &[user_message("hi")], &RequestParams::default());
        assert_eq!(
            request.url,
            "https://generativelanguage.googleapis.com/v1/models/gemini-1.5-flash:generateContent?key=g-key"
        );
        assert!(request.body.get("generationConfig").is_none());
    }

    #[test]
    fn roles_map_to_user_and_model() {
        let messages = vec![system_message("rules"), user_message("q"), assistant_message("a")];
        let request = build_chat(endpoint(), &messages, &RequestParams::default());
        let contents = request.body["contents"].as_array().unwrap();
        assert_eq!(contents[0]["role"], "user");
        assert_eq!(contents[1]["role"], "user");
        assert_eq!(contents[2]["role"], "model");
        assert_eq!(contents[1]["parts"][0]["text"], "q");
    }

    #[test]
    fn generation_config_only_when_set() {
        let params = RequestParams { max_tokens: Some(100), ..Default::default() };
        let request = build_chat(endpoint(), &[user_message("hi")], &params);
        assert_eq!(request.body["generationConfig"]["maxOutputTokens"], 100);
    }

    #[test]
    fn single_embed_shape() {
        let request = build_embed(endpoint(), &EmbeddingInput::from("text"), &RequestParams::default());
        assert!(request.url.ends_with(":embedContent?key=g-key"));
        assert_eq!(request.body["model"], "models/gemini-1.5-flash");
        assert_eq!(request.body["content"]["parts"][0]["text"], "text");
    }

    #[test]
    fn batch_embed_shape_and_parse() {
        let input = EmbeddingInput::Batch(vec!["a".to_string(), "b".to_string()]);
        let request = build_embed(endpoint(), &input, &RequestParams::default());
        assert!(request.url.ends_with(":batchEmbedContents?key=g-key"));
        assert_eq!(request.body["requests"].as_array().unwrap().len(), 2);

        let reply = parse_embed(
            &input,
            &serde_json::json!({"embeddings": [{"values": [1.0]}, {"values": [2.0]}]}),
        )
        .unwrap();
        assert_eq!(reply.output, EmbeddingOutput::Batch(vec![vec![1.0], vec![2.0]]));
    }

    #[test]
    fn parse_chat_reply() {
        let json = serde_json::json!({
            "candidates": [{"content": {"parts": [{"text": "pong"}], "role": "model"}}],
            "usageMetadata": {"promptTokenCount": 4, "candidatesTokenCount": 1, "totalTokenCount": 5}
        });
        let reply = parse_chat(&json).unwrap();
        assert_eq!(reply.text, "pong");
        assert_eq!(reply.usage.total_tokens, 5);
    }
}
