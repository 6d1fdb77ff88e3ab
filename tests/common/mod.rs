//! Shared fixtures for integration tests
#![allow(dead_code)]

use std::time::Duration;

use parallm::{ClientConfig, ProviderEntry, ProviderFamily};
use serde_json::{json, Value};

/// A chat completions entry pointing at a mock server
pub fn entry(family: ProviderFamily, base_uri: &str, rate_limit: u32) -> ProviderEntry {
    ProviderEntry {
        family,
        api_key: "test-key".to_string(),
        api_base: format!("{}/v1/chat/completions", base_uri),
        model: "test-model".to_string(),
        rate_limit,
    }
}

/// Config over the given entries with a short request timeout
pub fn config(providers: Vec<ProviderEntry>) -> ClientConfig {
    ClientConfig { providers, request_timeout: Duration::from_secs(5) }
}

/// An OpenAI-shaped chat completion body
pub fn chat_completion(content: &str, total_tokens: u64) -> Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }],
        "usage": {
            "prompt_tokens": total_tokens / 2,
            "completion_tokens": total_tokens - total_tokens / 2,
            "total_tokens": total_tokens
        }
    })
}
