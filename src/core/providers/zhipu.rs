//! Zhipu GLM adapter
//!
//! OpenAI-compatible chat and embeddings; the embeddings endpoint is the
//! configured chat URL with `/chat/completions` swapped for `/embeddings`.

use crate::core::types::{ChatReply, EmbedReply, EmbeddingInput, Message, RequestParams};
use crate::utils::error::Result;
use serde_json::Value;

use super::{openai, Endpoint, WireRequest};

/// Build a Zhipu chat completion request
pub fn build_chat(endpoint: Endpoint<'_>, messages: &[Message], params: &RequestParams) -> WireRequest {
    openai::compat_chat(endpoint, messages, params)
}

/// Parse a Zhipu chat completion reply
pub fn parse_chat(json: &Value) -> Result<ChatReply> {
    openai::compat_parse_chat(json)
}

/// Build a Zhipu embeddings request
pub fn build_embed(endpoint: Endpoint<'_>, input: &EmbeddingInput, params: &RequestParams) -> WireRequest {
    openai::compat_embed(endpoint, input, params)
}

/// Parse a Zhipu embeddings reply
pub fn parse_embed(input: &EmbeddingInput, json: &Value) -> Result<EmbedReply> {
    openai::compat_parse_embed(input, json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embeddings_path_is_rewritten() {
        let endpoint = Endpoint {
            api_key: "k",
            api_base: "https://open.bigmodel.cn/api/paas/v4/chat/completions",
            model: "embedding-2",
        };
        let request = build_embed(endpoint, &EmbeddingInput::from("text"), &RequestParams::default());
        assert_eq!(request.url, "https://open.bigmodel.cn/api/paas/v4/embeddings");
        assert_eq!(request.body["model"], "embedding-2");
    }
}
