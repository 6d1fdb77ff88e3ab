//! DeepSeek adapter
//!
//! OpenAI-compatible chat; no embedding endpoint.

use crate::core::types::{ChatReply, Message, RequestParams};
use crate::utils::error::Result;
use serde_json::Value;

use super::{openai, Endpoint, WireRequest};

/// Build a DeepSeek chat completion request
pub fn build_chat(endpoint: Endpoint<'_>, messages: &[Message], params: &RequestParams) -> WireRequest {
    openai::compat_chat(endpoint, messages, params)
}

/// Parse a DeepSeek chat completion reply
pub fn parse_chat(json: &Value) -> Result<ChatReply> {
    openai::compat_parse_chat(json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::user_message;
    use serde_json::json;

    #[test]
    fn chat_goes_to_configured_base() {
        let endpoint = Endpoint {
            api_key: "k",
            api_base: "https://api.deepseek.com/chat/completions",
            model: "deepseek-chat",
        };
        let request = build_chat(endpoint, &[user_message("hi")], &RequestParams::default());
        assert_eq!(request.url, "https://api.deepseek.com/chat/completions");
        assert_eq!(request.body["model"], "deepseek-chat");
        assert_eq!(request.body["stream"], json!(false));
    }
}
