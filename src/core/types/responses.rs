//! Normalized reply types

use serde::{Deserialize, Serialize};

/// Token accounting reported by the upstream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Tokens consumed by the prompt
    #[serde(default)]
    pub prompt_tokens: u64,
    /// Tokens produced by the completion
    #[serde(default)]
    pub completion_tokens: u64,
    /// Total tokens billed
    #[serde(default)]
    pub total_tokens: u64,
}

/// Normalized chat completion reply
#[derive(Debug, Clone, PartialEq)]
pub struct ChatReply {
    /// The assistant's text
    pub text: String,
    /// Token accounting, zeroed when the upstream reports none
    pub usage: Usage,
}

/// Embedding vectors, shaped to match the input
#[derive(Debug, Clone, PartialEq)]
pub enum EmbeddingOutput {
    /// One vector for a single input text
    Single(Vec<f32>),
    /// Vectors aligned with the input order
    Batch(Vec<Vec<f32>>),
}

/// Normalized embedding reply
#[derive(Debug, Clone, PartialEq)]
pub struct EmbedReply {
    /// The vectors
    pub output: EmbeddingOutput,
    /// Token accounting, zeroed when the upstream reports none
    pub usage: Usage,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_defaults_to_zero() {
        let usage: Usage = serde_json::from_str("{}").unwrap();
        assert_eq!(usage.total_tokens, 0);
    }

    #[test]
    fn usage_parses_partial_reports() {
        let usage: Usage = serde_json::from_str(r#"{"prompt_tokens": 10, "total_tokens": 25}"#).unwrap();
        assert_eq!(usage.prompt_tokens, 10);
        assert_eq!(usage.completion_tokens, 0);
        assert_eq!(usage.total_tokens, 25);
    }
}
