//! Logical request types
//!
//! A logical request is provider-neutral; the adapter layer translates it
//! into each upstream's wire shape.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Role of a chat turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System instruction
    System,
    /// End-user turn
    User,
    /// Model turn
    Assistant,
}

/// One ordered chat turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Turn role
    pub role: MessageRole,
    /// Turn text
    pub content: String,
}

/// Build a system message
pub fn system_message(content: impl Into<String>) -> Message {
    Message { role: MessageRole::System, content: content.into() }
}

/// Build a user message
pub fn user_message(content: impl Into<String>) -> Message {
    Message { role: MessageRole::User, content: content.into() }
}

/// Build an assistant message
pub fn assistant_message(content: impl Into<String>) -> Message {
    Message { role: MessageRole::Assistant, content: content.into() }
}

/// Kind of upstream operation an adapter is asked to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// Chat completion (also backs `generate`)
    Chat,
    /// Text embedding
    Embed,
}

/// Recognized per-call parameters plus a vendor pass-through map
///
/// Recognized parameters are forwarded where the upstream accepts them;
/// everything in `extra` is merged into the request body last.
#[derive(Debug, Clone, Default)]
pub struct RequestParams {
    /// Sampling temperature
    pub temperature: Option<f64>,
    /// Completion token cap
    pub max_tokens: Option<u32>,
    /// Nucleus sampling mass
    pub top_p: Option<f64>,
    /// Embedding encoding format (`float` when unset)
    pub encoding_format: Option<String>,
    /// Vendor-specific extras, forwarded transparently
    pub extra: Map<String, Value>,
}

impl RequestParams {
    /// Merge the pass-through extras into an already-built JSON body
    pub(crate) fn apply_extra(&self, body: &mut Value) {
        if self.extra.is_empty() {
            return;
        }
        if let Some(obj) = body.as_object_mut() {
            for (key, value) in &self.extra {
                obj.insert(key.clone(), value.clone());
            }
        }
    }
}

/// Caller-selected upper bound on dispatch attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPolicy {
    /// At most one additional attempt, on a different instance if possible
    RetryOnce,
    /// Up to N attempts (default 3) with exponential back-off
    Fixed(u32),
    /// Retry until success or cancellation
    Infinite,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::Fixed(3)
    }
}

impl RetryPolicy {
    /// Maximum number of attempts, `None` meaning unbounded
    pub fn max_attempts(&self) -> Option<u32> {
        match self {
            RetryPolicy::RetryOnce => Some(2),
            RetryPolicy::Fixed(n) => Some((*n).max(1)),
            RetryPolicy::Infinite => None,
        }
    }
}

/// Input to an embedding call
#[derive(Debug, Clone, PartialEq)]
pub enum EmbeddingInput {
    /// One text, yielding one vector
    Single(String),
    /// Many texts, yielding vectors in the same order
    Batch(Vec<String>),
}

impl EmbeddingInput {
    /// Number of texts carried
    pub fn len(&self) -> usize {
        match self {
            EmbeddingInput::Single(_) => 1,
            EmbeddingInput::Batch(texts) => texts.len(),
        }
    }

    /// Whether no texts are carried
    pub fn is_empty(&self) -> bool {
        matches!(self, EmbeddingInput::Batch(texts) if texts.is_empty())
    }

    /// The wire value: a string or a list of strings
    pub(crate) fn to_value(&self) -> Value {
        match self {
            EmbeddingInput::Single(text) => Value::String(text.clone()),
            EmbeddingInput::Batch(texts) => {
                Value::Array(texts.iter().cloned().map(Value::String).collect())
            }
        }
    }
}

impl From<&str> for EmbeddingInput {
    fn from(text: &str) -> Self {
        EmbeddingInput::Single(text.to_string())
    }
}

impl From<String> for EmbeddingInput {
    fn from(text: String) -> Self {
        EmbeddingInput::Single(text)
    }
}

impl From<Vec<String>> for EmbeddingInput {
    fn from(texts: Vec<String>) -> Self {
        EmbeddingInput::Batch(texts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn role_serializes_lowercase() {
        let msg = user_message("hi");
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value, json!({"role": "user", "content": "hi"}));
    }

    #[test]
    fn extras_are_merged_last() {
        let mut params = RequestParams::default();
        params.extra.insert("seed".to_string(), json!(7));
        params.extra.insert("stream".to_string(), json!(false));
        let mut body = json!({"model": "m", "stream": false});
        params.apply_extra(&mut body);
        assert_eq!(body["seed"], json!(7));
    }

    #[test]
    fn retry_policy_attempt_bounds() {
        assert_eq!(RetryPolicy::RetryOnce.max_attempts(), Some(2));
        assert_eq!(RetryPolicy::Fixed(3).max_attempts(), Some(3));
        assert_eq!(RetryPolicy::Fixed(0).max_attempts(), Some(1));
        assert_eq!(RetryPolicy::Infinite.max_attempts(), None);
    }

    #[test]
    fn embedding_input_wire_value() {
        assert_eq!(EmbeddingInput::from("a").to_value(), json!("a"));
        let batch = EmbeddingInput::from(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(batch.to_value(), json!(["a", "b"]));
        assert_eq!(batch.len(), 2);
    }
}
