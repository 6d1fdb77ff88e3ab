//! Unified type system for logical requests and normalized replies

pub mod requests;
pub mod responses;

pub use requests::{
    assistant_message, system_message, user_message, EmbeddingInput, Message, MessageRole,
    RequestKind, RequestParams, RetryPolicy,
};
pub use responses::{ChatReply, EmbedReply, EmbeddingOutput, Usage};
