//! # parallm
//!
//! A client-side fan-out layer over pools of LLM API keys. One logical
//! request — chat, generation or embedding — is routed to the healthiest
//! upstream key, dispatched in the provider's native wire shape, and
//! normalized back into a domain value.
//!
//! ## Features
//!
//! - **Key pooling**: many keys per provider family, scored per request by
//!   in-flight load and error history
//! - **Sliding-window rate limits**: per-key request budgets over a rolling
//!   60 s window, enforced before dispatch
//! - **Failover and circuit breaking**: failing keys are retried elsewhere
//!   and disabled after repeated errors; a background probe revives them
//! - **Six provider families**: OpenAI, Zhipu, Anthropic, Google, DeepSeek
//!   and SiliconFlow wire formats
//! - **Output validation**: JSON, pattern and predicate validators that
//!   re-prompt the model on rejection
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use parallm::{Client, user_message};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::from_yaml_file("config.yaml").await?;
//!
//!     let answer = client.generate("What is the capital of France?").await?;
//!     println!("{}", answer);
//!
//!     let reply = client
//!         .chat(vec![user_message("Summarize Rust in one sentence.")])
//!         .await?;
//!     println!("{}", reply);
//!     Ok(())
//! }
//! ```
//!
//! ## Validated output
//!
//! ```rust,no_run
//! use parallm::{CallOptions, Client, JsonType, Schema, Validator};
//!
//! # async fn example(client: Client) -> Result<(), Box<dyn std::error::Error>> {
//! let schema = Schema::new().field("name", JsonType::String).field("age", JsonType::Integer);
//! let options = CallOptions {
//!     validator: Some(Validator::json_with_schema(schema, true)),
//!     ..Default::default()
//! };
//! let profile = client.generate_with_options("Return a user profile as JSON.", options).await?;
//! # Ok(())
//! # }
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod core;
pub mod sdk;
pub mod utils;

pub use crate::config::{ClientConfig, ProviderEntry};
pub use crate::core::balancer::{LoadBalancer, StatsSnapshot};
pub use crate::core::providers::{InstanceStats, ProviderFamily};
pub use crate::core::types::{
    assistant_message, system_message, user_message, EmbeddingInput, EmbeddingOutput, Message,
    MessageRole, RequestParams, RetryPolicy, Usage,
};
pub use crate::core::validation::{JsonType, Schema, ValidationOutcome, Validator};
pub use crate::sdk::{BlockingClient, CallOptions, Client};
pub use crate::utils::error::{Error, Result};

/// Current version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
/// Name of the crate
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants() {
        assert_eq!(VERSION, env!("CARGO_PKG_VERSION"));
        assert_eq!(NAME, env!("CARGO_PKG_NAME"));
    }
}
