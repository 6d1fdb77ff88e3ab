//! Async client

use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::core::balancer::{LoadBalancer, StatsSnapshot};
use crate::core::providers::ProviderFamily;
use crate::core::types::{
    assistant_message, user_message, EmbeddingInput, EmbeddingOutput, Message, RequestParams,
    RetryPolicy,
};
use crate::core::validation::Validator;
use crate::utils::error::{Error, Result};

/// Per-call options
#[derive(Debug, Clone)]
pub struct CallOptions {
    /// Recognized parameters plus vendor pass-through extras
    pub params: RequestParams,
    /// Attempt budget for the dispatch loop
    pub retry_policy: RetryPolicy,
    /// Pin selection to one family
    pub provider: Option<ProviderFamily>,
    /// Reply validator for chat and generate calls
    pub validator: Option<Validator>,
    /// Additional attempts granted to the validation loop
    pub max_validator_retries: u32,
}

impl Default for CallOptions {
    fn default() -> Self {
        Self {
            params: RequestParams::default(),
            retry_policy: RetryPolicy::default(),
            provider: None,
            validator: None,
            max_validator_retries: 3,
        }
    }
}

/// Pooled LLM client
///
/// Cheap to clone; clones share the same provider pool and balancer.
#[derive(Clone)]
pub struct Client {
    balancer: Arc<LoadBalancer>,
}

impl Client {
    /// Create a client over the configured provider pool
    pub fn new(config: ClientConfig) -> Result<Self> {
        let balancer = Arc::new(LoadBalancer::new(&config)?);
        info!(providers = config.providers.len(), "client initialized");
        Ok(Self { balancer })
    }

    /// Load configuration from a YAML file and create a client
    pub async fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::new(ClientConfig::from_yaml_file(path).await?)
    }

    /// Create a client from the environment fallback configuration
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    /// Send a chat request and return the assistant's text
    pub async fn chat(&self, messages: Vec<Message>) -> Result<String> {
        self.chat_with_options(messages, CallOptions::default()).await
    }

    /// Send a chat request with explicit options
    ///
    /// When a validator is set the reply is checked and, on rejection, the
    /// rejected assistant turn plus a user turn carrying the retry addendum
    /// are appended before dispatching again, up to
    /// `max_validator_retries` additional attempts.
    pub async fn chat_with_options(
        &self,
        messages: Vec<Message>,
        options: CallOptions,
    ) -> Result<String> {
        let mut messages = messages;
        let mut failures: u32 = 0;
        loop {
            let reply = self
                .balancer
                .execute_chat(&messages, &options.params, options.retry_policy, options.provider)
                .await?;
            let Some(validator) = &options.validator else {
                return Ok(reply.text);
            };

            let outcome = validator.validate(&reply.text);
            if outcome.ok {
                return Ok(outcome.value.unwrap_or(reply.text));
            }

            failures += 1;
            let reason = outcome.error.unwrap_or_else(|| "validation failed".to_string());
            if failures > options.max_validator_retries {
                warn!(failures, "validation retries exhausted");
                return Err(Error::ValidationExhausted { reason, last_reply: reply.text });
            }
            debug!(failures, reason = %reason, "reply rejected, re-prompting");
            let addendum = outcome.retry_suffix.unwrap_or(reason);
            messages.push(assistant_message(reply.text));
            messages.push(user_message(addendum));
        }
    }

    /// Generate from a bare prompt: a chat with a single user turn
    pub async fn generate(&self, prompt: impl Into<String>) -> Result<String> {
        self.generate_with_options(prompt, CallOptions::default()).await
    }

    /// Generate from a bare prompt with explicit options
    pub async fn generate_with_options(
        &self,
        prompt: impl Into<String>,
        options: CallOptions,
    ) -> Result<String> {
        self.chat_with_options(vec![user_message(prompt)], options).await
    }

    /// Embed one text or a list of texts
    ///
    /// A single input yields a single vector, a list yields vectors in
    /// input order. Embeddings bypass validation.
    pub async fn embed(&self, input: impl Into<EmbeddingInput>) -> Result<EmbeddingOutput> {
        self.embed_with_options(input, CallOptions::default()).await
    }

    /// Embed with explicit options
    pub async fn embed_with_options(
        &self,
        input: impl Into<EmbeddingInput>,
        options: CallOptions,
    ) -> Result<EmbeddingOutput> {
        let input = input.into();
        let reply = self
            .balancer
            .execute_embed(&input, &options.params, options.retry_policy, options.provider)
            .await?;
        Ok(reply.output)
    }

    /// Run many prompts concurrently
    ///
    /// Results are index-aligned with the prompts; a failing prompt leaves
    /// an error in its slot rather than aborting the batch.
    pub async fn batch(&self, prompts: Vec<String>) -> Vec<Result<String>> {
        self.batch_with_options(prompts, CallOptions::default()).await
    }

    /// Run many prompts concurrently with explicit options
    pub async fn batch_with_options(
        &self,
        prompts: Vec<String>,
        options: CallOptions,
    ) -> Vec<Result<String>> {
        let calls = prompts
            .into_iter()
            .map(|prompt| self.generate_with_options(prompt, options.clone()));
        futures::future::join_all(calls).await
    }

    /// Per-family usage statistics
    pub fn stats(&self) -> StatsSnapshot {
        self.balancer.stats()
    }
}
