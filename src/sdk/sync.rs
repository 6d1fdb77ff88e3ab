//! Blocking client
//!
//! A thin wrapper that runs the async client to completion on a private
//! runtime. Every entry point first checks for an ambient runtime and
//! fails loudly instead of deadlocking.

use std::future::Future;
use std::path::Path;

use crate::config::ClientConfig;
use crate::core::balancer::StatsSnapshot;
use crate::core::types::{EmbeddingInput, EmbeddingOutput, Message};
use crate::utils::error::{Error, Result};

use super::client::{CallOptions, Client};

/// Synchronous twin of [`Client`]
pub struct BlockingClient {
    client: Client,
    runtime: tokio::runtime::Runtime,
}

impl BlockingClient {
    /// Create a blocking client over the configured provider pool
    pub fn new(config: ClientConfig) -> Result<Self> {
        ensure_not_in_runtime()?;
        let runtime = build_runtime()?;
        let client = Client::new(config)?;
        Ok(Self { client, runtime })
    }

    /// Load configuration from a YAML file and create a blocking client
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        ensure_not_in_runtime()?;
        let runtime = build_runtime()?;
        let config = runtime.block_on(ClientConfig::from_yaml_file(path))?;
        let client = Client::new(config)?;
        Ok(Self { client, runtime })
    }

    /// Create a blocking client from the environment fallback configuration
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    /// Blocking version of [`Client::chat`]
    pub fn chat(&self, messages: Vec<Message>) -> Result<String> {
        self.block_on(self.client.chat(messages))
    }

    /// Blocking version of [`Client::chat_with_options`]
    pub fn chat_with_options(&self, messages: Vec<Message>, options: CallOptions) -> Result<String> {
        self.block_on(self.client.chat_with_options(messages, options))
    }

    /// Blocking version of [`Client::generate`]
    pub fn generate(&self, prompt: impl Into<String>) -> Result<String> {
        self.block_on(self.client.generate(prompt))
    }

    /// Blocking version of [`Client::generate_with_options`]
    pub fn generate_with_options(
        &self,
        prompt: impl Into<String>,
        options: CallOptions,
    ) -> Result<String> {
        self.block_on(self.client.generate_with_options(prompt, options))
    }

    /// Blocking version of [`Client::embed`]
    pub fn embed(&self, input: impl Into<EmbeddingInput>) -> Result<EmbeddingOutput> {
        self.block_on(self.client.embed(input))
    }

    /// Blocking version of [`Client::embed_with_options`]
    pub fn embed_with_options(
        &self,
        input: impl Into<EmbeddingInput>,
        options: CallOptions,
    ) -> Result<EmbeddingOutput> {
        self.block_on(self.client.embed_with_options(input, options))
    }

    /// Blocking version of [`Client::batch`]
    pub fn batch(&self, prompts: Vec<String>) -> Result<Vec<Result<String>>> {
        ensure_not_in_runtime()?;
        Ok(self.runtime.block_on(self.client.batch(prompts)))
    }

    /// Blocking version of [`Client::batch_with_options`]
    pub fn batch_with_options(
        &self,
        prompts: Vec<String>,
        options: CallOptions,
    ) -> Result<Vec<Result<String>>> {
        ensure_not_in_runtime()?;
        Ok(self.runtime.block_on(self.client.batch_with_options(prompts, options)))
    }

    /// Per-family usage statistics
    pub fn stats(&self) -> StatsSnapshot {
        self.client.stats()
    }

    fn block_on<T, F>(&self, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        ensure_not_in_runtime()?;
        self.runtime.block_on(call)
    }
}

fn build_runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| Error::Runtime(format!("Failed to create runtime: {}", e)))
}

fn ensure_not_in_runtime() -> Result<()> {
    if tokio::runtime::Handle::try_current().is_ok() {
        return Err(Error::Runtime(
            "blocking call issued from inside an async runtime; use the async Client instead"
                .to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderEntry;
    use crate::core::providers::ProviderFamily;
    use std::time::Duration;

    fn config() -> ClientConfig {
        ClientConfig {
            providers: vec![ProviderEntry {
                family: ProviderFamily::OpenAi,
                api_key: "k".to_string(),
                api_base: "https://example.test/v1/chat/completions".to_string(),
                model: "m".to_string(),
                rate_limit: 20,
            }],
            request_timeout: Duration::from_secs(60),
        }
    }

    #[test]
    fn guard_passes_outside_a_runtime() {
        assert!(ensure_not_in_runtime().is_ok());
        assert!(BlockingClient::new(config()).is_ok());
    }

    #[tokio::test]
    async fn guard_detects_an_ambient_runtime() {
        assert!(matches!(ensure_not_in_runtime(), Err(Error::Runtime(_))));
        assert!(matches!(BlockingClient::new(config()), Err(Error::Runtime(_))));
    }
}
