//! Load balancer
//!
//! Routes each logical request to exactly one provider instance, enforces
//! the per-instance sliding rate window, runs the retry policy, records
//! outcomes and drives the circuit-breaker / health-check loop.

pub mod health;
pub mod selection;

use parking_lot::Mutex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::config::ClientConfig;
use crate::core::providers::{
    self, InstanceStats, ProviderFamily, ProviderInstance, ProviderPool, WireRequest,
};
use crate::core::types::{
    ChatReply, EmbedReply, EmbeddingInput, Message, RequestKind, RequestParams, RetryPolicy,
};
use crate::utils::error::{Error, Result};

/// Exponential back-off base between attempts
const BACKOFF_BASE_MS: u64 = 250;

/// Back-off ceiling
const BACKOFF_CAP_MS: u64 = 4_000;

/// Per-family instance statistics
pub type StatsSnapshot = BTreeMap<ProviderFamily, Vec<InstanceStats>>;

/// One logical dispatch, provider-neutral
#[derive(Debug, Clone, Copy)]
pub(crate) enum Dispatch<'a> {
    Chat(&'a [Message]),
    Embed(&'a EmbeddingInput),
}

impl Dispatch<'_> {
    fn kind(&self) -> RequestKind {
        match self {
            Dispatch::Chat(_) => RequestKind::Chat,
            Dispatch::Embed(_) => RequestKind::Embed,
        }
    }
}

/// Normalized dispatch result
#[derive(Debug, Clone)]
pub(crate) enum Reply {
    Chat(ChatReply),
    Embed(EmbedReply),
}

/// Owns the provider pool and the shared HTTP client
pub struct LoadBalancer {
    inner: Arc<BalancerInner>,
    health_task: Mutex<Option<JoinHandle<()>>>,
}

pub(crate) struct BalancerInner {
    pub(crate) pool: ProviderPool,
    http: reqwest::Client,
}

impl LoadBalancer {
    /// Build a balancer over the configured pool
    pub fn new(config: &ClientConfig) -> Result<Self> {
        if config.providers.is_empty() {
            return Err(Error::Config("No providers configured".to_string()));
        }
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            inner: Arc::new(BalancerInner { pool: ProviderPool::new(config), http }),
            health_task: Mutex::new(None),
        })
    }

    /// Execute a chat completion under the retry policy
    pub async fn execute_chat(
        &self,
        messages: &[Message],
        params: &RequestParams,
        policy: RetryPolicy,
        pin: Option<ProviderFamily>,
    ) -> Result<ChatReply> {
        match self.execute(Dispatch::Chat(messages), params, policy, pin).await? {
            Reply::Chat(reply) => Ok(reply),
            Reply::Embed(_) => Err(Error::UpstreamFormat("embed reply to a chat dispatch".to_string())),
        }
    }

    /// Execute an embedding call under the retry policy
    pub async fn execute_embed(
        &self,
        input: &EmbeddingInput,
        params: &RequestParams,
        policy: RetryPolicy,
        pin: Option<ProviderFamily>,
    ) -> Result<EmbedReply> {
        match self.execute(Dispatch::Embed(input), params, policy, pin).await? {
            Reply::Embed(reply) => Ok(reply),
            Reply::Chat(_) => Err(Error::UpstreamFormat("chat reply to an embed dispatch".to_string())),
        }
    }

    async fn execute(
        &self,
        dispatch: Dispatch<'_>,
        params: &RequestParams,
        policy: RetryPolicy,
        pin: Option<ProviderFamily>,
    ) -> Result<Reply> {
        self.ensure_health_task();

        let kind = dispatch.kind();
        let mut attempt: u32 = 0;
        let mut previous: Option<(ProviderFamily, usize)> = None;
        loop {
            attempt += 1;
            let instance = match self.inner.select(kind, pin, previous).await {
                Ok(instance) => instance,
                Err(Error::NoProvidersAvailable) if policy == RetryPolicy::Infinite => {
                    // Keep waiting for the health loop to revive an instance.
                    warn!(attempt, "no providers available, waiting");
                    tokio::time::sleep(backoff_delay(attempt)).await;
                    continue;
                }
                Err(e) => return Err(e),
            };
            debug!(instance = %instance.id(), attempt, "selected instance");

            match self.inner.dispatch_once(&instance, dispatch, params).await {
                Ok(reply) => return Ok(reply),
                Err(err) if !err.is_retryable() => return Err(err),
                Err(err) => {
                    previous = Some((instance.family(), instance.index()));
                    if let Some(max) = policy.max_attempts() {
                        if attempt >= max {
                            error!(attempts = attempt, instance = %instance.id(), "all retries failed");
                            return Err(Error::Exhausted {
                                attempts: attempt,
                                provider: instance.id(),
                                source: Box::new(err),
                            });
                        }
                    }
                    let delay = backoff_delay(attempt);
                    warn!(
                        instance = %instance.id(),
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Per-family usage statistics, per-instance consistent
    pub fn stats(&self) -> StatsSnapshot {
        let mut snapshot = StatsSnapshot::new();
        for family in self.inner.pool.families() {
            let instances = self
                .inner
                .pool
                .family_instances(family)
                .iter()
                .map(|instance| instance.stats())
                .collect();
            snapshot.insert(family, instances);
        }
        snapshot
    }

}

impl Drop for LoadBalancer {
    fn drop(&mut self) {
        if let Some(task) = self.health_task.lock().take() {
            task.abort();
        }
    }
}

impl BalancerInner {
    /// One dispatch against one instance: build, send, parse, record
    pub(crate) async fn dispatch_once(
        &self,
        instance: &Arc<ProviderInstance>,
        dispatch: Dispatch<'_>,
        params: &RequestParams,
    ) -> Result<Reply> {
        let family = instance.family();
        let wire = match dispatch {
            Dispatch::Chat(messages) => providers::build_chat(family, instance.endpoint(), messages, params),
            Dispatch::Embed(input) => providers::build_embed(family, instance.endpoint(), input, params)?,
        };

        let guard = instance.begin_dispatch(Instant::now());
        let result = match self.send(&wire).await {
            Ok(json) => match dispatch {
                Dispatch::Chat(_) => providers::parse_chat(family, &json).map(Reply::Chat),
                Dispatch::Embed(input) => providers::parse_embed(family, input, &json).map(Reply::Embed),
            },
            Err(err) => Err(err),
        };
        match &result {
            Ok(reply) => {
                let usage = match reply {
                    Reply::Chat(chat) => chat.usage,
                    Reply::Embed(embed) => embed.usage,
                };
                guard.succeed(&usage);
            }
            Err(_) => guard.fail(),
        }
        result
    }

    /// Perform the HTTP POST and classify the outcome
    pub(crate) async fn send(&self, wire: &WireRequest) -> Result<Value> {
        let mut request = self.http.post(&wire.url).json(&wire.body);
        for (name, value) in &wire.headers {
            request = request.header(*name, value);
        }

        let response = request.send().await.map_err(classify_transport)?;
        let status = response.status();
        if status.as_u16() == 429 {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::RateLimited(body));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body = if body.trim().is_empty() { "No error message".to_string() } else { body };
            return Err(Error::UpstreamHttp { status: status.as_u16(), body });
        }
        response
            .json::<Value>()
            .await
            .map_err(|e| Error::UpstreamFormat(format!("Failed to parse response JSON: {}", e)))
    }
}

fn classify_transport(err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::Transport(format!("Request timeout: {}", err))
    } else {
        Error::Transport(format!("Network error: {}", err))
    }
}

/// Exponential back-off: 250 ms base, doubling, capped at 4 s
fn backoff_delay(attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(4);
    Duration::from_millis((BACKOFF_BASE_MS << exponent).min(BACKOFF_CAP_MS))
}
