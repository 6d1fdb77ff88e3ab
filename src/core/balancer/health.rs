//! Health-check loop
//!
//! A background task that wakes every five minutes and sends a minimal
//! chat probe to each inactive instance. A successful probe closes the
//! circuit and clears the error count. The task is started lazily by the
//! first dispatch and aborted when the balancer is dropped.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::core::providers::{self, ProviderInstance};
use crate::core::types::{user_message, RequestParams};
use crate::utils::error::Result;

use super::{BalancerInner, LoadBalancer};

/// Interval between health passes
pub(crate) const HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(300);

impl LoadBalancer {
    /// Spawn the health loop if it is not running yet
    pub(crate) fn ensure_health_task(&self) {
        let mut slot = self.health_task.lock();
        if slot.is_some() {
            return;
        }
        let weak = Arc::downgrade(&self.inner);
        *slot = Some(tokio::spawn(async move {
            loop {
                tokio::time::sleep(HEALTH_CHECK_INTERVAL).await;
                let Some(inner) = weak.upgrade() else { break };
                inner.run_health_pass().await;
            }
        }));
        debug!("health check task started");
    }
}

impl BalancerInner {
    /// Probe every inactive instance once
    pub(crate) async fn run_health_pass(&self) {
        debug!("running health check");
        for instance in self.pool.all_instances() {
            if instance.is_active() {
                continue;
            }
            match self.probe(instance).await {
                Ok(()) => {
                    instance.reactivate();
                    info!(instance = %instance.id(), "reactivated instance");
                }
                Err(err) => {
                    debug!(instance = %instance.id(), error = %err, "health probe failed");
                }
            }
        }
    }

    /// Minimal chat round-trip; every family supports chat
    async fn probe(&self, instance: &Arc<ProviderInstance>) -> Result<()> {
        let params = RequestParams { max_tokens: Some(1), ..Default::default() };
        let messages = [user_message("ping")];
        let wire = providers::build_chat(instance.family(), instance.endpoint(), &messages, &params);
        let json = self.send(&wire).await?;
        providers::parse_chat(instance.family(), &json)?;
        Ok(())
    }
}
