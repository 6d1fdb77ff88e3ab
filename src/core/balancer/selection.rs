//! Provider selection
//!
//! Score = `active_requests + error_count * 0.1`, minimum wins. Ties go to
//! the instance not used for the longest time, then to declaration order.
//! Throttled instances are skipped; when every candidate is throttled the
//! selection waits until the earliest window slot frees.

use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

use crate::core::providers::{ProviderFamily, ProviderInstance};
use crate::core::types::RequestKind;
use crate::utils::error::{Error, Result};

use super::BalancerInner;

impl BalancerInner {
    /// Select the best available instance for `kind`
    ///
    /// `previous` marks the instance tried by the preceding attempt; it is
    /// only reconsidered when no other candidate exists.
    pub(crate) async fn select(
        &self,
        kind: RequestKind,
        pin: Option<ProviderFamily>,
        previous: Option<(ProviderFamily, usize)>,
    ) -> Result<Arc<ProviderInstance>> {
        loop {
            let active: Vec<Arc<ProviderInstance>> = self
                .pool
                .candidates(kind, pin)
                .into_iter()
                .filter(|instance| instance.is_active())
                .collect();
            if active.is_empty() {
                return Err(Error::NoProvidersAvailable);
            }

            let mut eligible: Vec<Arc<ProviderInstance>> = active
                .iter()
                .filter(|instance| {
                    previous != Some((instance.family(), instance.index()))
                })
                .cloned()
                .collect();
            if eligible.is_empty() {
                eligible = active;
            }

            let ranked = rank(eligible);
            let now = Instant::now();
            if let Some(instance) = ranked.iter().find(|instance| instance.slot_available(now)) {
                return Ok(Arc::clone(instance));
            }

            // Everyone is throttled: wait for the earliest slot to free.
            let earliest = ranked
                .iter()
                .filter_map(|instance| instance.next_slot_at(now))
                .min()
                .unwrap_or(now);
            debug!(
                wait_ms = earliest.saturating_duration_since(now).as_millis() as u64,
                "all candidates rate limited, waiting for a window slot"
            );
            tokio::time::sleep_until(tokio::time::Instant::from_std(earliest)).await;
        }
    }
}

/// Order instances best-first by (score, oldest last use, declaration order)
fn rank(instances: Vec<Arc<ProviderInstance>>) -> Vec<Arc<ProviderInstance>> {
    let mut keyed: Vec<(f64, Option<Instant>, Arc<ProviderInstance>)> = instances
        .into_iter()
        .map(|instance| (instance.score(), instance.last_used_at(), instance))
        .collect();
    // Stable sort keeps declaration order as the final tie-break; a never
    // used instance (None) counts as oldest.
    keyed.sort_by(|a, b| {
        a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal).then_with(|| a.1.cmp(&b.1))
    });
    keyed.into_iter().map(|(_, _, instance)| instance).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderEntry;
    use std::time::Duration;

    fn instance(index: usize, rate_limit: u32) -> Arc<ProviderInstance> {
        Arc::new(ProviderInstance::new(
            ProviderFamily::OpenAi,
            index,
            &ProviderEntry {
                family: ProviderFamily::OpenAi,
                api_key: format!("k{}", index),
                api_base: "https://a.test/v1/chat/completions".to_string(),
                model: "m".to_string(),
                rate_limit,
            },
        ))
    }

    #[test]
    fn least_loaded_instance_wins() {
        let first = instance(0, 20);
        let second = instance(1, 20);
        let third = instance(2, 20);
        first.force_active_requests(5);
        second.force_active_requests(2);
        third.force_active_requests(0);

        let ranked = rank(vec![first, second, third]);
        assert_eq!(ranked[0].index(), 2);
        assert_eq!(ranked[1].index(), 1);
        assert_eq!(ranked[2].index(), 0);
    }

    #[test]
    fn errors_break_equal_load() {
        let first = instance(0, 20);
        let second = instance(1, 20);
        let guard = first.begin_dispatch(Instant::now());
        guard.fail();
        drop(guard);

        let ranked = rank(vec![first, second]);
        assert_eq!(ranked[0].index(), 1);
    }

    #[test]
    fn oldest_last_use_breaks_score_ties() {
        let first = instance(0, 20);
        let second = instance(1, 20);
        let base = Instant::now();
        first.set_last_used_at(base);
        second.set_last_used_at(base - Duration::from_secs(30));

        let ranked = rank(vec![first, second]);
        assert_eq!(ranked[0].index(), 1);
    }

    #[test]
    fn never_used_counts_as_oldest() {
        let first = instance(0, 20);
        let second = instance(1, 20);
        first.set_last_used_at(Instant::now());

        let ranked = rank(vec![first, second]);
        assert_eq!(ranked[0].index(), 1);
    }

    #[test]
    fn declaration_order_is_the_final_tie_break() {
        let ranked = rank(vec![instance(0, 20), instance(1, 20), instance(2, 20)]);
        assert_eq!(ranked[0].index(), 0);
    }

    fn inner(entries: usize) -> BalancerInner {
        let providers = (0..entries)
            .map(|index| ProviderEntry {
                family: ProviderFamily::OpenAi,
                api_key: format!("k{}", index),
                api_base: "https://a.test/v1/chat/completions".to_string(),
                model: "m".to_string(),
                rate_limit: 20,
            })
            .collect();
        let config = crate::config::ClientConfig {
            providers,
            request_timeout: Duration::from_secs(5),
        };
        BalancerInner {
            pool: crate::core::providers::ProviderPool::new(&config),
            http: reqwest::Client::new(),
        }
    }

    fn open_circuit(instance: &Arc<ProviderInstance>) {
        for _ in 0..3 {
            let guard = instance.begin_dispatch(Instant::now());
            guard.fail();
        }
    }

    #[tokio::test]
    async fn circuit_open_instances_are_never_selected() {
        let inner = inner(2);
        open_circuit(&inner.pool.family_instances(ProviderFamily::OpenAi)[0]);

        for _ in 0..5 {
            let selected = inner.select(RequestKind::Chat, None, None).await.unwrap();
            assert_eq!(selected.index(), 1);
        }
    }

    #[tokio::test]
    async fn empty_selection_set_is_an_error() {
        let inner = inner(2);
        for instance in inner.pool.family_instances(ProviderFamily::OpenAi) {
            open_circuit(instance);
        }
        let err = inner.select(RequestKind::Chat, None, None).await.unwrap_err();
        assert!(matches!(err, Error::NoProvidersAvailable));
    }

    #[tokio::test]
    async fn previous_instance_is_avoided_when_an_alternative_exists() {
        let inner = inner(2);
        let selected = inner
            .select(RequestKind::Chat, None, Some((ProviderFamily::OpenAi, 0)))
            .await
            .unwrap();
        assert_eq!(selected.index(), 1);
    }

    #[tokio::test]
    async fn previous_instance_is_reused_as_the_only_candidate() {
        let inner = inner(1);
        let selected = inner
            .select(RequestKind::Chat, None, Some((ProviderFamily::OpenAi, 0)))
            .await
            .unwrap();
        assert_eq!(selected.index(), 0);
    }

    #[tokio::test]
    async fn reactivated_instance_rejoins_the_candidate_set() {
        let inner = inner(2);
        let first = &inner.pool.family_instances(ProviderFamily::OpenAi)[0];
        open_circuit(first);
        first.reactivate();
        // Error count is cleared on reactivation, so the revived instance
        // ties on score and wins as the never-used one.
        let second = &inner.pool.family_instances(ProviderFamily::OpenAi)[1];
        second.set_last_used_at(Instant::now());

        let selected = inner.select(RequestKind::Chat, None, None).await.unwrap();
        assert_eq!(selected.index(), 0);
    }
}
