//! Live provider instance state
//!
//! One instance per configured (family, api_key, api_base, model) tuple.
//! All mutable state sits behind a single mutex so that counter updates,
//! window pushes and circuit transitions are atomic per instance. Readers
//! get a per-instance-consistent snapshot, never a global one.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, warn};

use crate::config::ProviderEntry;
use crate::core::types::Usage;

use super::{Endpoint, ProviderFamily};

/// Sliding rate-limit window length
pub(crate) const RATE_WINDOW: Duration = Duration::from_secs(60);

/// Consecutive errors after which the circuit opens
pub(crate) const ERROR_THRESHOLD: u32 = 3;

/// A single upstream key with its own rate limit and health state
#[derive(Debug)]
pub struct ProviderInstance {
    family: ProviderFamily,
    index: usize,
    api_key: String,
    api_base: String,
    model: String,
    rate_limit: usize,
    state: Mutex<InstanceState>,
}

#[derive(Debug)]
struct InstanceState {
    active: bool,
    active_requests: u32,
    error_count: u32,
    window: VecDeque<Instant>,
    total_requests: u64,
    total_tokens: u64,
    last_used_at: Option<Instant>,
}

/// Read-only view of one instance for `stats()`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceStats {
    /// Position of the instance within its family, in declaration order
    pub id: usize,
    /// Model served by this instance
    pub model: String,
    /// Whether the circuit is closed
    pub active: bool,
    /// Completed dispatches
    pub total_requests: u64,
    /// Tokens billed across completed dispatches
    pub total_tokens: u64,
    /// Errors since the last successful probe
    pub error_count: u32,
}

impl ProviderInstance {
    /// Create an instance from one config entry
    pub fn new(family: ProviderFamily, index: usize, entry: &ProviderEntry) -> Self {
        let rate_limit = entry.rate_limit.max(1) as usize;
        Self {
            family,
            index,
            api_key: entry.api_key.clone(),
            api_base: entry.api_base.clone(),
            model: entry.model.clone(),
            rate_limit,
            state: Mutex::new(InstanceState {
                active: true,
                active_requests: 0,
                error_count: 0,
                window: VecDeque::with_capacity(rate_limit),
                total_requests: 0,
                total_tokens: 0,
                last_used_at: None,
            }),
        }
    }

    /// Family tag
    pub fn family(&self) -> ProviderFamily {
        self.family
    }

    /// Position within the family, in declaration order
    pub fn index(&self) -> usize {
        self.index
    }

    /// Human-readable identifier, e.g. `openai/0`
    pub fn id(&self) -> String {
        format!("{}/{}", self.family, self.index)
    }

    /// Endpoint coordinates for the adapter layer
    pub fn endpoint(&self) -> Endpoint<'_> {
        Endpoint { api_key: &self.api_key, api_base: &self.api_base, model: &self.model }
    }

    /// Whether the circuit is closed
    pub fn is_active(&self) -> bool {
        self.state.lock().active
    }

    /// Whether the sliding window has a free slot at `now`
    ///
    /// A slot is free when the window is not full, or when the oldest
    /// timestamp has aged past the 60 s window.
    pub fn slot_available(&self, now: Instant) -> bool {
        let state = self.state.lock();
        if state.window.len() < self.rate_limit {
            return true;
        }
        match state.window.front() {
            Some(&oldest) => now.duration_since(oldest) >= RATE_WINDOW,
            None => true,
        }
    }

    /// When the next slot frees, if the window is currently full
    pub fn next_slot_at(&self, now: Instant) -> Option<Instant> {
        let state = self.state.lock();
        if state.window.len() < self.rate_limit {
            return None;
        }
        state.window.front().map(|&oldest| {
            if now.duration_since(oldest) >= RATE_WINDOW {
                now
            } else {
                oldest + RATE_WINDOW
            }
        })
    }

    /// Selection score: lower is better
    pub fn score(&self) -> f64 {
        let state = self.state.lock();
        state.active_requests as f64 + state.error_count as f64 * 0.1
    }

    /// Time of the last successful dispatch
    pub fn last_used_at(&self) -> Option<Instant> {
        self.state.lock().last_used_at
    }

    /// Reserve a dispatch slot: bump `active_requests` and stamp the window
    ///
    /// The returned guard rolls the reservation back on drop, so a
    /// cancelled request leaves the counters consistent.
    pub fn begin_dispatch(self: &Arc<Self>, now: Instant) -> DispatchGuard {
        let mut state = self.state.lock();
        state.active_requests += 1;
        if state.window.len() == self.rate_limit {
            state.window.pop_front();
        }
        state.window.push_back(now);
        DispatchGuard { instance: Arc::clone(self) }
    }

    fn record_success(&self, usage: &Usage) {
        let mut state = self.state.lock();
        state.total_requests += 1;
        state.total_tokens += usage.total_tokens;
        state.last_used_at = Some(Instant::now());
    }

    fn record_failure(&self) {
        let mut state = self.state.lock();
        state.error_count += 1;
        error!(instance = %self.id(), errors = state.error_count, "API error recorded");
        if state.error_count >= ERROR_THRESHOLD && state.active {
            state.active = false;
            warn!(instance = %self.id(), "circuit opened, instance marked inactive");
        }
    }

    /// Close the circuit and forget past errors (successful health probe)
    pub fn reactivate(&self) {
        let mut state = self.state.lock();
        state.active = true;
        state.error_count = 0;
    }

    /// Snapshot for `stats()`
    pub fn stats(&self) -> InstanceStats {
        let state = self.state.lock();
        InstanceStats {
            id: self.index,
            model: self.model.clone(),
            active: state.active,
            total_requests: state.total_requests,
            total_tokens: state.total_tokens,
            error_count: state.error_count,
        }
    }

    #[cfg(test)]
    pub(crate) fn window_len(&self) -> usize {
        self.state.lock().window.len()
    }

    #[cfg(test)]
    pub(crate) fn active_requests(&self) -> u32 {
        self.state.lock().active_requests
    }

    #[cfg(test)]
    pub(crate) fn set_last_used_at(&self, at: Instant) {
        self.state.lock().last_used_at = Some(at);
    }

    #[cfg(test)]
    pub(crate) fn force_active_requests(&self, count: u32) {
        self.state.lock().active_requests = count;
    }
}

/// RAII reservation of one in-flight dispatch
///
/// Dropping the guard (success, failure or cancellation) releases the
/// `active_requests` slot; the outcome is recorded explicitly beforehand.
#[derive(Debug)]
pub struct DispatchGuard {
    instance: Arc<ProviderInstance>,
}

impl DispatchGuard {
    /// Record a successful dispatch
    pub fn succeed(&self, usage: &Usage) {
        self.instance.record_success(usage);
    }

    /// Record a failed dispatch, possibly opening the circuit
    pub fn fail(&self) {
        self.instance.record_failure();
    }
}

impl Drop for DispatchGuard {
    fn drop(&mut self) {
        let mut state = self.instance.state.lock();
        state.active_requests = state.active_requests.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance(rate_limit: u32) -> Arc<ProviderInstance> {
        Arc::new(ProviderInstance::new(
            ProviderFamily::OpenAi,
            0,
            &ProviderEntry {
                family: ProviderFamily::OpenAi,
                api_key: "k".to_string(),
                api_base: "https://example.test/v1/chat/completions".to_string(),
                model: "m".to_string(),
                rate_limit,
            },
        ))
    }

    #[test]
    fn guard_rolls_back_active_requests_on_drop() {
        let inst = instance(5);
        {
            let _guard = inst.begin_dispatch(Instant::now());
            assert_eq!(inst.active_requests(), 1);
        }
        assert_eq!(inst.active_requests(), 0);
    }

    #[test]
    fn window_is_bounded_by_rate_limit() {
        let inst = instance(3);
        let now = Instant::now();
        for _ in 0..5 {
            let _guard = inst.begin_dispatch(now);
        }
        assert_eq!(inst.window_len(), 3);
    }

    #[test]
    fn slot_unavailable_when_window_full_within_sixty_seconds() {
        let inst = instance(2);
        let now = Instant::now();
        let _g1 = inst.begin_dispatch(now);
        let _g2 = inst.begin_dispatch(now);
        assert!(!inst.slot_available(now));
        // The slot frees once the oldest stamp ages out of the window.
        assert!(inst.slot_available(now + RATE_WINDOW));
        assert_eq!(inst.next_slot_at(now), Some(now + RATE_WINDOW));
    }

    #[test]
    fn circuit_opens_after_three_errors() {
        let inst = instance(5);
        for _ in 0..2 {
            let guard = inst.begin_dispatch(Instant::now());
            guard.fail();
        }
        assert!(inst.is_active());
        let guard = inst.begin_dispatch(Instant::now());
        guard.fail();
        assert!(!inst.is_active());
        assert_eq!(inst.stats().error_count, 3);

        inst.reactivate();
        assert!(inst.is_active());
        assert_eq!(inst.stats().error_count, 0);
    }

    #[test]
    fn success_updates_counters() {
        let inst = instance(5);
        let guard = inst.begin_dispatch(Instant::now());
        guard.succeed(&Usage { prompt_tokens: 10, completion_tokens: 15, total_tokens: 25 });
        drop(guard);
        let stats = inst.stats();
        assert_eq!(stats.total_requests, 1);
        assert_eq!(stats.total_tokens, 25);
        assert!(inst.last_used_at().is_some());
    }

    #[test]
    fn score_weights_active_requests_over_errors() {
        let inst = instance(5);
        inst.force_active_requests(2);
        let score = inst.score();
        assert!((score - 2.0).abs() < f64::EPSILON);
        let guard = inst.begin_dispatch(Instant::now());
        guard.fail();
        drop(guard);
        assert!((inst.score() - 0.1).abs() < 1e-9);
    }
}
