//! Provider pool construction
//!
//! Built once from configuration and immutable afterwards. Instances are
//! kept per family in declaration order; the order doubles as the final
//! selection tie-break.

use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

use crate::config::ClientConfig;
use crate::core::types::RequestKind;

use super::{ProviderFamily, ProviderInstance};

/// All provider instances, grouped by family
#[derive(Debug)]
pub struct ProviderPool {
    families: BTreeMap<ProviderFamily, Vec<Arc<ProviderInstance>>>,
}

impl ProviderPool {
    /// Build the pool from configuration, one instance per key entry
    pub fn new(config: &ClientConfig) -> Self {
        let mut families: BTreeMap<ProviderFamily, Vec<Arc<ProviderInstance>>> = BTreeMap::new();
        for entry in &config.providers {
            let instances = families.entry(entry.family).or_default();
            let index = instances.len();
            instances.push(Arc::new(ProviderInstance::new(entry.family, index, entry)));
        }
        for (family, instances) in &families {
            info!(family = %family, count = instances.len(), "initialized provider instances");
        }
        Self { families }
    }

    /// Enabled families, in stable order
    pub fn families(&self) -> impl Iterator<Item = ProviderFamily> + '_ {
        self.families.keys().copied()
    }

    /// Instances of one family, in declaration order
    pub fn family_instances(&self, family: ProviderFamily) -> &[Arc<ProviderInstance>] {
        self.families.get(&family).map(|instances| instances.as_slice()).unwrap_or(&[])
    }

    /// Every instance, family order then declaration order
    pub fn all_instances(&self) -> impl Iterator<Item = &Arc<ProviderInstance>> {
        self.families.values().flatten()
    }

    /// Instances eligible for `kind`, optionally pinned to one family
    ///
    /// Eligibility covers the immutable facts only (family enabled, kind
    /// supported, pin); liveness and rate limits are the balancer's call.
    pub fn candidates(
        &self,
        kind: RequestKind,
        pin: Option<ProviderFamily>,
    ) -> Vec<Arc<ProviderInstance>> {
        self.families
            .iter()
            .filter(|(family, _)| pin.map_or(true, |pinned| pinned == **family))
            .filter(|(family, _)| family.supports(kind))
            .flat_map(|(_, instances)| instances.iter().cloned())
            .collect()
    }
}
