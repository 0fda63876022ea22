//! Per-metric fallback resolution.
//!
//! One reusable mechanism replaces the bespoke try-A-catch-try-B chains:
//! cache lookup first, then the metric's adapters strictly in trust order.
//! The first success populates the cache and resolution stops. Exhausting
//! the chain is not an error; it resolves the metric to `unavailable`.

use crate::cache::Cache;
use crate::config::Config;
use crate::market::{MetricClass, MetricSpec, MetricValue, Provenance, Resolved};
use crate::sources::MetricSource;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Cache payload for a resolved metric. Provenance rides along so a cache
/// hit reports the trust tier of the fetch that originally populated it.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedMetric {
    value: MetricValue,
    provenance: Provenance,
    source: String,
}

pub struct FallbackResolver {
    cache: Arc<Cache>,
    ttl_gas: Duration,
    ttl_rate: Duration,
    ttl_tvl: Duration,
}

impl FallbackResolver {
    pub fn new(cache: Arc<Cache>, config: &Config) -> Self {
        Self {
            cache,
            ttl_gas: Duration::from_secs(config.ttl_for_class(MetricClass::Gas.name())),
            ttl_rate: Duration::from_secs(config.ttl_for_class(MetricClass::Rate.name())),
            ttl_tvl: Duration::from_secs(config.ttl_for_class(MetricClass::Tvl.name())),
        }
    }

    fn ttl_for(&self, class: MetricClass) -> Duration {
        match class {
            MetricClass::Gas => self.ttl_gas,
            MetricClass::Rate => self.ttl_rate,
            MetricClass::Tvl => self.ttl_tvl,
        }
    }

    /// Resolve one metric through its adapter chain. Infallible by design:
    /// the worst outcome is an `unavailable` resolution.
    pub async fn resolve(
        &self,
        spec: &MetricSpec,
        chain: &[Arc<dyn MetricSource>],
        timeout: Duration,
    ) -> Resolved {
        if let Some(cached) = self
            .cache
            .get_json::<CachedMetric>(spec.protocol, spec.key)
            .await
        {
            debug!(
                "{}.{} served from cache (originally {})",
                spec.protocol, spec.key, cached.source
            );
            return Resolved::hit(spec.id, cached.value, cached.provenance, &cached.source);
        }

        for source in chain {
            match source.fetch(spec, timeout).await {
                Ok(value) => {
                    debug!(
                        "{}.{} resolved by {} ({})",
                        spec.protocol,
                        spec.key,
                        source.name(),
                        source.provenance()
                    );
                    let entry = CachedMetric {
                        value: value.clone(),
                        provenance: source.provenance(),
                        source: source.name().to_string(),
                    };
                    self.cache
                        .set_ex(spec.protocol, spec.key, &entry, Some(self.ttl_for(spec.class)))
                        .await;
                    return Resolved::hit(spec.id, value, source.provenance(), source.name());
                }
                Err(e) => {
                    warn!(
                        "{} failed for {}.{}: {}. Trying next source.",
                        source.name(),
                        spec.protocol,
                        spec.key,
                        e
                    );
                }
            }
        }

        debug!(
            "{}.{} exhausted all {} sources, resolving as unavailable",
            spec.protocol,
            spec.key,
            chain.len()
        );
        Resolved::unavailable(spec.id)
    }
}
