//! Request-scoped fan-out/fan-in over the metric set.
//!
//! One resolver task per metric, joined with settle-all semantics: no
//! individual provider failure can abort sibling fetches, because a
//! resolver task cannot fail — it degrades to `unavailable`. The only
//! abort path is the fatal-configuration gate before any task launches.

use crate::error::StrategyError;
use crate::market::{MetricId, Snapshot};
use crate::registry::MetricRegistry;
use crate::resolver::FallbackResolver;
use futures::future::join_all;
use log::info;
use std::sync::Arc;
use std::time::Duration;

pub struct Orchestrator {
    registry: Arc<MetricRegistry>,
    resolver: Arc<FallbackResolver>,
    fetch_timeout: Duration,
}

impl Orchestrator {
    pub fn new(
        registry: Arc<MetricRegistry>,
        resolver: Arc<FallbackResolver>,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            resolver,
            fetch_timeout,
        }
    }

    /// Resolve every required metric concurrently and assemble the
    /// snapshot. Errors only on fatal configuration problems; provider
    /// failures surface as entries in the snapshot's missing list.
    pub async fn snapshot(&self, required: &[MetricId]) -> Result<Snapshot, StrategyError> {
        if required.is_empty() {
            return Err(StrategyError::ConfigError(
                "request requires an empty metric set".to_string(),
            ));
        }
        self.registry.validate(required)?;

        let tasks = required.iter().map(|id| {
            let spec = id.spec();
            // Chain presence was just validated.
            let chain = self.registry.chain(*id).unwrap_or(&[]);
            self.resolver.resolve(spec, chain, self.fetch_timeout)
        });

        let results = join_all(tasks).await;
        let snapshot = Snapshot::from_resolutions(results);

        info!(
            "📊 Snapshot {}: {}/{} metrics resolved, {} missing",
            snapshot.id,
            snapshot.resolved_count(),
            required.len(),
            snapshot.missing().len()
        );
        Ok(snapshot)
    }
}
