//! Integration tests for per-metric fallback resolution.
//!
//! These verify the resolver's contract: strict trust-order iteration,
//! first-success-wins, cache wrapping, and the unavailable terminal state.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use yield_router::{
    cache::Cache,
    config::Config,
    market::{MetricId, MetricSpec, MetricValue, Provenance},
    resolver::FallbackResolver,
    sources::{FetchError, MetricSource},
};

/// Mock metric source for testing. Counts invocations so ordering can be
/// asserted.
struct MockSource {
    name: String,
    provenance: Provenance,
    value: Option<f64>,
    calls: Arc<AtomicUsize>,
}

impl MockSource {
    fn ok(name: &str, provenance: Provenance, value: f64) -> (Arc<Self>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Arc::new(Self {
                name: name.to_string(),
                provenance,
                value: Some(value),
                calls: Arc::clone(&calls),
            }),
            calls,
        )
    }

    fn failing(name: &str, provenance: Provenance) -> (Arc<Self>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Arc::new(Self {
                name: name.to_string(),
                provenance,
                value: None,
                calls: Arc::clone(&calls),
            }),
            calls,
        )
    }
}

#[async_trait]
impl MetricSource for MockSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn provenance(&self) -> Provenance {
        self.provenance
    }

    async fn fetch(
        &self,
        _metric: &MetricSpec,
        _timeout: Duration,
    ) -> Result<MetricValue, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.value {
            Some(v) => Ok(MetricValue::Number(v)),
            None => Err(FetchError::Transport("mock provider down".to_string())),
        }
    }
}

async fn resolver() -> FallbackResolver {
    let config = Config::test_default();
    let cache = Arc::new(Cache::connect(&config).await);
    FallbackResolver::new(cache, &config)
}

#[tokio::test]
async fn first_successful_source_wins_and_later_sources_are_not_tried() {
    let resolver = resolver().await;
    let (plugin, plugin_calls) = MockSource::ok("plugin", Provenance::Plugin, 3.8);
    let (subgraph, subgraph_calls) = MockSource::ok("subgraph", Provenance::Subgraph, 3.6);
    let (aggregator, aggregator_calls) =
        MockSource::ok("aggregator", Provenance::AggregatorPrimary, 3.4);

    let chain: Vec<Arc<dyn MetricSource>> = vec![plugin, subgraph, aggregator];
    let resolved = resolver
        .resolve(MetricId::StEthApr.spec(), &chain, Duration::from_millis(50))
        .await;

    assert_eq!(resolved.value, Some(MetricValue::Number(3.8)));
    assert_eq!(resolved.provenance, Provenance::Plugin);
    assert_eq!(plugin_calls.load(Ordering::SeqCst), 1);
    assert_eq!(subgraph_calls.load(Ordering::SeqCst), 0);
    assert_eq!(aggregator_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn failures_advance_down_the_trust_order() {
    let resolver = resolver().await;
    let (plugin, plugin_calls) = MockSource::failing("plugin", Provenance::Plugin);
    let (subgraph, subgraph_calls) = MockSource::failing("subgraph", Provenance::Subgraph);
    let (aggregator, aggregator_calls) =
        MockSource::ok("aggregator", Provenance::AggregatorPrimary, 3.4);

    let chain: Vec<Arc<dyn MetricSource>> = vec![plugin, subgraph, aggregator];
    let resolved = resolver
        .resolve(MetricId::StEthApr.spec(), &chain, Duration::from_millis(50))
        .await;

    assert_eq!(resolved.value, Some(MetricValue::Number(3.4)));
    assert_eq!(resolved.provenance, Provenance::AggregatorPrimary);
    assert_eq!(plugin_calls.load(Ordering::SeqCst), 1);
    assert_eq!(subgraph_calls.load(Ordering::SeqCst), 1);
    assert_eq!(aggregator_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn exhausted_chain_resolves_as_unavailable_not_error() {
    let resolver = resolver().await;
    let (plugin, _) = MockSource::failing("plugin", Provenance::Plugin);
    let (subgraph, _) = MockSource::failing("subgraph", Provenance::Subgraph);

    let chain: Vec<Arc<dyn MetricSource>> = vec![plugin, subgraph];
    let resolved = resolver
        .resolve(MetricId::BorrowRateUsdc.spec(), &chain, Duration::from_millis(50))
        .await;

    assert_eq!(resolved.value, None);
    assert_eq!(resolved.provenance, Provenance::Unavailable);
}

#[tokio::test]
async fn second_resolution_is_served_from_cache() {
    let resolver = resolver().await;
    let (plugin, plugin_calls) = MockSource::ok("plugin", Provenance::Plugin, 3.8);
    let chain: Vec<Arc<dyn MetricSource>> = vec![plugin];

    let first = resolver
        .resolve(MetricId::StEthApr.spec(), &chain, Duration::from_millis(50))
        .await;
    let second = resolver
        .resolve(MetricId::StEthApr.spec(), &chain, Duration::from_millis(50))
        .await;

    assert_eq!(plugin_calls.load(Ordering::SeqCst), 1, "cache must absorb the second hit");
    assert_eq!(first.value, second.value);
    // A cache hit reports the provenance of the fetch that populated it.
    assert_eq!(second.provenance, Provenance::Plugin);
}

#[tokio::test]
async fn disabled_cache_behaves_like_a_cold_cache() {
    let mut config = Config::test_default();
    config.cache_enabled = false;
    let cache = Arc::new(Cache::connect(&config).await);
    let resolver = FallbackResolver::new(cache, &config);

    let (plugin, plugin_calls) = MockSource::ok("plugin", Provenance::Plugin, 3.8);
    let chain: Vec<Arc<dyn MetricSource>> = vec![plugin];

    for _ in 0..3 {
        let resolved = resolver
            .resolve(MetricId::StEthApr.spec(), &chain, Duration::from_millis(50))
            .await;
        assert_eq!(resolved.value, Some(MetricValue::Number(3.8)));
    }
    // No cache: every resolution goes to the source.
    assert_eq!(plugin_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn static_default_terminates_a_chain_of_failures() {
    let resolver = resolver().await;
    let (plugin, _) = MockSource::failing("plugin", Provenance::Plugin);
    let (aggregator, _) = MockSource::failing("aggregator", Provenance::AggregatorPrimary);
    let (fallback, _) = MockSource::ok("static-default", Provenance::StaticDefault, 3.5);

    let chain: Vec<Arc<dyn MetricSource>> = vec![plugin, aggregator, fallback];
    let resolved = resolver
        .resolve(MetricId::StEthApr.spec(), &chain, Duration::from_millis(50))
        .await;

    assert_eq!(resolved.value, Some(MetricValue::Number(3.5)));
    assert_eq!(resolved.provenance, Provenance::StaticDefault);
}
