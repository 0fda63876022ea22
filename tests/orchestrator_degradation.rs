//! Integration tests for the concurrent orchestrator's settle-all
//! semantics: individual provider failures degrade to missing data, and
//! only fatal configuration problems abort a pass.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use yield_router::{
    cache::Cache,
    config::Config,
    error::StrategyError,
    market::{MetricId, MetricSpec, MetricValue, Provenance},
    orchestrator::Orchestrator,
    registry::{MetricRegistry, ETH_METRICS, STABLE_METRICS},
    resolver::FallbackResolver,
    sources::{FetchError, MetricSource},
};

struct MockSource {
    provenance: Provenance,
    value: Option<f64>,
}

impl MockSource {
    fn ok(provenance: Provenance, value: f64) -> Arc<Self> {
        Arc::new(Self {
            provenance,
            value: Some(value),
        })
    }

    fn failing(provenance: Provenance) -> Arc<Self> {
        Arc::new(Self {
            provenance,
            value: None,
        })
    }
}

#[async_trait]
impl MetricSource for MockSource {
    fn name(&self) -> &str {
        "mock"
    }

    fn provenance(&self) -> Provenance {
        self.provenance
    }

    async fn fetch(
        &self,
        _metric: &MetricSpec,
        _timeout: Duration,
    ) -> Result<MetricValue, FetchError> {
        match self.value {
            Some(v) => Ok(MetricValue::Number(v)),
            None => Err(FetchError::Status(503)),
        }
    }
}

async fn orchestrator_with(registry: MetricRegistry) -> Orchestrator {
    let config = Config::test_default();
    let cache = Arc::new(Cache::connect(&config).await);
    let resolver = Arc::new(FallbackResolver::new(cache, &config));
    Orchestrator::new(Arc::new(registry), resolver, Duration::from_millis(50))
}

#[tokio::test]
async fn one_dead_metric_does_not_abort_the_snapshot() {
    // Every metric resolves except the borrow rate, whose providers are
    // all down.
    let mut builder = MetricRegistry::builder();
    for (i, id) in ETH_METRICS.iter().enumerate() {
        let chain: Vec<Arc<dyn MetricSource>> = if *id == MetricId::BorrowRateUsdc {
            vec![
                MockSource::failing(Provenance::Subgraph),
                MockSource::failing(Provenance::AggregatorPrimary),
            ]
        } else {
            vec![MockSource::ok(Provenance::Subgraph, 1.0 + i as f64)]
        };
        builder = builder.register(*id, chain);
    }
    let orchestrator = orchestrator_with(builder.build()).await;

    let snapshot = orchestrator
        .snapshot(ETH_METRICS)
        .await
        .expect("provider failures must not abort orchestration");

    assert_eq!(snapshot.resolved_count(), ETH_METRICS.len() - 1);
    assert_eq!(snapshot.missing(), &[MetricId::BorrowRateUsdc]);
    assert_eq!(
        snapshot.provenance(MetricId::BorrowRateUsdc),
        Provenance::Unavailable
    );
    assert!(snapshot.number(MetricId::StEthApr).is_some());
}

#[tokio::test]
async fn all_providers_down_still_yields_a_snapshot() {
    let mut builder = MetricRegistry::builder();
    for id in STABLE_METRICS {
        let chain: Vec<Arc<dyn MetricSource>> =
            vec![MockSource::failing(Provenance::AggregatorPrimary)];
        builder = builder.register(*id, chain);
    }
    let orchestrator = orchestrator_with(builder.build()).await;

    let snapshot = orchestrator.snapshot(STABLE_METRICS).await.unwrap();
    assert_eq!(snapshot.resolved_count(), 0);
    assert_eq!(snapshot.missing().len(), STABLE_METRICS.len());
}

#[tokio::test]
async fn missing_chain_is_a_fatal_config_error() {
    // Registry covers everything except the gas price.
    let mut builder = MetricRegistry::builder();
    for id in ETH_METRICS {
        if *id == MetricId::GasPrice {
            continue;
        }
        builder = builder.register(
            *id,
            vec![MockSource::ok(Provenance::Subgraph, 1.0) as Arc<dyn MetricSource>],
        );
    }
    let orchestrator = orchestrator_with(builder.build()).await;

    let err = orchestrator.snapshot(ETH_METRICS).await.unwrap_err();
    assert!(matches!(err, StrategyError::ConfigError(_)));
    assert!(!err.is_recoverable());
}

#[tokio::test]
async fn empty_metric_set_is_a_fatal_config_error() {
    let orchestrator = orchestrator_with(MetricRegistry::builder().build()).await;
    let err = orchestrator.snapshot(&[]).await.unwrap_err();
    assert!(matches!(err, StrategyError::ConfigError(_)));
}

#[tokio::test]
async fn per_metric_fallbacks_run_independently() {
    // Metric A: plugin up. Metric B: plugin down, aggregator up. Metric C:
    // everything down. One pass resolves what it can.
    let builder = MetricRegistry::builder()
        .register(
            MetricId::SupplyRateUsdc,
            vec![MockSource::ok(Provenance::Plugin, 2.1) as Arc<dyn MetricSource>],
        )
        .register(
            MetricId::CurvePoolApy,
            vec![
                MockSource::failing(Provenance::Plugin) as Arc<dyn MetricSource>,
                MockSource::ok(Provenance::AggregatorPrimary, 2.8) as Arc<dyn MetricSource>,
            ],
        )
        .register(
            MetricId::GasPrice,
            vec![MockSource::failing(Provenance::AggregatorPrimary) as Arc<dyn MetricSource>],
        );
    let orchestrator = orchestrator_with(builder.build()).await;

    let required = [
        MetricId::SupplyRateUsdc,
        MetricId::CurvePoolApy,
        MetricId::GasPrice,
    ];
    let snapshot = orchestrator.snapshot(&required).await.unwrap();

    assert_eq!(snapshot.provenance(MetricId::SupplyRateUsdc), Provenance::Plugin);
    assert_eq!(
        snapshot.provenance(MetricId::CurvePoolApy),
        Provenance::AggregatorPrimary
    );
    assert_eq!(snapshot.provenance(MetricId::GasPrice), Provenance::Unavailable);
    assert_eq!(snapshot.missing(), &[MetricId::GasPrice]);
}
