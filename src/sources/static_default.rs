//! Static-default adapter: serves a metric's configured default value.
//! Lowest trust, never fails, never touches the network.

use crate::market::{MetricSpec, MetricValue, Provenance};
use crate::sources::{FetchError, MetricSource};
use async_trait::async_trait;
use std::time::Duration;

pub struct StaticSource;

#[async_trait]
impl MetricSource for StaticSource {
    fn name(&self) -> &str {
        "static-default"
    }

    fn provenance(&self) -> Provenance {
        Provenance::StaticDefault
    }

    async fn fetch(
        &self,
        metric: &MetricSpec,
        _timeout: Duration,
    ) -> Result<MetricValue, FetchError> {
        metric
            .default
            .map(MetricValue::Number)
            .ok_or_else(|| {
                FetchError::Unsupported(format!("{}.{}", metric.protocol, metric.key))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::MetricId;

    #[tokio::test]
    async fn serves_the_metric_default() {
        let value = StaticSource
            .fetch(MetricId::StEthApr.spec(), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(value, MetricValue::Number(3.5));
    }

    #[tokio::test]
    async fn metric_without_default_is_unsupported() {
        let err = StaticSource
            .fetch(MetricId::GasPrice.spec(), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Unsupported(_)));
    }
}
