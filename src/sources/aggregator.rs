//! Cross-protocol REST aggregator adapter.
//!
//! Lower trust than protocol-native sources but covers every protocol at
//! once. The same adapter type serves as primary and as fallback, pointed
//! at different hosts.

use crate::market::{MetricClass, MetricId, MetricSpec, MetricValue, Provenance};
use crate::sources::{http_get_json, FetchError, MetricSource};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

/// One row of the aggregator's `/pools` listing.
#[derive(Debug, Clone, Deserialize)]
struct PoolRow {
    project: String,
    symbol: String,
    apy: Option<f64>,

    #[serde(rename = "apyBase")]
    apy_base: Option<f64>,

    #[serde(rename = "apyReward")]
    apy_reward: Option<f64>,

    #[serde(rename = "apyBaseBorrow")]
    apy_base_borrow: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
struct PoolsResponse {
    data: Vec<PoolRow>,
}

/// Which field of a pool row a metric reads.
#[derive(Debug, Clone, Copy)]
enum PoolField {
    Apy,
    Reward,
    BorrowApy,
}

/// (project, symbol, field) lookup for every metric the aggregator serves.
fn pool_lookup(id: MetricId) -> Option<(&'static str, &'static str, PoolField)> {
    match id {
        MetricId::StEthApr => Some(("lido", "STETH", PoolField::Apy)),
        MetricId::SupplyRateStEth => Some(("aave-v3", "WSTETH", PoolField::Apy)),
        MetricId::BorrowRateUsdc => Some(("aave-v3", "USDC", PoolField::BorrowApy)),
        MetricId::SupplyRateUsdc => Some(("aave-v3", "USDC", PoolField::Apy)),
        MetricId::CurvePoolApy => Some(("curve-dex", "3POOL", PoolField::Apy)),
        MetricId::RestakingBoost => Some(("eigenlayer", "ETH", PoolField::Reward)),
        MetricId::ConvexBoost => Some(("convex-finance", "3POOL", PoolField::Reward)),
        MetricId::RestakingTvl | MetricId::GasPrice => None,
    }
}

pub struct AggregatorSource {
    name: String,
    base_url: String,
    provenance: Provenance,
    client: reqwest::Client,
}

impl AggregatorSource {
    /// `provenance` must be one of the two aggregator tiers.
    pub fn new(base_url: &str, provenance: Provenance) -> Self {
        debug_assert!(matches!(
            provenance,
            Provenance::AggregatorPrimary | Provenance::AggregatorFallback
        ));
        let name = match provenance {
            Provenance::AggregatorFallback => "aggregator-fallback",
            _ => "aggregator-primary",
        };
        Self {
            name: name.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            provenance,
            client: crate::sources::http_client(),
        }
    }

    async fn fetch_tvl(
        &self,
        metric: &MetricSpec,
        timeout: Duration,
    ) -> Result<MetricValue, FetchError> {
        let url = format!("{}/tvl/{}", self.base_url, metric.protocol);
        let doc = http_get_json(&self.client, &url, timeout).await?;
        let tvl = doc
            .as_f64()
            .ok_or_else(|| FetchError::Malformed(format!("expected bare TVL number, got {}", doc)))?;
        Ok(MetricValue::Number(tvl))
    }

    async fn fetch_pool_rate(
        &self,
        metric: &MetricSpec,
        timeout: Duration,
    ) -> Result<MetricValue, FetchError> {
        let (project, symbol, field) = pool_lookup(metric.id).ok_or_else(|| {
            FetchError::Unsupported(format!("{}.{}", metric.protocol, metric.key))
        })?;

        let url = format!("{}/pools", self.base_url);
        let doc = http_get_json(&self.client, &url, timeout).await?;
        let pools: PoolsResponse = serde_json::from_value(doc)
            .map_err(|e| FetchError::Malformed(format!("pools listing: {}", e)))?;

        let row = pools
            .data
            .iter()
            .find(|row| row.project == project && row.symbol.eq_ignore_ascii_case(symbol))
            .ok_or_else(|| {
                FetchError::MissingField(format!("pool {}/{} not listed", project, symbol))
            })?;

        let value = match field {
            PoolField::Apy => row.apy.or(row.apy_base),
            PoolField::Reward => row.apy_reward,
            PoolField::BorrowApy => row.apy_base_borrow,
        };
        value
            .map(MetricValue::Number)
            .ok_or_else(|| FetchError::MissingField(format!("{:?} for {}/{}", field, project, symbol)))
    }
}

#[async_trait]
impl MetricSource for AggregatorSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn provenance(&self) -> Provenance {
        self.provenance
    }

    async fn fetch(
        &self,
        metric: &MetricSpec,
        timeout: Duration,
    ) -> Result<MetricValue, FetchError> {
        match metric.class {
            MetricClass::Tvl => self.fetch_tvl(metric, timeout).await,
            MetricClass::Rate => self.fetch_pool_rate(metric, timeout).await,
            MetricClass::Gas => Err(FetchError::Unsupported(format!(
                "{}.{}",
                metric.protocol, metric.key
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::MetricId;

    #[test]
    fn every_rate_metric_has_a_pool_mapping() {
        for id in [
            MetricId::StEthApr,
            MetricId::SupplyRateStEth,
            MetricId::BorrowRateUsdc,
            MetricId::SupplyRateUsdc,
            MetricId::CurvePoolApy,
            MetricId::RestakingBoost,
            MetricId::ConvexBoost,
        ] {
            assert!(pool_lookup(id).is_some(), "no pool mapping for {}", id);
        }
        assert!(pool_lookup(MetricId::GasPrice).is_none());
    }

    #[tokio::test]
    async fn gas_is_not_served_by_the_aggregator() {
        let source = AggregatorSource::new("http://127.0.0.1:0", Provenance::AggregatorPrimary);
        let err = source
            .fetch(MetricId::GasPrice.spec(), Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Unsupported(_)));
    }

    #[test]
    fn tier_names_follow_provenance() {
        let primary = AggregatorSource::new("http://a", Provenance::AggregatorPrimary);
        let fallback = AggregatorSource::new("http://b", Provenance::AggregatorFallback);
        assert_eq!(primary.name(), "aggregator-primary");
        assert_eq!(fallback.name(), "aggregator-fallback");
    }
}
