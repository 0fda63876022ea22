//! Protocol-specific GraphQL subgraph adapters.

use crate::market::{MetricSpec, MetricValue, Provenance};
use crate::sources::{http_post_json, number_at, FetchError, MetricSource};
use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone)]
struct SubgraphQuery {
    query: String,
    /// Pointer into the GraphQL response document, including the `/data`
    /// prefix.
    pointer: String,
    scale: f64,
}

/// One protocol's subgraph. Serves the protocol's metrics through canned
/// GraphQL queries.
pub struct SubgraphSource {
    protocol: String,
    name: String,
    endpoint: String,
    client: reqwest::Client,
    queries: HashMap<String, SubgraphQuery>,
}

impl SubgraphSource {
    pub fn new(protocol: &str, name: &str, endpoint: &str) -> Self {
        Self {
            protocol: protocol.to_string(),
            name: name.to_string(),
            endpoint: endpoint.to_string(),
            client: crate::sources::http_client(),
            queries: HashMap::new(),
        }
    }

    pub fn with_query(mut self, metric_key: &str, query: &str, pointer: &str, scale: f64) -> Self {
        self.queries.insert(
            metric_key.to_string(),
            SubgraphQuery {
                query: query.to_string(),
                pointer: pointer.to_string(),
                scale,
            },
        );
        self
    }

    /// Lido subgraph: latest reported APR.
    pub fn lido(endpoint: &str) -> Self {
        Self::new("lido", "lido-subgraph", endpoint).with_query(
            "stethApr",
            "{ totalRewards(first: 1, orderBy: block, orderDirection: desc) { apr } }",
            "/data/totalRewards/0/apr",
            1.0,
        )
    }

    /// Aave v3 subgraph: reserve rates, reported in ray (1e27) and scaled
    /// to percentages.
    pub fn aave(endpoint: &str) -> Self {
        const RAY_TO_PCT: f64 = 1e-25;
        Self::new("aave", "aave-subgraph", endpoint)
            .with_query(
                "supplyRate.stETH",
                "{ reserves(where: { symbol: \"wstETH\" }) { liquidityRate } }",
                "/data/reserves/0/liquidityRate",
                RAY_TO_PCT,
            )
            .with_query(
                "borrowRate.USDC",
                "{ reserves(where: { symbol: \"USDC\" }) { variableBorrowRate } }",
                "/data/reserves/0/variableBorrowRate",
                RAY_TO_PCT,
            )
            .with_query(
                "supplyRate.USDC",
                "{ reserves(where: { symbol: \"USDC\" }) { liquidityRate } }",
                "/data/reserves/0/liquidityRate",
                RAY_TO_PCT,
            )
    }
}

#[async_trait]
impl MetricSource for SubgraphSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn provenance(&self) -> Provenance {
        Provenance::Subgraph
    }

    async fn fetch(
        &self,
        metric: &MetricSpec,
        timeout: Duration,
    ) -> Result<MetricValue, FetchError> {
        if metric.protocol != self.protocol {
            return Err(FetchError::Unsupported(format!(
                "{}.{}",
                metric.protocol, metric.key
            )));
        }
        let canned = self.queries.get(metric.key).ok_or_else(|| {
            FetchError::Unsupported(format!("{}.{}", metric.protocol, metric.key))
        })?;

        let body = json!({ "query": canned.query });
        let doc = http_post_json(&self.client, &self.endpoint, &body, timeout).await?;

        // GraphQL transports errors in-band with a 200 status.
        if let Some(errors) = doc.get("errors") {
            if !errors.is_null() {
                return Err(FetchError::Malformed(format!(
                    "subgraph returned errors: {}",
                    errors
                )));
            }
        }

        let value = number_at(&doc, &canned.pointer)? * canned.scale;
        Ok(MetricValue::Number(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::MetricId;

    #[test]
    fn aave_source_serves_its_reserve_metrics() {
        let source = SubgraphSource::aave("http://127.0.0.1:0");
        assert!(source.queries.contains_key("supplyRate.stETH"));
        assert!(source.queries.contains_key("borrowRate.USDC"));
        assert!(source.queries.contains_key("supplyRate.USDC"));
        assert_eq!(source.provenance(), Provenance::Subgraph);
    }

    #[tokio::test]
    async fn subgraph_rejects_foreign_protocol() {
        let source = SubgraphSource::lido("http://127.0.0.1:0");
        let err = source
            .fetch(MetricId::BorrowRateUsdc.spec(), Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Unsupported(_)));
    }
}
