//! Gas-price oracles: a primary service with a documented secondary
//! fallback, mirroring the backup-endpoint scheme used for RPC providers.

use crate::market::{MetricId, MetricSpec, MetricValue, Provenance};
use crate::sources::{http_get_json, number_at, FetchError, MetricSource};
use async_trait::async_trait;
use std::time::Duration;

/// One gas-price HTTP service. The payload shape differs per provider, so
/// each instance carries its own JSON pointer and unit scale (values are
/// normalized to gwei).
pub struct GasOracleSource {
    name: String,
    url: String,
    pointer: String,
    scale: f64,
    provenance: Provenance,
    client: reqwest::Client,
}

impl GasOracleSource {
    pub fn new(name: &str, url: &str, pointer: &str, scale: f64, provenance: Provenance) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            pointer: pointer.to_string(),
            scale,
            provenance,
            client: crate::sources::http_client(),
        }
    }

    /// Etherscan-style gas tracker, gwei as numeric strings.
    pub fn etherscan(url: &str) -> Self {
        Self::new(
            "gas-oracle-primary",
            url,
            "/result/ProposeGasPrice",
            1.0,
            Provenance::AggregatorPrimary,
        )
    }

    /// GasNow-style tracker, wei as integers.
    pub fn gasnow(url: &str) -> Self {
        Self::new(
            "gas-oracle-fallback",
            url,
            "/data/standard",
            1e-9,
            Provenance::AggregatorFallback,
        )
    }
}

#[async_trait]
impl MetricSource for GasOracleSource {
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
        if metric.id != MetricId::GasPrice {
            return Err(FetchError::Unsupported(format!(
                "{}.{}",
                metric.protocol, metric.key
            )));
        }
        let doc = http_get_json(&self.client, &self.url, timeout).await?;
        let gwei = number_at(&doc, &self.pointer)? * self.scale;
        if !gwei.is_finite() || gwei < 0.0 {
            return Err(FetchError::Malformed(format!(
                "implausible gas price {} gwei from {}",
                gwei, self.name
            )));
        }
        Ok(MetricValue::Number(gwei))
    }
}
