//! Protocol plugins: first-party protocol APIs, the highest-trust source.
//!
//! A plugin serves only the metrics of its own protocol namespace and is
//! registered under that namespace. A protocol without an installed plugin
//! simply has no plugin entry in its fallback chain.

use crate::market::{MetricSpec, MetricValue, Provenance};
use crate::sources::{http_get_json, number_at, FetchError, MetricSource};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
struct PluginEndpoint {
    url: String,
    pointer: String,
    scale: f64,
}

/// A plugin backed by a JSON-over-HTTP protocol API. Each served metric key
/// maps to an endpoint plus a JSON pointer into its payload.
pub struct JsonApiPlugin {
    protocol: String,
    name: String,
    client: reqwest::Client,
    endpoints: HashMap<String, PluginEndpoint>,
}

impl JsonApiPlugin {
    pub fn new(protocol: &str, name: &str) -> Self {
        Self {
            protocol: protocol.to_string(),
            name: name.to_string(),
            client: crate::sources::http_client(),
            endpoints: HashMap::new(),
        }
    }

    pub fn with_endpoint(mut self, metric_key: &str, url: &str, pointer: &str, scale: f64) -> Self {
        self.endpoints.insert(
            metric_key.to_string(),
            PluginEndpoint {
                url: url.to_string(),
                pointer: pointer.to_string(),
                scale,
            },
        );
        self
    }

    /// The Lido protocol plugin: last reported stETH APR from the official
    /// protocol API.
    pub fn lido(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self::new("lido", "lido-api").with_endpoint(
            "stethApr",
            &format!("{}/v1/protocol/steth/apr/last", base),
            "/data/apr",
            1.0,
        )
    }
}

#[async_trait]
impl MetricSource for JsonApiPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn provenance(&self) -> Provenance {
        Provenance::Plugin
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
        let endpoint = self.endpoints.get(metric.key).ok_or_else(|| {
            FetchError::Unsupported(format!("{}.{}", metric.protocol, metric.key))
        })?;

        let doc = http_get_json(&self.client, &endpoint.url, timeout).await?;
        let value = number_at(&doc, &endpoint.pointer)? * endpoint.scale;
        Ok(MetricValue::Number(value))
    }
}

/// Installed plugins, keyed by protocol namespace.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: HashMap<String, Arc<dyn MetricSource>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, protocol: &str, plugin: Arc<dyn MetricSource>) {
        self.plugins.insert(protocol.to_string(), plugin);
    }

    pub fn get(&self, protocol: &str) -> Option<Arc<dyn MetricSource>> {
        self.plugins.get(protocol).cloned()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}
