// src/registry.rs
//! Metric registry: which metrics a request needs, and the ordered adapter
//! chain each metric resolves through.

use crate::config::Config;
use crate::error::StrategyError;
use crate::market::{AssetClass, MetricId, Provenance};
use crate::sources::{
    AggregatorSource, GasOracleSource, JsonApiPlugin, MetricSource, PluginRegistry, StaticSource,
    SubgraphSource,
};
use log::warn;
use std::collections::HashMap;
use std::sync::Arc;

/// Metrics the orchestrator resolves for an ETH-denominated request.
pub const ETH_METRICS: &[MetricId] = &[
    MetricId::StEthApr,
    MetricId::SupplyRateStEth,
    MetricId::BorrowRateUsdc,
    MetricId::SupplyRateUsdc,
    MetricId::RestakingBoost,
    MetricId::RestakingTvl,
    MetricId::GasPrice,
];

/// Metrics the orchestrator resolves for a stable-denominated request.
pub const STABLE_METRICS: &[MetricId] = &[
    MetricId::SupplyRateUsdc,
    MetricId::CurvePoolApy,
    MetricId::ConvexBoost,
    MetricId::GasPrice,
];

pub fn required_for(asset: AssetClass) -> &'static [MetricId] {
    match asset {
        AssetClass::Eth => ETH_METRICS,
        AssetClass::Stable => STABLE_METRICS,
    }
}

const DEFAULT_ADAPTER_ORDER: &[&str] = &["plugin", "subgraph", "aggregator", "static"];

pub struct MetricRegistry {
    chains: HashMap<MetricId, Vec<Arc<dyn MetricSource>>>,
}

impl MetricRegistry {
    pub fn builder() -> MetricRegistryBuilder {
        MetricRegistryBuilder {
            chains: HashMap::new(),
        }
    }

    pub fn chain(&self, id: MetricId) -> Option<&[Arc<dyn MetricSource>]> {
        self.chains.get(&id).map(|c| c.as_slice())
    }

    /// The fatal-configuration gate: every required metric must have a
    /// non-empty adapter chain before orchestration may start.
    pub fn validate(&self, required: &[MetricId]) -> Result<(), StrategyError> {
        for id in required {
            match self.chains.get(id) {
                Some(chain) if !chain.is_empty() => {}
                _ => {
                    return Err(StrategyError::ConfigError(format!(
                        "no adapter chain registered for required metric {}",
                        id
                    )));
                }
            }
        }
        Ok(())
    }

    /// Assemble the production registry from configuration: per-protocol
    /// adapter ordering applied over the installed plugins, the configured
    /// subgraphs, the aggregator hosts and the static defaults.
    pub fn build_default(config: &Config, plugins: &PluginRegistry) -> Self {
        let aggregator_primary: Arc<dyn MetricSource> = Arc::new(AggregatorSource::new(
            &config.aggregator_url,
            Provenance::AggregatorPrimary,
        ));
        let aggregator_fallback: Option<Arc<dyn MetricSource>> = config
            .aggregator_fallback_url
            .as_deref()
            .map(|url| {
                Arc::new(AggregatorSource::new(url, Provenance::AggregatorFallback))
                    as Arc<dyn MetricSource>
            });

        let mut subgraphs: HashMap<&'static str, Arc<dyn MetricSource>> = HashMap::new();
        subgraphs.insert(
            "lido",
            Arc::new(SubgraphSource::lido(&config.lido_subgraph_url)),
        );
        subgraphs.insert(
            "aave",
            Arc::new(SubgraphSource::aave(&config.aave_subgraph_url)),
        );

        let static_source: Arc<dyn MetricSource> = Arc::new(StaticSource);

        let mut builder = Self::builder();
        for id in ETH_METRICS.iter().chain(STABLE_METRICS.iter()) {
            let spec = id.spec();
            if builder.chains.contains_key(id) {
                continue;
            }

            // Gas has its own provider pair instead of the generic stack.
            if *id == MetricId::GasPrice {
                let mut chain: Vec<Arc<dyn MetricSource>> =
                    vec![Arc::new(GasOracleSource::etherscan(&config.gas_oracle_url))];
                if let Some(url) = config.gas_oracle_fallback_url.as_deref() {
                    chain.push(Arc::new(GasOracleSource::gasnow(url)));
                }
                builder = builder.register(*id, chain);
                continue;
            }

            let order: Vec<String> = config
                .adapter_order
                .as_ref()
                .and_then(|m| m.get(spec.protocol).cloned())
                .unwrap_or_else(|| {
                    DEFAULT_ADAPTER_ORDER.iter().map(|s| s.to_string()).collect()
                });

            let mut chain: Vec<Arc<dyn MetricSource>> = Vec::new();
            for adapter in &order {
                match adapter.as_str() {
                    "plugin" => {
                        if let Some(plugin) = plugins.get(spec.protocol) {
                            chain.push(plugin);
                        }
                    }
                    "subgraph" => {
                        if let Some(subgraph) = subgraphs.get(spec.protocol) {
                            chain.push(Arc::clone(subgraph));
                        }
                    }
                    "aggregator" => {
                        chain.push(Arc::clone(&aggregator_primary));
                        if let Some(fallback) = &aggregator_fallback {
                            chain.push(Arc::clone(fallback));
                        }
                    }
                    "static" => {
                        if spec.default.is_some() {
                            chain.push(Arc::clone(&static_source));
                        }
                    }
                    other => {
                        warn!(
                            "Unknown adapter '{}' in ordering for protocol '{}', skipping",
                            other, spec.protocol
                        );
                    }
                }
            }
            builder = builder.register(*id, chain);
        }

        builder.build()
    }

    /// The default plugin set: protocol plugins for which the deployment
    /// carries first-party API endpoints.
    pub fn default_plugins(config: &Config) -> PluginRegistry {
        let mut plugins = PluginRegistry::new();
        plugins.register("lido", Arc::new(JsonApiPlugin::lido(&config.lido_api_url)));
        plugins
    }
}

pub struct MetricRegistryBuilder {
    chains: HashMap<MetricId, Vec<Arc<dyn MetricSource>>>,
}

impl MetricRegistryBuilder {
    pub fn register(mut self, id: MetricId, chain: Vec<Arc<dyn MetricSource>>) -> Self {
        self.chains.insert(id, chain);
        self
    }

    pub fn build(self) -> MetricRegistry {
        MetricRegistry {
            chains: self.chains,
        }
    }
}
