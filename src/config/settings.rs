use crate::error::StrategyError;
use std::collections::HashMap;
use std::env;
use url::Url;

/// Threshold constants driving route construction. These are empirically
/// chosen values carried over as configuration rather than re-derived.
#[derive(Debug, Clone)]
pub struct RouteThresholds {
    /// Max variable borrow APR (pct) for the medium-risk borrow leg.
    pub borrow_rate_max_medium_pct: f64,
    /// Max variable borrow APR (pct) for the high-risk borrow leg.
    pub borrow_rate_max_high_pct: f64,
    /// How much the pool APY must beat the plain lend rate by (pct points)
    /// before the stable route prefers the pool deposit.
    pub curve_margin_pct: f64,
    /// Minimum restaking-protocol TVL (USD) before the high-risk route will
    /// touch it.
    pub restaking_tvl_floor_usd: f64,
    /// Position size (asset units) one transaction batch covers; larger
    /// amounts scale the gas estimate.
    pub eth_batch_size: f64,
    pub stable_batch_size: f64,
}

impl Default for RouteThresholds {
    fn default() -> Self {
        Self {
            borrow_rate_max_medium_pct: 3.0,
            borrow_rate_max_high_pct: 3.5,
            curve_margin_pct: 0.0,
            restaking_tvl_floor_usd: 1.0e9,
            eth_batch_size: 500.0,
            stable_batch_size: 1_000_000.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub cache_enabled: bool,
    /// Backing store URL. `memory://` selects the in-process backend.
    pub redis_url: String,
    /// Leading segment of every cache key.
    pub cache_namespace: String,
    pub cache_default_ttl_secs: u64,
    /// Per-metric-class TTL overrides, keyed by class name (gas/rate/tvl).
    pub metric_ttl_secs: Option<HashMap<String, u64>>,
    pub fetch_timeout_ms: u64,
    pub lido_api_url: String,
    pub lido_subgraph_url: String,
    pub aave_subgraph_url: String,
    pub aggregator_url: String,
    pub aggregator_fallback_url: Option<String>,
    pub gas_oracle_url: String,
    pub gas_oracle_fallback_url: Option<String>,
    /// Per-protocol adapter ordering, e.g. "lido:plugin|subgraph|aggregator|static".
    pub adapter_order: Option<HashMap<String, Vec<String>>>,
    /// Reference ETH price used to express gas costs in USD.
    pub eth_price_usd: f64,
    pub thresholds: RouteThresholds,
}

impl Config {
    pub fn from_env() -> Self {
        Config {
            cache_enabled: env::var("CACHE_ENABLED")
                .unwrap_or_else(|_| "true".to_string())
                .parse()
                .unwrap_or(true),
            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),
            cache_namespace: env::var("CACHE_NAMESPACE").unwrap_or_else(|_| "ymx".to_string()),
            cache_default_ttl_secs: env::var("CACHE_DEFAULT_TTL_SECS")
                .unwrap_or_else(|_| "120".to_string())
                .parse()
                .unwrap_or(120),
            metric_ttl_secs: env::var("METRIC_TTL_SECS").ok().map(|s| {
                s.split(',')
                    .filter_map(|part| {
                        let mut kv = part.split(':');
                        let key = kv.next()?.trim().to_string();
                        let value = kv.next()?.trim().parse::<u64>().ok()?;
                        Some((key, value))
                    })
                    .collect()
            }),
            fetch_timeout_ms: env::var("FETCH_TIMEOUT_MS")
                .unwrap_or_else(|_| "2500".to_string())
                .parse()
                .unwrap_or(2500),
            lido_api_url: env::var("LIDO_API_URL")
                .unwrap_or_else(|_| "https://eth-api.lido.fi".to_string()),
            lido_subgraph_url: env::var("LIDO_SUBGRAPH_URL").unwrap_or_else(|_| {
                "https://api.thegraph.com/subgraphs/name/lidofinance/lido".to_string()
            }),
            aave_subgraph_url: env::var("AAVE_SUBGRAPH_URL").unwrap_or_else(|_| {
                "https://api.thegraph.com/subgraphs/name/aave/protocol-v3".to_string()
            }),
            aggregator_url: env::var("AGGREGATOR_URL")
                .unwrap_or_else(|_| "https://yields.llama.fi".to_string()),
            aggregator_fallback_url: env::var("AGGREGATOR_FALLBACK_URL").ok(),
            gas_oracle_url: env::var("GAS_ORACLE_URL").unwrap_or_else(|_| {
                "https://api.etherscan.io/api?module=gastracker&action=gasoracle".to_string()
            }),
            gas_oracle_fallback_url: Some(
                env::var("GAS_ORACLE_FALLBACK_URL").unwrap_or_else(|_| {
                    "https://beaconcha.in/api/v1/execution/gasnow".to_string()
                }),
            ),
            adapter_order: env::var("ADAPTER_ORDER").ok().map(|s| {
                s.split(',')
                    .filter_map(|part| {
                        let mut kv = part.split(':');
                        let protocol = kv.next()?.trim().to_string();
                        let order = kv
                            .next()?
                            .split('|')
                            .map(|a| a.trim().to_string())
                            .filter(|a| !a.is_empty())
                            .collect::<Vec<_>>();
                        Some((protocol, order))
                    })
                    .collect()
            }),
            eth_price_usd: env::var("ETH_PRICE_USD")
                .unwrap_or_else(|_| "3000.0".to_string())
                .parse()
                .unwrap_or(3000.0),
            thresholds: RouteThresholds {
                borrow_rate_max_medium_pct: env::var("BORROW_RATE_MAX_MEDIUM_PCT")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(3.0),
                borrow_rate_max_high_pct: env::var("BORROW_RATE_MAX_HIGH_PCT")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(3.5),
                curve_margin_pct: env::var("CURVE_MARGIN_PCT")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(0.0),
                restaking_tvl_floor_usd: env::var("RESTAKING_TVL_FLOOR_USD")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(1.0e9),
                eth_batch_size: env::var("ETH_BATCH_SIZE")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(500.0),
                stable_batch_size: env::var("STABLE_BATCH_SIZE")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(1_000_000.0),
            },
        }
    }

    /// Checks the invariants the rest of the pipeline assumes. A failure
    /// here is the fatal-configuration error class: the only one that aborts
    /// a whole request.
    pub fn validate(&self) -> Result<(), StrategyError> {
        if self.fetch_timeout_ms == 0 {
            return Err(StrategyError::ConfigError(
                "FETCH_TIMEOUT_MS must be positive".to_string(),
            ));
        }
        if self.cache_default_ttl_secs == 0 {
            return Err(StrategyError::ConfigError(
                "CACHE_DEFAULT_TTL_SECS must be positive".to_string(),
            ));
        }
        if let Some(ttls) = &self.metric_ttl_secs {
            if let Some((class, _)) = ttls.iter().find(|(_, secs)| **secs == 0) {
                return Err(StrategyError::ConfigError(format!(
                    "TTL override for class '{}' must be positive",
                    class
                )));
            }
        }
        for (name, value) in [
            ("AGGREGATOR_URL", Some(&self.aggregator_url)),
            ("GAS_ORACLE_URL", Some(&self.gas_oracle_url)),
            ("LIDO_API_URL", Some(&self.lido_api_url)),
            ("LIDO_SUBGRAPH_URL", Some(&self.lido_subgraph_url)),
            ("AAVE_SUBGRAPH_URL", Some(&self.aave_subgraph_url)),
            ("AGGREGATOR_FALLBACK_URL", self.aggregator_fallback_url.as_ref()),
            (
                "GAS_ORACLE_FALLBACK_URL",
                self.gas_oracle_fallback_url.as_ref(),
            ),
        ] {
            if let Some(value) = value {
                Url::parse(value).map_err(|e| {
                    StrategyError::ConfigError(format!("{} is not a valid URL: {}", name, e))
                })?;
            }
        }
        if let Some(order) = &self.adapter_order {
            if let Some((protocol, _)) = order.iter().find(|(_, chain)| chain.is_empty()) {
                return Err(StrategyError::ConfigError(format!(
                    "adapter order for protocol '{}' is empty",
                    protocol
                )));
            }
        }
        if self.eth_price_usd <= 0.0 {
            return Err(StrategyError::ConfigError(
                "ETH_PRICE_USD must be positive".to_string(),
            ));
        }
        let th = &self.thresholds;
        if th.eth_batch_size <= 0.0 || th.stable_batch_size <= 0.0 {
            return Err(StrategyError::ConfigError(
                "batch sizes must be positive".to_string(),
            ));
        }
        log::info!("Configuration validated: {:?}", self);
        Ok(())
    }

    /// TTL for a metric-class name, falling back to the cache default.
    pub fn ttl_for_class(&self, class: &str) -> u64 {
        self.metric_ttl_secs
            .as_ref()
            .and_then(|m| m.get(class).copied())
            .unwrap_or(self.cache_default_ttl_secs)
    }

    /// A deterministic config for tests: caching in-process, no live hosts.
    pub fn test_default() -> Self {
        Config {
            cache_enabled: true,
            redis_url: "memory://".to_string(),
            cache_namespace: "ymx-test".to_string(),
            cache_default_ttl_secs: 60,
            metric_ttl_secs: Some(HashMap::from([
                ("gas".to_string(), 15),
                ("rate".to_string(), 120),
                ("tvl".to_string(), 600),
            ])),
            fetch_timeout_ms: 250,
            lido_api_url: "http://127.0.0.1:0".to_string(),
            lido_subgraph_url: "http://127.0.0.1:0".to_string(),
            aave_subgraph_url: "http://127.0.0.1:0".to_string(),
            aggregator_url: "http://127.0.0.1:0".to_string(),
            aggregator_fallback_url: None,
            gas_oracle_url: "http://127.0.0.1:0".to_string(),
            gas_oracle_fallback_url: None,
            adapter_order: None,
            eth_price_usd: 3000.0,
            thresholds: RouteThresholds::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_validates() {
        assert!(Config::test_default().validate().is_ok());
    }

    #[test]
    fn zero_timeout_is_fatal() {
        let mut cfg = Config::test_default();
        cfg.fetch_timeout_ms = 0;
        assert!(matches!(
            cfg.validate(),
            Err(StrategyError::ConfigError(_))
        ));
    }

    #[test]
    fn malformed_endpoint_is_fatal() {
        let mut cfg = Config::test_default();
        cfg.aggregator_url = "not a url".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn ttl_class_override_applies() {
        let cfg = Config::test_default();
        assert_eq!(cfg.ttl_for_class("gas"), 15);
        assert_eq!(cfg.ttl_for_class("tvl"), 600);
        assert_eq!(cfg.ttl_for_class("unknown"), 60);
    }

    #[test]
    fn empty_adapter_order_is_fatal() {
        let mut cfg = Config::test_default();
        cfg.adapter_order = Some(HashMap::from([("lido".to_string(), vec![])]));
        assert!(cfg.validate().is_err());
    }
}
