//! Domain types for market-data resolution: metric identities, resolved
//! values, provenance tags and the per-request snapshot.

pub mod snapshot;

pub use snapshot::Snapshot;

use serde::{Deserialize, Serialize};
use std::fmt;

/// One named fact the system resolves from external sources.
///
/// The metric set is closed: every route predicate and provider lookup is
/// keyed by one of these identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MetricId {
    /// lido: stETH staking APR, the ETH base rate
    StEthApr,
    /// aave: supply APR for stETH posted as collateral
    SupplyRateStEth,
    /// aave: variable borrow APR for USDC
    BorrowRateUsdc,
    /// aave: supply APR for USDC
    SupplyRateUsdc,
    /// curve: 3pool APY
    CurvePoolApy,
    /// eigenlayer: restaking boost APR on top of the base rate
    RestakingBoost,
    /// eigenlayer: protocol TVL in USD
    RestakingTvl,
    /// convex: boosted reward APR on staked LP positions
    ConvexBoost,
    /// network: average gas price in gwei
    GasPrice,
}

/// Cache-TTL class of a metric. Gas moves fast, TVL barely moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricClass {
    Gas,
    Rate,
    Tvl,
}

impl MetricClass {
    /// Class name as used in TTL configuration keys.
    pub fn name(self) -> &'static str {
        match self {
            MetricClass::Gas => "gas",
            MetricClass::Rate => "rate",
            MetricClass::Tvl => "tvl",
        }
    }
}

/// Static description of a metric: where it lives and how it behaves.
#[derive(Debug, Clone, Copy)]
pub struct MetricSpec {
    pub id: MetricId,
    /// Protocol namespace, also the middle segment of the cache key.
    pub protocol: &'static str,
    /// Metric key within the protocol namespace.
    pub key: &'static str,
    pub class: MetricClass,
    /// Value served by a static-default adapter, if the metric has one.
    pub default: Option<f64>,
}

impl MetricId {
    pub fn spec(self) -> &'static MetricSpec {
        match self {
            MetricId::StEthApr => &MetricSpec {
                id: MetricId::StEthApr,
                protocol: "lido",
                key: "stethApr",
                class: MetricClass::Rate,
                default: Some(3.5),
            },
            MetricId::SupplyRateStEth => &MetricSpec {
                id: MetricId::SupplyRateStEth,
                protocol: "aave",
                key: "supplyRate.stETH",
                class: MetricClass::Rate,
                default: None,
            },
            MetricId::BorrowRateUsdc => &MetricSpec {
                id: MetricId::BorrowRateUsdc,
                protocol: "aave",
                key: "borrowRate.USDC",
                class: MetricClass::Rate,
                default: None,
            },
            MetricId::SupplyRateUsdc => &MetricSpec {
                id: MetricId::SupplyRateUsdc,
                protocol: "aave",
                key: "supplyRate.USDC",
                class: MetricClass::Rate,
                default: Some(2.1),
            },
            MetricId::CurvePoolApy => &MetricSpec {
                id: MetricId::CurvePoolApy,
                protocol: "curve",
                key: "threePool.apy",
                class: MetricClass::Rate,
                default: None,
            },
            MetricId::RestakingBoost => &MetricSpec {
                id: MetricId::RestakingBoost,
                protocol: "eigenlayer",
                key: "restakingBoost",
                class: MetricClass::Rate,
                default: None,
            },
            MetricId::RestakingTvl => &MetricSpec {
                id: MetricId::RestakingTvl,
                protocol: "eigenlayer",
                key: "tvl",
                class: MetricClass::Tvl,
                default: None,
            },
            MetricId::ConvexBoost => &MetricSpec {
                id: MetricId::ConvexBoost,
                protocol: "convex",
                key: "boostApr",
                class: MetricClass::Rate,
                default: None,
            },
            MetricId::GasPrice => &MetricSpec {
                id: MetricId::GasPrice,
                protocol: "gas",
                key: "average",
                class: MetricClass::Gas,
                default: None,
            },
        }
    }
}

impl fmt::Display for MetricId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let spec = self.spec();
        write!(f, "{}.{}", spec.protocol, spec.key)
    }
}

/// A resolved metric value. Providers report rates as percentages and TVL as
/// USD; a handful of providers return labels rather than numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Number(f64),
    Text(String),
}

impl MetricValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetricValue::Number(n) => Some(*n),
            MetricValue::Text(s) => s.trim().parse::<f64>().ok(),
        }
    }
}

impl From<f64> for MetricValue {
    fn from(n: f64) -> Self {
        MetricValue::Number(n)
    }
}

/// Which source actually supplied a metric's value, ordered by trust.
///
/// `Ord` follows declaration order, so `Plugin` compares greatest and
/// `Unavailable` least.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provenance {
    Unavailable,
    StaticDefault,
    AggregatorFallback,
    AggregatorPrimary,
    Subgraph,
    Plugin,
}

impl Provenance {
    pub fn is_live(self) -> bool {
        matches!(
            self,
            Provenance::Plugin
                | Provenance::Subgraph
                | Provenance::AggregatorPrimary
                | Provenance::AggregatorFallback
        )
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Provenance::Unavailable => "unavailable",
            Provenance::StaticDefault => "static-default",
            Provenance::AggregatorFallback => "aggregator-fallback",
            Provenance::AggregatorPrimary => "aggregator-primary",
            Provenance::Subgraph => "subgraph",
            Provenance::Plugin => "plugin",
        };
        f.write_str(s)
    }
}

/// Outcome of resolving one metric through its fallback chain.
///
/// Invariant: `provenance != Unavailable` implies `value` is present, and
/// the constructors are the only way to build one.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub metric: MetricId,
    pub value: Option<MetricValue>,
    pub provenance: Provenance,
    /// Name of the adapter that supplied the value, for diagnostics.
    pub source: Option<String>,
}

impl Resolved {
    pub fn hit(metric: MetricId, value: MetricValue, provenance: Provenance, source: &str) -> Self {
        debug_assert!(provenance != Provenance::Unavailable);
        Self {
            metric,
            value: Some(value),
            provenance,
            source: Some(source.to_string()),
        }
    }

    pub fn unavailable(metric: MetricId) -> Self {
        Self {
            metric,
            value: None,
            provenance: Provenance::Unavailable,
            source: None,
        }
    }
}

/// Asset classes the route engine distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetClass {
    Eth,
    Stable,
}

impl AssetClass {
    /// Classify a user-supplied asset symbol. Unknown symbols are an input
    /// error, handled by the caller.
    pub fn classify(symbol: &str) -> Option<AssetClass> {
        match symbol.to_ascii_uppercase().as_str() {
            "ETH" | "WETH" | "STETH" => Some(AssetClass::Eth),
            "USDC" | "USDT" | "DAI" => Some(AssetClass::Stable),
            _ => None,
        }
    }
}

/// User risk tier. `lower` steps down one template when a route collapses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl RiskTier {
    pub fn lower(self) -> Option<RiskTier> {
        match self {
            RiskTier::High => Some(RiskTier::Medium),
            RiskTier::Medium => Some(RiskTier::Low),
            RiskTier::Low => None,
        }
    }

    pub fn parse(s: &str) -> Option<RiskTier> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Some(RiskTier::Low),
            "medium" | "med" => Some(RiskTier::Medium),
            "high" => Some(RiskTier::High),
            _ => None,
        }
    }
}
