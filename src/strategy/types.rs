use crate::market::{MetricId, Provenance, RiskTier};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

/// One user request, as handed over by the (out-of-scope) front end.
#[derive(Debug, Clone)]
pub struct StrategyRequest {
    /// Asset symbol, e.g. "ETH" or "USDC".
    pub asset: String,
    /// Position size in units of the input asset.
    pub amount: f64,
    pub risk_tolerance: RiskTier,
    /// Max acceptable gas spend in USD; exceeding it only warns.
    pub gas_budget_usd: f64,
    pub time_horizon_days: u32,
}

/// The externally observable output: the route, its economics, and an
/// explicit account of which inputs were live data versus fallbacks.
/// Immutable once returned.
#[derive(Debug, Clone, Serialize)]
pub struct StrategyResult {
    /// Ordered step labels; the first is always the input asset.
    pub route: Vec<String>,
    /// Risk tier of the template the route actually matched (may be lower
    /// than requested after a collapse fallback).
    pub matched_risk: RiskTier,
    pub gross_rate_pct: f64,
    pub net_rate_pct: f64,
    pub gas_cost_usd: f64,
    /// 0–10.
    pub risk_score: f64,
    /// Absolute return over the requested horizon, in input-asset units.
    pub projected_return: f64,
    pub warnings: Vec<String>,
    pub provenance: HashMap<MetricId, Provenance>,
    pub snapshot_id: Uuid,
    pub created_at: DateTime<Utc>,
}
