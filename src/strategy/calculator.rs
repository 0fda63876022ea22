//! Yield, cost and risk evaluation of a constructed route.
//!
//! Only steps actually present in the route enter the math: gross rate is
//! the sum of the route's earn contributions, net subtracts per-step fees
//! and the borrow legs' costs, gas cost is priced from the snapshot (or
//! the documented static constant when both gas oracles were down).

use crate::config::RouteThresholds;
use crate::market::{AssetClass, MetricId, RiskTier, Snapshot};
use crate::strategy::route::{Contribution, Route};
use crate::strategy::types::StrategyRequest;

/// Gas price applied when `gas.average` resolved as unavailable.
pub const FALLBACK_GAS_PRICE_GWEI: f64 = 30.0;

const GWEI_PER_ETH: f64 = 1e9;

/// Full account of one route evaluation, with a human-oriented explanation
/// line for the log.
#[derive(Debug, Clone)]
pub struct YieldBreakdown {
    pub gross_rate_pct: f64,
    pub net_rate_pct: f64,
    pub fee_pct: f64,
    pub borrow_cost_pct: f64,
    pub gas_cost_usd: f64,
    pub gas_price_gwei: f64,
    pub gas_price_is_fallback: bool,
    pub risk_score: f64,
    pub projected_return: f64,
    pub explanation: String,
}

/// Fixed per-template risk constant; qualitative leverage/complexity of
/// the matched template, not a per-request derivation.
pub fn risk_score(asset: AssetClass, tier: RiskTier) -> f64 {
    match (asset, tier) {
        (AssetClass::Eth, RiskTier::Low) => 2.0,
        (AssetClass::Eth, RiskTier::Medium) => 5.0,
        (AssetClass::Eth, RiskTier::High) => 7.5,
        (AssetClass::Stable, RiskTier::Low) => 1.0,
        (AssetClass::Stable, RiskTier::Medium) => 3.5,
        (AssetClass::Stable, RiskTier::High) => 6.0,
    }
}

/// Transaction-batching multiplier: positions beyond one batch re-run the
/// route's transactions. Zero and sub-batch amounts count as one batch.
pub fn amount_scaling(amount: f64, batch_size: f64) -> f64 {
    if amount <= 0.0 || batch_size <= 0.0 {
        return 1.0;
    }
    (amount / batch_size).ceil().max(1.0)
}

pub fn evaluate(
    route: &Route,
    asset: AssetClass,
    matched_tier: RiskTier,
    snap: &Snapshot,
    request: &StrategyRequest,
    eth_price_usd: f64,
    thresholds: &RouteThresholds,
) -> YieldBreakdown {
    let mut gross = 0.0;
    let mut borrow_cost = 0.0;
    let mut fees = 0.0;
    let mut gas_units: u64 = 0;

    for step in &route.steps {
        match step.contribution {
            Some(Contribution::Earn { metric, weight }) => {
                gross += weight * snap.number(metric).unwrap_or(0.0);
            }
            Some(Contribution::Borrow { metric, weight }) => {
                borrow_cost += weight * snap.number(metric).unwrap_or(0.0);
            }
            None => {}
        }
        fees += step.fee_pct;
        gas_units += step.gas_units;
    }

    let net = gross - fees - borrow_cost;

    let (gas_price_gwei, gas_price_is_fallback) = match snap.number(MetricId::GasPrice) {
        Some(gwei) => (gwei, false),
        None => (FALLBACK_GAS_PRICE_GWEI, true),
    };
    let batch_size = match asset {
        AssetClass::Eth => thresholds.eth_batch_size,
        AssetClass::Stable => thresholds.stable_batch_size,
    };
    let scaling = amount_scaling(request.amount, batch_size);
    let gas_cost_usd =
        gas_units as f64 * gas_price_gwei / GWEI_PER_ETH * eth_price_usd * scaling;

    let projected_return =
        request.amount * (net / 100.0) * (request.time_horizon_days as f64 / 365.0);

    let risk = risk_score(asset, matched_tier).clamp(0.0, 10.0);

    let mut explanation = format!(
        "Route: {}, Gross: {:.2}%, Fees: {:.2}pp, Borrow cost: {:.2}pp, Net: {:.2}%, Gas: ${:.2} @ {:.1} gwei",
        route.labels().join(" -> "),
        gross,
        fees,
        borrow_cost,
        net,
        gas_cost_usd,
        gas_price_gwei,
    );
    if gas_price_is_fallback {
        explanation.push_str(" [STATIC GAS FALLBACK]");
    }

    YieldBreakdown {
        gross_rate_pct: gross,
        net_rate_pct: net,
        fee_pct: fees,
        borrow_cost_pct: borrow_cost,
        gas_cost_usd,
        gas_price_gwei,
        gas_price_is_fallback,
        risk_score: risk,
        projected_return,
        explanation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::Provenance;
    use crate::strategy::route::build_route;
    use assert_approx_eq::assert_approx_eq;

    fn request(amount: f64, days: u32) -> StrategyRequest {
        StrategyRequest {
            asset: "ETH".to_string(),
            amount,
            risk_tolerance: RiskTier::Low,
            gas_budget_usd: 100.0,
            time_horizon_days: days,
        }
    }

    #[test]
    fn low_risk_staking_nets_the_fee() {
        let snap = Snapshot::from_values(&[(MetricId::StEthApr, 3.8)], Provenance::Plugin);
        let th = RouteThresholds::default();
        let (route, tier) = build_route("ETH", AssetClass::Eth, RiskTier::Low, &snap, &th);

        let breakdown = evaluate(
            &route,
            AssetClass::Eth,
            tier,
            &snap,
            &request(10.0, 365),
            3000.0,
            &th,
        );

        assert_approx_eq!(breakdown.gross_rate_pct, 3.8, 1e-9);
        assert_approx_eq!(breakdown.net_rate_pct, 3.7, 1e-9);
        assert_approx_eq!(breakdown.risk_score, 2.0, 1e-9);
        // 10 ETH for a year at 3.7%.
        assert_approx_eq!(breakdown.projected_return, 0.37, 1e-9);
    }

    #[test]
    fn borrow_leg_costs_reduce_the_net_rate() {
        let snap = Snapshot::from_values(
            &[
                (MetricId::StEthApr, 3.8),
                (MetricId::SupplyRateStEth, 0.3),
                (MetricId::BorrowRateUsdc, 2.5),
                (MetricId::SupplyRateUsdc, 2.1),
            ],
            Provenance::Subgraph,
        );
        let th = RouteThresholds::default();
        let (route, tier) = build_route("ETH", AssetClass::Eth, RiskTier::Medium, &snap, &th);
        let breakdown = evaluate(
            &route,
            AssetClass::Eth,
            tier,
            &snap,
            &request(10.0, 365),
            3000.0,
            &th,
        );

        // gross = 3.8 + 0.3 + 0.5 * 2.1, borrow = 0.5 * 2.5, fee = 0.1
        assert_approx_eq!(breakdown.gross_rate_pct, 5.15, 1e-9);
        assert_approx_eq!(breakdown.borrow_cost_pct, 1.25, 1e-9);
        assert_approx_eq!(breakdown.net_rate_pct, 3.8, 1e-9);
        assert_approx_eq!(breakdown.risk_score, 5.0, 1e-9);
    }

    #[test]
    fn missing_gas_price_uses_the_static_constant() {
        let snap = Snapshot::from_values(&[(MetricId::StEthApr, 3.8)], Provenance::Plugin);
        let th = RouteThresholds::default();
        let (route, tier) = build_route("ETH", AssetClass::Eth, RiskTier::Low, &snap, &th);
        let breakdown = evaluate(
            &route,
            AssetClass::Eth,
            tier,
            &snap,
            &request(10.0, 30),
            3000.0,
            &th,
        );

        assert!(breakdown.gas_price_is_fallback);
        assert_approx_eq!(breakdown.gas_price_gwei, FALLBACK_GAS_PRICE_GWEI, 1e-9);
        // 90k gas units at 30 gwei, ETH at $3000.
        assert_approx_eq!(breakdown.gas_cost_usd, 8.1, 1e-9);
        assert!(breakdown.explanation.contains("[STATIC GAS FALLBACK]"));
    }

    #[test]
    fn zero_amount_is_valid_and_returns_zero() {
        let snap = Snapshot::from_values(&[(MetricId::StEthApr, 3.8)], Provenance::Plugin);
        let th = RouteThresholds::default();
        let (route, tier) = build_route("ETH", AssetClass::Eth, RiskTier::Low, &snap, &th);
        let breakdown = evaluate(
            &route,
            AssetClass::Eth,
            tier,
            &snap,
            &request(0.0, 365),
            3000.0,
            &th,
        );

        assert!(route.len() >= 2);
        assert_approx_eq!(breakdown.projected_return, 0.0, 1e-12);
        assert!(breakdown.gas_cost_usd.is_finite());
    }

    #[test]
    fn large_amounts_scale_the_gas_estimate() {
        assert_approx_eq!(amount_scaling(0.0, 500.0), 1.0, 1e-12);
        assert_approx_eq!(amount_scaling(499.0, 500.0), 1.0, 1e-12);
        assert_approx_eq!(amount_scaling(500.0, 500.0), 1.0, 1e-12);
        assert_approx_eq!(amount_scaling(501.0, 500.0), 2.0, 1e-12);
        assert_approx_eq!(amount_scaling(2400.0, 500.0), 5.0, 1e-12);
    }

    #[test]
    fn horizon_scales_the_absolute_return() {
        let snap = Snapshot::from_values(&[(MetricId::StEthApr, 3.8)], Provenance::Plugin);
        let th = RouteThresholds::default();
        let (route, tier) = build_route("ETH", AssetClass::Eth, RiskTier::Low, &snap, &th);
        let breakdown = evaluate(
            &route,
            AssetClass::Eth,
            tier,
            &snap,
            &request(100.0, 73), // one fifth of a year
            3000.0,
            &th,
        );
        assert_approx_eq!(breakdown.projected_return, 100.0 * 0.037 / 5.0, 1e-9);
    }
}
