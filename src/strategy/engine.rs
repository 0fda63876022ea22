//! End-to-end request handling: snapshot, route, economics, warnings.

use crate::config::Config;
use crate::error::StrategyError;
use crate::market::{AssetClass, MetricId};
use crate::orchestrator::Orchestrator;
use crate::registry;
use crate::strategy::calculator::{self, FALLBACK_GAS_PRICE_GWEI};
use crate::strategy::route::build_route;
use crate::strategy::types::{StrategyRequest, StrategyResult};
use log::info;
use std::sync::Arc;

pub struct StrategyEngine {
    orchestrator: Orchestrator,
    config: Arc<Config>,
}

impl StrategyEngine {
    pub fn new(orchestrator: Orchestrator, config: Arc<Config>) -> Self {
        Self {
            orchestrator,
            config,
        }
    }

    fn validate_request(&self, request: &StrategyRequest) -> Result<AssetClass, StrategyError> {
        if !request.amount.is_finite() || request.amount < 0.0 {
            return Err(StrategyError::InvalidInput(format!(
                "amount must be non-negative, got {}",
                request.amount
            )));
        }
        if !request.gas_budget_usd.is_finite() || request.gas_budget_usd < 0.0 {
            return Err(StrategyError::InvalidInput(format!(
                "gas budget must be non-negative, got {}",
                request.gas_budget_usd
            )));
        }
        AssetClass::classify(&request.asset).ok_or_else(|| {
            StrategyError::InvalidInput(format!("unsupported asset '{}'", request.asset))
        })
    }

    /// Serve one request. Always returns a best-effort result with explicit
    /// missing-data warnings; the only failures are invalid input and fatal
    /// configuration problems.
    pub async fn run(&self, request: &StrategyRequest) -> Result<StrategyResult, StrategyError> {
        let asset = self.validate_request(request)?;
        let required = registry::required_for(asset);

        let snapshot = self.orchestrator.snapshot(required).await?;

        let input_label = request.asset.to_ascii_uppercase();
        let (route, matched_tier) = build_route(
            &input_label,
            asset,
            request.risk_tolerance,
            &snapshot,
            &self.config.thresholds,
        );

        let breakdown = calculator::evaluate(
            &route,
            asset,
            matched_tier,
            &snapshot,
            request,
            self.config.eth_price_usd,
            &self.config.thresholds,
        );

        let mut warnings = Vec::new();
        for id in snapshot.missing() {
            if *id == MetricId::GasPrice {
                warnings.push(format!(
                    "gas price unavailable from all providers; estimating at the static {} gwei",
                    FALLBACK_GAS_PRICE_GWEI
                ));
            } else {
                warnings.push(format!("{} unavailable from all sources", id));
            }
        }
        if matched_tier != request.risk_tolerance {
            warnings.push(format!(
                "route collapsed below its minimum step count; applied the {:?} template instead",
                matched_tier
            ));
        }
        if breakdown.gas_cost_usd > request.gas_budget_usd {
            warnings.push(format!(
                "projected gas cost ${:.2} exceeds the declared budget ${:.2}",
                breakdown.gas_cost_usd, request.gas_budget_usd
            ));
        }

        info!("✅ {}", breakdown.explanation);

        Ok(StrategyResult {
            route: route.labels(),
            matched_risk: matched_tier,
            gross_rate_pct: breakdown.gross_rate_pct,
            net_rate_pct: breakdown.net_rate_pct,
            gas_cost_usd: breakdown.gas_cost_usd,
            risk_score: breakdown.risk_score,
            projected_return: breakdown.projected_return,
            warnings,
            provenance: snapshot.provenance_map().clone(),
            snapshot_id: snapshot.id,
            created_at: snapshot.created_at,
        })
    }
}
