// src/main.rs
use anyhow::Result;
use log::{info, warn};
use std::env;
use std::sync::Arc;
use std::time::Duration;
use yield_router::{
    cache::Cache,
    config::Config,
    market::RiskTier,
    orchestrator::Orchestrator,
    registry::MetricRegistry,
    resolver::FallbackResolver,
    strategy::{StrategyEngine, StrategyRequest},
    utils::setup_logging,
};

/// Builds one request from the environment. The interactive prompt flow
/// lives in the separate front end; this entry point serves a single
/// parameterized run.
fn request_from_env() -> StrategyRequest {
    StrategyRequest {
        asset: env::var("ASSET").unwrap_or_else(|_| "ETH".to_string()),
        amount: env::var("AMOUNT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10.0),
        risk_tolerance: env::var("RISK_TOLERANCE")
            .ok()
            .and_then(|v| RiskTier::parse(&v))
            .unwrap_or(RiskTier::Medium),
        gas_budget_usd: env::var("GAS_BUDGET_USD")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(50.0),
        time_horizon_days: env::var("TIME_HORIZON_DAYS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(365),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    setup_logging().expect("Failed to initialize logging");
    info!("🚀 Yield router starting...");

    // --- Configuration & cache lifecycle (owned here, injected below) ---
    let config = Arc::new(Config::from_env());
    config.validate()?;

    let cache = Arc::new(Cache::connect(&config).await);
    if !cache.is_enabled() {
        warn!("Running without a cache; every request hits the providers.");
    }

    // --- Wiring: plugins -> registry -> resolver -> orchestrator -> engine ---
    let plugins = MetricRegistry::default_plugins(&config);
    info!("Installed protocol plugins: {}", plugins.len());

    let registry = Arc::new(MetricRegistry::build_default(&config, &plugins));
    let resolver = Arc::new(FallbackResolver::new(Arc::clone(&cache), &config));
    let orchestrator = Orchestrator::new(
        registry,
        resolver,
        Duration::from_millis(config.fetch_timeout_ms),
    );
    let engine = StrategyEngine::new(orchestrator, Arc::clone(&config));

    // --- Serve one request ---
    let request = request_from_env();
    info!(
        "Resolving strategy for {} {} at {:?} risk over {} days",
        request.amount, request.asset, request.risk_tolerance, request.time_horizon_days
    );

    let result = engine.run(&request).await?;

    info!("📊 Route: {}", result.route.join(" -> "));
    info!(
        "   Gross {:.2}% | Net {:.2}% | Risk {:.1}/10 | Gas ${:.2}",
        result.gross_rate_pct, result.net_rate_pct, result.risk_score, result.gas_cost_usd
    );
    info!(
        "   Projected return over {} days: {:.4} {}",
        request.time_horizon_days, result.projected_return, request.asset
    );
    for warning in &result.warnings {
        warn!("⚠️  {}", warning);
    }
    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(())
}
