//! Route construction: an ordered decision table of threshold predicates
//! per (asset class, risk tier), evaluated against one snapshot.
//!
//! Replaces nested conditional route-building with data: each template is a
//! fixed-order list of step rules, each rule gated by predicates over
//! snapshot values. A template that collapses below its minimum step count
//! falls back to the next-lower risk tier's template.

use crate::config::RouteThresholds;
use crate::market::{AssetClass, MetricId, RiskTier, Snapshot};
use std::collections::HashSet;

/// One step of a constructed route, carrying the cost model inputs the
/// calculator consumes.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteStep {
    pub label: String,
    /// Gas units this step's transaction consumes; 0 for the input step.
    pub gas_units: u64,
    /// Flat protocol fee in percentage points deducted from the gross rate.
    pub fee_pct: f64,
    pub contribution: Option<Contribution>,
}

/// How a step enters the rate calculation. Weight is the fraction of the
/// principal the rate applies to (borrow legs run at partial LTV).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Contribution {
    Earn { metric: MetricId, weight: f64 },
    Borrow { metric: MetricId, weight: f64 },
}

/// Ordered, non-empty sequence of steps. The first step is always the
/// user's input asset. Built once per (snapshot, request) and never
/// mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub steps: Vec<RouteStep>,
}

impl Route {
    pub fn labels(&self) -> Vec<String> {
        self.steps.iter().map(|s| s.label.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Threshold test over snapshot values.
#[derive(Debug, Clone)]
enum Predicate {
    /// Metric resolved and strictly positive.
    Positive(MetricId),
    /// Metric resolved to any numeric value.
    Available(MetricId),
    /// Metric resolved and strictly below the threshold.
    Below(MetricId, f64),
    /// Metric resolved and at least the threshold.
    AtLeast(MetricId, f64),
    /// Left metric resolved and beats the right metric by at least
    /// `margin` percentage points; an unresolved right side counts as 0.
    BeatsBy(MetricId, MetricId, f64),
}

impl Predicate {
    fn holds(&self, snap: &Snapshot) -> bool {
        match *self {
            Predicate::Positive(id) => snap.number(id).map(|v| v > 0.0).unwrap_or(false),
            Predicate::Available(id) => snap.number(id).is_some(),
            Predicate::Below(id, max) => snap.number(id).map(|v| v < max).unwrap_or(false),
            Predicate::AtLeast(id, min) => snap.number(id).map(|v| v >= min).unwrap_or(false),
            Predicate::BeatsBy(a, b, margin) => match snap.number(a) {
                Some(left) => left > snap.number(b).unwrap_or(0.0) + margin,
                None => false,
            },
        }
    }
}

struct StepRule {
    label: &'static str,
    gas_units: u64,
    fee_pct: f64,
    contribution: Option<Contribution>,
    /// Label of a step that must already be in the route. Encodes
    /// leg dependencies (no borrow without collateral).
    requires: Option<&'static str>,
    predicates: Vec<Predicate>,
}

struct RouteTemplate {
    /// Minimum route length (input step included) for the template to
    /// stand; shorter outcomes fall back a tier.
    min_steps: usize,
    rules: Vec<StepRule>,
}

const STAKE: &str = "stETH";
const RESTAKE: &str = "eigenlayer-restake";
const SUPPLY_COLLATERAL: &str = "aave-supply-stETH";
const BORROW_STABLE: &str = "aave-borrow-USDC";
const LEND_STABLE: &str = "aave-supply-USDC";
const CURVE_POOL: &str = "curve-3pool";
const CONVEX_STAKE: &str = "convex-stake";

fn stake_rule() -> StepRule {
    StepRule {
        label: STAKE,
        gas_units: 90_000,
        fee_pct: 0.1,
        contribution: Some(Contribution::Earn {
            metric: MetricId::StEthApr,
            weight: 1.0,
        }),
        requires: None,
        predicates: vec![Predicate::Positive(MetricId::StEthApr)],
    }
}

fn supply_collateral_rule(requires: &'static str) -> StepRule {
    StepRule {
        label: SUPPLY_COLLATERAL,
        gas_units: 140_000,
        fee_pct: 0.0,
        contribution: Some(Contribution::Earn {
            metric: MetricId::SupplyRateStEth,
            weight: 1.0,
        }),
        requires: Some(requires),
        predicates: vec![Predicate::Available(MetricId::SupplyRateStEth)],
    }
}

fn borrow_rule(max_rate_pct: f64) -> StepRule {
    StepRule {
        label: BORROW_STABLE,
        gas_units: 160_000,
        fee_pct: 0.0,
        contribution: Some(Contribution::Borrow {
            metric: MetricId::BorrowRateUsdc,
            weight: 0.5,
        }),
        requires: Some(SUPPLY_COLLATERAL),
        predicates: vec![Predicate::Below(MetricId::BorrowRateUsdc, max_rate_pct)],
    }
}

fn redeploy_rule() -> StepRule {
    StepRule {
        label: LEND_STABLE,
        gas_units: 140_000,
        fee_pct: 0.0,
        contribution: Some(Contribution::Earn {
            metric: MetricId::SupplyRateUsdc,
            weight: 0.5,
        }),
        requires: Some(BORROW_STABLE),
        predicates: vec![Predicate::Positive(MetricId::SupplyRateUsdc)],
    }
}

fn curve_rule(margin_pct: f64) -> StepRule {
    StepRule {
        label: CURVE_POOL,
        gas_units: 180_000,
        fee_pct: 0.05,
        contribution: Some(Contribution::Earn {
            metric: MetricId::CurvePoolApy,
            weight: 1.0,
        }),
        requires: None,
        predicates: vec![
            Predicate::Available(MetricId::CurvePoolApy),
            Predicate::BeatsBy(MetricId::CurvePoolApy, MetricId::SupplyRateUsdc, margin_pct),
        ],
    }
}

fn template(asset: AssetClass, tier: RiskTier, th: &RouteThresholds) -> RouteTemplate {
    match (asset, tier) {
        (AssetClass::Eth, RiskTier::Low) => RouteTemplate {
            min_steps: 1,
            rules: vec![stake_rule()],
        },
        (AssetClass::Eth, RiskTier::Medium) => RouteTemplate {
            min_steps: 4,
            rules: vec![
                stake_rule(),
                supply_collateral_rule(STAKE),
                borrow_rule(th.borrow_rate_max_medium_pct),
                redeploy_rule(),
            ],
        },
        (AssetClass::Eth, RiskTier::High) => RouteTemplate {
            min_steps: 5,
            rules: vec![
                stake_rule(),
                StepRule {
                    label: RESTAKE,
                    gas_units: 120_000,
                    fee_pct: 0.05,
                    contribution: Some(Contribution::Earn {
                        metric: MetricId::RestakingBoost,
                        weight: 1.0,
                    }),
                    requires: Some(STAKE),
                    predicates: vec![
                        Predicate::Available(MetricId::RestakingBoost),
                        Predicate::AtLeast(MetricId::RestakingTvl, th.restaking_tvl_floor_usd),
                    ],
                },
                // The high-risk loop is the restaked position; without the
                // boost the whole leverage leg is dropped and the route
                // collapses to the medium template.
                supply_collateral_rule(RESTAKE),
                borrow_rule(th.borrow_rate_max_high_pct),
                redeploy_rule(),
            ],
        },
        (AssetClass::Stable, RiskTier::Low) => RouteTemplate {
            min_steps: 1,
            rules: vec![StepRule {
                label: LEND_STABLE,
                gas_units: 120_000,
                fee_pct: 0.0,
                contribution: Some(Contribution::Earn {
                    metric: MetricId::SupplyRateUsdc,
                    weight: 1.0,
                }),
                requires: None,
                predicates: vec![Predicate::Positive(MetricId::SupplyRateUsdc)],
            }],
        },
        (AssetClass::Stable, RiskTier::Medium) => RouteTemplate {
            min_steps: 2,
            rules: vec![curve_rule(th.curve_margin_pct)],
        },
        (AssetClass::Stable, RiskTier::High) => RouteTemplate {
            min_steps: 3,
            rules: vec![
                curve_rule(th.curve_margin_pct),
                StepRule {
                    label: CONVEX_STAKE,
                    gas_units: 150_000,
                    fee_pct: 0.1,
                    contribution: Some(Contribution::Earn {
                        metric: MetricId::ConvexBoost,
                        weight: 1.0,
                    }),
                    requires: Some(CURVE_POOL),
                    predicates: vec![Predicate::Available(MetricId::ConvexBoost)],
                },
            ],
        },
    }
}

/// Apply one template to a snapshot: evaluate rules in fixed order,
/// appending the step for every rule whose predicates (and prerequisite)
/// hold.
fn apply_template(input_label: &str, tpl: &RouteTemplate, snap: &Snapshot) -> Route {
    let mut steps = vec![RouteStep {
        label: input_label.to_string(),
        gas_units: 0,
        fee_pct: 0.0,
        contribution: None,
    }];
    let mut included: HashSet<&str> = HashSet::new();

    for rule in &tpl.rules {
        if let Some(req) = rule.requires {
            if !included.contains(req) {
                continue;
            }
        }
        if rule.predicates.iter().all(|p| p.holds(snap)) {
            steps.push(RouteStep {
                label: rule.label.to_string(),
                gas_units: rule.gas_units,
                fee_pct: rule.fee_pct,
                contribution: rule.contribution,
            });
            included.insert(rule.label);
        }
    }

    Route { steps }
}

/// Construct the route for one request. Deterministic: the same snapshot
/// and inputs always produce the same step sequence. Returns the route and
/// the risk tier of the template it actually matched.
pub fn build_route(
    input_label: &str,
    asset: AssetClass,
    requested: RiskTier,
    snap: &Snapshot,
    th: &RouteThresholds,
) -> (Route, RiskTier) {
    let mut tier = requested;
    loop {
        let tpl = template(asset, tier, th);
        let route = apply_template(input_label, &tpl, snap);
        if route.len() >= tpl.min_steps {
            return (route, tier);
        }
        match tier.lower() {
            Some(lower) => tier = lower,
            // Low is the floor; whatever qualified stands, even the
            // trivial input-only route.
            None => return (route, tier),
        }
    }
}
