//! Route construction and yield/risk evaluation over a resolved snapshot.

pub mod calculator;
pub mod engine;
pub mod route;
pub mod types;

pub use engine::StrategyEngine;
pub use route::{build_route, Route};
pub use types::{StrategyRequest, StrategyResult};
