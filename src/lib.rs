pub mod cache;
pub mod config;
pub mod error;
pub mod market;
pub mod orchestrator;
pub mod registry;
pub mod resolver;
pub mod sources;
pub mod strategy;
pub mod utils;

// Re-export the types a consumer of the core needs.
pub use cache::Cache;
pub use config::Config;
pub use error::StrategyError;
pub use market::{AssetClass, MetricId, Provenance, RiskTier, Snapshot};
pub use orchestrator::Orchestrator;
pub use registry::MetricRegistry;
pub use resolver::FallbackResolver;
pub use strategy::{StrategyEngine, StrategyRequest, StrategyResult};
