//! Source adapters: the polymorphic units a metric can be fetched from.
//!
//! Adapters are stateless and safe for concurrent reuse across requests.
//! Every network-backed adapter enforces the caller-supplied timeout and
//! maps transport errors, bad statuses and malformed payloads to a typed
//! [`FetchError`] so nothing propagates unclassified.

pub mod aggregator;
pub mod gas;
pub mod plugin;
pub mod static_default;
pub mod subgraph;

pub use aggregator::AggregatorSource;
pub use gas::GasOracleSource;
pub use plugin::{JsonApiPlugin, PluginRegistry};
pub use static_default::StaticSource;
pub use subgraph::SubgraphSource;

use crate::market::{MetricSpec, MetricValue, Provenance};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use std::time::Duration;
use thiserror::Error;

/// One connection pool shared by every adapter; `reqwest::Client` clones
/// are handles onto it.
static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(reqwest::Client::new);

pub(crate) fn http_client() -> reqwest::Client {
    HTTP_CLIENT.clone()
}

/// Typed failure of one fetch attempt. The fallback resolver treats every
/// variant the same way: log it and advance to the next adapter.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("transport: {0}")]
    Transport(String),

    #[error("unexpected HTTP status {0}")]
    Status(u16),

    #[error("malformed payload: {0}")]
    Malformed(String),

    #[error("missing field `{0}` in payload")]
    MissingField(String),

    #[error("source does not serve metric {0}")]
    Unsupported(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            // The precise budget is reported by the caller-level timeout;
            // this covers reqwest's own connect timeout.
            FetchError::Timeout(Duration::ZERO)
        } else if let Some(status) = e.status() {
            FetchError::Status(status.as_u16())
        } else if e.is_decode() {
            FetchError::Malformed(e.to_string())
        } else {
            FetchError::Transport(e.to_string())
        }
    }
}

/// Capability set of one metric source.
#[async_trait]
pub trait MetricSource: Send + Sync {
    /// Diagnostic name, e.g. "lido-api" or "aggregator-primary".
    fn name(&self) -> &str;

    /// Trust tier this source's values are tagged with.
    fn provenance(&self) -> Provenance;

    /// Fetch one metric, bounded by `timeout`. Exceeding the timeout is a
    /// provider failure, never a request-level cancellation.
    async fn fetch(&self, metric: &MetricSpec, timeout: Duration)
        -> Result<MetricValue, FetchError>;
}

/// GET a JSON document with an explicit deadline.
pub(crate) async fn http_get_json(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
) -> Result<serde_json::Value, FetchError> {
    let fut = async {
        let resp = client.get(url).send().await?;
        if !resp.status().is_success() {
            return Err(FetchError::Status(resp.status().as_u16()));
        }
        let body = resp.json::<serde_json::Value>().await?;
        Ok(body)
    };
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::Timeout(timeout)),
    }
}

/// POST a JSON body and read a JSON document back, with an explicit deadline.
pub(crate) async fn http_post_json(
    client: &reqwest::Client,
    url: &str,
    body: &serde_json::Value,
    timeout: Duration,
) -> Result<serde_json::Value, FetchError> {
    let fut = async {
        let resp = client.post(url).json(body).send().await?;
        if !resp.status().is_success() {
            return Err(FetchError::Status(resp.status().as_u16()));
        }
        let doc = resp.json::<serde_json::Value>().await?;
        Ok(doc)
    };
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::Timeout(timeout)),
    }
}

/// Pull a numeric field out of a JSON document by pointer, accepting both
/// number and numeric-string encodings (providers disagree on this).
pub(crate) fn number_at(doc: &serde_json::Value, pointer: &str) -> Result<f64, FetchError> {
    let field = doc
        .pointer(pointer)
        .ok_or_else(|| FetchError::MissingField(pointer.to_string()))?;
    match field {
        serde_json::Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| FetchError::Malformed(format!("non-finite number at {}", pointer))),
        serde_json::Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| FetchError::Malformed(format!("non-numeric string at {}", pointer))),
        other => Err(FetchError::Malformed(format!(
            "expected number at {}, got {}",
            pointer, other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn number_at_accepts_numbers_and_numeric_strings() {
        let doc = json!({"result": {"ProposeGasPrice": "25.4"}, "apr": 3.8});
        assert_eq!(number_at(&doc, "/apr").unwrap(), 3.8);
        assert_eq!(number_at(&doc, "/result/ProposeGasPrice").unwrap(), 25.4);
    }

    #[test]
    fn number_at_classifies_failures() {
        let doc = json!({"apr": "fast", "nested": {"list": [1]}});
        assert!(matches!(
            number_at(&doc, "/missing"),
            Err(FetchError::MissingField(_))
        ));
        assert!(matches!(
            number_at(&doc, "/apr"),
            Err(FetchError::Malformed(_))
        ));
        assert!(matches!(
            number_at(&doc, "/nested/list"),
            Err(FetchError::Malformed(_))
        ));
    }
}
