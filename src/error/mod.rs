use thiserror::Error;

/// Crate-level error type.
///
/// Most provider-side failures never surface as this type: the fallback
/// resolver swallows them and degrades to the next source. What remains here
/// is the small set of conditions a request can actually fail on, plus the
/// transport classifications used while a fetch is in flight.
#[derive(Debug, Clone, Error)]
pub enum StrategyError {
    /// Configuration errors. The only class that aborts a whole request.
    #[error("Config Error: {0}")]
    ConfigError(String),

    /// Network/connectivity issues
    #[error("Network Error: {0}")]
    NetworkError(String),

    /// Timeout errors for operations
    #[error("Timeout Error: {0}")]
    TimeoutError(String),

    /// Parsing errors for provider payloads
    #[error("Parse Error: {0}")]
    ParseError(String),

    /// Cache/Redis errors
    #[error("Cache Error: {0}")]
    CacheError(String),

    /// Invalid request parameters
    #[error("Invalid Input: {0}")]
    InvalidInput(String),

    /// Unknown/unclassified errors
    #[error("Unknown Error: {0}")]
    Unknown(String),
}

impl StrategyError {
    /// Whether the surrounding pipeline may recover by degrading to a
    /// fallback value. Configuration and input errors are terminal.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            StrategyError::ConfigError(_) | StrategyError::InvalidInput(_)
        )
    }
}

impl From<reqwest::Error> for StrategyError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            StrategyError::TimeoutError(e.to_string())
        } else if e.is_decode() {
            StrategyError::ParseError(e.to_string())
        } else {
            StrategyError::NetworkError(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_are_not_recoverable() {
        assert!(!StrategyError::ConfigError("empty chain".into()).is_recoverable());
        assert!(!StrategyError::InvalidInput("bad asset".into()).is_recoverable());
        assert!(StrategyError::NetworkError("conn reset".into()).is_recoverable());
        assert!(StrategyError::CacheError("redis down".into()).is_recoverable());
    }
}
