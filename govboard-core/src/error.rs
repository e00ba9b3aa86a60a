/// Structured error types for govboard-core.
///
/// Uses `thiserror` so the sources and store crates can convert their own
/// errors into a single type the reconcilers propagate. The CLI wraps these
/// in `anyhow` for context.
use thiserror::Error;

/// Main error type for sync operations
#[derive(Error, Debug)]
pub enum SyncError {
    /// An external API call failed (Koios, GitHub, npm, ...)
    #[error("source error in {context}: {message}")]
    Source {
        context: String,
        message: String,
        retryable: bool,
    },

    /// The backing store rejected a read or write
    #[error("store error on {table}: {message}")]
    Store { table: String, message: String },

    /// JSON encoding or decoding failed
    #[error("JSON error at {context}: {source}")]
    Json {
        context: String,
        source: serde_json::Error,
    },

    /// Retries were exhausted against a rate-limited service
    #[error("rate limited by {service} after {attempts} attempts")]
    RateLimited { service: String, attempts: u32 },

    /// Configuration error
    #[error("Configuration error: {reason}")]
    Config { reason: String },
}

/// Result type alias for govboard-core operations
pub type Result<T> = std::result::Result<T, SyncError>;

impl SyncError {
    /// Create a source error
    pub fn source(context: impl Into<String>, message: impl Into<String>, retryable: bool) -> Self {
        Self::Source {
            context: context.into(),
            message: message.into(),
            retryable,
        }
    }

    /// Create a store error
    pub fn store(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Store {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Create a JSON error with context
    pub fn json(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Json {
            context: context.into(),
            source,
        }
    }

    /// Create a config error
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    /// Whether retrying the failed operation could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Source { retryable, .. } => *retryable,
            Self::RateLimited { .. } => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SyncError::store("network_totals", "connection refused");
        assert_eq!(
            err.to_string(),
            "store error on network_totals: connection refused"
        );

        let err = SyncError::source("koios /tip", "HTTP 503", true);
        assert!(err.to_string().contains("koios /tip"));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_json_error_not_retryable() {
        let source = serde_json::from_str::<u32>("nope").unwrap_err();
        let err = SyncError::json("totals", source);
        assert!(!err.is_retryable());
        assert!(err.to_string().starts_with("JSON error at totals"));
    }
}
