//! Global error types for SupportBot.
//!
//! All error categories across the workspace are unified into a single
//! `SbError` enum with conversions from underlying library errors.

use thiserror::Error;

/// Convenience type alias for Results using SbError.
pub type SbResult<T> = Result<T, SbError>;

/// Unified error type covering all error categories in SupportBot.
#[derive(Error, Debug)]
pub enum SbError {
    // -- Configuration errors --
    /// Failed to load or parse application configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// A required configuration value is missing.
    #[error("missing configuration: {0}")]
    MissingConfig(String),

    /// An address or endpoint could not be turned into a valid URL.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    // -- Network errors --
    /// HTTP request failed.
    #[error("http error: {0}")]
    Http(String),

    /// HTTP request timed out.
    #[error("request timeout: {0}")]
    Timeout(String),

    /// WebSocket transport error (handshake, read or write).
    #[error("socket error: {0}")]
    Socket(String),

    /// Backend returned an error response.
    #[error("server error (status {status}): {message}")]
    ServerError {
        /// HTTP status code.
        status: u16,
        /// Error message from the backend.
        message: String,
    },

    /// Authentication failed or the session token expired.
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    // -- Input errors --
    /// A user-supplied value was rejected before reaching the backend.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    // -- File/IO errors --
    /// File system operation failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    // -- Generic --
    /// An unexpected internal error.
    #[error("internal error: {0}")]
    Internal(String),

    /// Wrapping anyhow errors for interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<serde_json::Error> for SbError {
    fn from(e: serde_json::Error) -> Self {
        SbError::Serialization(e.to_string())
    }
}

impl From<toml::de::Error> for SbError {
    fn from(e: toml::de::Error) -> Self {
        SbError::Config(e.to_string())
    }
}

impl From<toml::ser::Error> for SbError {
    fn from(e: toml::ser::Error) -> Self {
        SbError::Config(format!("failed to serialize config: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sb_error_display() {
        let err = SbError::Config("bad value".to_string());
        assert_eq!(err.to_string(), "configuration error: bad value");

        let err = SbError::ServerError {
            status: 503,
            message: "maintenance".into(),
        };
        assert_eq!(err.to_string(), "server error (status 503): maintenance");
    }

    #[test]
    fn test_json_error_conversion() {
        let err: SbError = serde_json::from_str::<serde_json::Value>("{not json")
            .unwrap_err()
            .into();
        assert!(matches!(err, SbError::Serialization(_)));
    }
}
