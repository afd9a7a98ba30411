//! Error types for the PSN gateway

use std::io;

use thiserror::Error;

/// Result type alias for the PSN gateway
pub type Result<T> = std::result::Result<T, Error>;

/// PSN gateway errors
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Failure reported by the PlayStation Network (token exchange or data
    /// operation). Displayed verbatim: this text is echoed to callers as
    /// `details`.
    #[error("{0}")]
    Upstream(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an upstream error
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_message_is_displayed_verbatim() {
        let err = Error::upstream("Invalid NPSSO");
        assert_eq!(err.to_string(), "Invalid NPSSO");
    }

    #[test]
    fn config_error_is_prefixed() {
        let err = Error::Config("bad port".to_string());
        assert_eq!(err.to_string(), "Configuration error: bad port");
    }
}
