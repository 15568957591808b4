//! Transport-level errors of the HTTP connector.

use sn_core::FetchError;
use thiserror::Error;

/// Errors that can occur in the connector.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectorError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Unexpected status: HTTP {status}")]
    HttpStatus { status: u16 },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for connector operations.
pub type ConnectorResult<T> = Result<T, ConnectorError>;

impl From<ConnectorError> for FetchError {
    fn from(error: ConnectorError) -> Self {
        match error {
            ConnectorError::HttpStatus { status } => FetchError::ServerError { status },
            ConnectorError::InvalidResponse(msg) => FetchError::MalformedResponse(msg),
            ConnectorError::ConnectionFailed(msg)
            | ConnectorError::RequestFailed(msg)
            | ConnectorError::Timeout(msg)
            | ConnectorError::ConfigError(msg) => FetchError::NetworkUnavailable(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert_eq!(
            FetchError::from(ConnectorError::HttpStatus { status: 404 }),
            FetchError::ServerError { status: 404 }
        );
        assert!(matches!(
            FetchError::from(ConnectorError::InvalidResponse("eof".into())),
            FetchError::MalformedResponse(_)
        ));
        assert!(matches!(
            FetchError::from(ConnectorError::Timeout("30s".into())),
            FetchError::NetworkUnavailable(_)
        ));
        assert!(matches!(
            FetchError::from(ConnectorError::ConnectionFailed("refused".into())),
            FetchError::NetworkUnavailable(_)
        ));
    }
}
