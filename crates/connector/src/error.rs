//! Error types for the connector gateway client.

use thiserror::Error;

use ledgersync_core::errors::{Error as CoreError, SyncErrorCode};

/// Result type alias for connector operations.
pub type Result<T> = std::result::Result<T, ConnectorError>;

/// Errors that can occur while talking to the connector gateway.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// Transport-level HTTP failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The gateway answered with a non-success status
    #[error("Gateway error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The remote driver/company file is missing or misconfigured on the
    /// gateway side
    #[error("Driver/configuration error: {0}")]
    Driver(String),

    /// A row violated the positional column contract
    #[error("Row decode error: {0}")]
    Decode(String),
}

impl ConnectorError {
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }

    /// Classify into the sync failure taxonomy.
    pub fn sync_error_code(&self) -> SyncErrorCode {
        match self {
            Self::Http(err) if err.is_timeout() => SyncErrorCode::Timeout,
            Self::Http(_) => SyncErrorCode::Connection,
            // 4xx means the gateway is reachable but our request/config is
            // wrong; 5xx means the gateway or the upstream driver fell over.
            Self::Api { status, .. } if *status < 500 => SyncErrorCode::Config,
            Self::Api { .. } => SyncErrorCode::Connection,
            Self::Driver(_) => SyncErrorCode::Config,
            Self::Decode(_) => SyncErrorCode::Data,
        }
    }
}

impl From<ConnectorError> for CoreError {
    fn from(err: ConnectorError) -> Self {
        let message = err.to_string();
        match err.sync_error_code() {
            SyncErrorCode::Timeout => CoreError::Timeout(message),
            SyncErrorCode::Connection => CoreError::Connection(message),
            SyncErrorCode::Config => CoreError::Config(message),
            _ => CoreError::Data(message),
        }
    }
}
