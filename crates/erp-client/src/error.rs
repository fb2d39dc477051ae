//! Error types for the ERP client crate.

use thiserror::Error;

/// Result type alias for ERP client operations.
pub type Result<T> = std::result::Result<T, ErpClientError>;

/// Retry policy class for ERP API failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErpRetryClass {
    Retryable,
    Permanent,
    ReauthRequired,
}

/// Errors that can occur while talking to the external ERP system.
#[derive(Debug, Error)]
pub enum ErpClientError {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// API error response from the ERP system
    #[error("ERP API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Invalid request (missing required data, etc.)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Authentication error (missing credentials or ERP rejection)
    #[error("Authentication error: {0}")]
    Auth(String),
}

impl ErpClientError {
    /// Create an API error from status and message
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create an invalid request error
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Create an auth error
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth(message.into())
    }

    /// HTTP status if this is an API error.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Classify error for retry policy.
    pub fn retry_class(&self) -> ErpRetryClass {
        match self {
            Self::Api { status, .. } => match *status {
                401 | 403 => ErpRetryClass::ReauthRequired,
                408 | 409 | 423 | 425 | 429 => ErpRetryClass::Retryable,
                500..=599 => ErpRetryClass::Retryable,
                _ => ErpRetryClass::Permanent,
            },
            Self::Http(_) => ErpRetryClass::Retryable,
            Self::Json(_) => ErpRetryClass::Permanent,
            Self::InvalidRequest(_) => ErpRetryClass::Permanent,
            Self::Auth(_) => ErpRetryClass::ReauthRequired,
        }
    }
}
