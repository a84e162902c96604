//! Error types for the envelope gateway

use hyper::StatusCode;

/// Main error type for gateway operations
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Missing or invalid static configuration or asset. Fatal at startup.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Token issuance or refresh failed. The next request retries.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Required request input missing or malformed. Never forwarded upstream.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The e-signature service rejected the call or answered unexpectedly.
    #[error("Remote service error: {message}")]
    Remote {
        status: Option<u16>,
        code: Option<String>,
        message: String,
    },

    /// A remote call exceeded its timeout.
    #[error("Remote service timeout: {0}")]
    RemoteTimeout(String),

    /// The view request named a recipient the envelope does not have.
    #[error("Recipient mismatch: {0}")]
    RecipientMismatch(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Shorthand for a remote failure without a provider error code
    pub fn remote(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Remote {
            status,
            code: None,
            message: message.into(),
        }
    }

    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Auth(_) => StatusCode::BAD_GATEWAY,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Remote { .. } => StatusCode::BAD_GATEWAY,
            Self::RemoteTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::RecipientMismatch(_) => StatusCode::BAD_GATEWAY,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Http(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code for response bodies and log fields
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIGURATION_ERROR",
            Self::Auth(_) => "AUTH_ERROR",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Remote { .. } => "REMOTE_SERVICE_ERROR",
            Self::RemoteTimeout(_) => "REMOTE_SERVICE_TIMEOUT",
            Self::RecipientMismatch(_) => "RECIPIENT_MISMATCH",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Http(_) => "BAD_REQUEST",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// True for every failure that originated at the e-signature service
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            Self::Remote { .. } | Self::RemoteTimeout(_) | Self::RecipientMismatch(_)
        )
    }

    /// Convert to status code and body tuple for HTTP response
    pub fn into_status_code_and_body(self) -> (StatusCode, String) {
        let status = self.status_code();
        let body = self.to_string();
        (status, body)
    }
}

impl From<std::io::Error> for GatewayError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        Self::Http(format!("JSON error: {}", err))
    }
}

impl From<hyper::Error> for GatewayError {
    fn from(err: hyper::Error) -> Self {
        Self::Internal(format!("HTTP error: {}", err))
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::RemoteTimeout(err.to_string())
        } else {
            Self::remote(err.status().map(|s| s.as_u16()), err.to_string())
        }
    }
}

impl From<jsonwebtoken::errors::Error> for GatewayError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Self::Auth(format!("JWT error: {}", err))
    }
}

/// Result type alias for gateway operations
pub type Result<T> = std::result::Result<T, GatewayError>;
