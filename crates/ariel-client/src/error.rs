//! Error types for the client library.

use thiserror::Error;

/// Errors that can occur when talking to the Ariel API.
///
/// Transport failures are passed through as they occurred. A non-2xx HTTP
/// status is not an error at this layer; it comes back inside
/// [`ApiResponse`](crate::ApiResponse) for the caller to inspect.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClientError {
    /// Network or HTTP request failure.
    ///
    /// Indicates issues like DNS resolution, connection failures, TLS
    /// handshake failures, or timeouts.
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// Middleware layer error.
    ///
    /// Errors from request/response middleware such as retry logic.
    #[error("Middleware error: {0}")]
    MiddlewareError(#[from] reqwest_middleware::Error),

    /// JSON serialization or deserialization error.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// A request URL could not be built.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A header name or value contains characters HTTP does not allow.
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// Client configuration issue.
    ///
    /// Unreadable certificate, unresolvable host, or incompatible settings.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// I/O failure while preparing a connection.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// Check if this error is potentially retryable.
    ///
    /// Returns `true` for network and middleware errors.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::NetworkError(_) | Self::MiddlewareError(_))
    }

    /// Check if the request ran out of time.
    ///
    /// The retry middleware reports a failed attempt as
    /// `reqwest_middleware::Error::Middleware`, so its cause chain is searched
    /// for the underlying `reqwest::Error`.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::NetworkError(e) => e.is_timeout(),
            Self::MiddlewareError(reqwest_middleware::Error::Reqwest(e)) => e.is_timeout(),
            Self::MiddlewareError(reqwest_middleware::Error::Middleware(e)) => e
                .chain()
                .find_map(|cause| cause.downcast_ref::<reqwest::Error>())
                .is_some_and(reqwest::Error::is_timeout),
            _ => false,
        }
    }
}

impl From<reqwest::header::InvalidHeaderValue> for ClientError {
    fn from(err: reqwest::header::InvalidHeaderValue) -> Self {
        Self::InvalidHeader(err.to_string())
    }
}

impl From<reqwest::header::InvalidHeaderName> for ClientError {
    fn from(err: reqwest::header::InvalidHeaderName) -> Self {
        Self::InvalidHeader(err.to_string())
    }
}
