//! REST error taxonomy
//!
//! Every failure mode of a submitted request resolves to exactly one of
//! these variants; throttling (429) is never surfaced, it is retried
//! inside the dispatcher.

use crate::request::Method;

/// Failure of a submitted request
#[derive(Debug, thiserror::Error)]
pub enum RestError {
    /// The request exceeded the configured timeout
    #[error("request timed out: {method} {path}")]
    Timeout { method: Method, path: String },

    /// Transport-level failure (DNS, connect, TLS, mid-body disconnect)
    #[error("network error on {method} {path}: {source}")]
    Network {
        method: Method,
        path: String,
        #[source]
        source: reqwest::Error,
    },

    /// Terminal non-2xx, non-429 response
    #[error("API error {status} on {method} {path}")]
    Api {
        status: u16,
        method: Method,
        path: String,
        /// Raw response body, JSON or not
        body: Vec<u8>,
    },

    /// A 2xx response whose body did not parse as expected
    #[error("failed to decode response from {method} {path}: {source}")]
    Decode {
        method: Method,
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// The dispatcher shut down before this request resolved
    #[error("dispatcher closed before the request resolved")]
    Closed,
}

impl RestError {
    /// HTTP status of a terminal API error
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// API error body decoded as UTF-8, where possible
    #[must_use]
    pub fn api_body_text(&self) -> Option<&str> {
        match self {
            Self::Api { body, .. } => std::str::from_utf8(body).ok(),
            _ => None,
        }
    }
}

/// Result type alias for control-plane operations
pub type RestResult<T> = Result<T, RestError>;
