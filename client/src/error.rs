use std::time::Duration;

use reqwest::Method;
use thiserror::Error;

/// Failure of a single API call.
///
/// Every variant records the HTTP method and the full URL that was called.
/// Use [`RequestError::is_retryable`] to decide whether trying again could
/// succeed.
#[derive(Debug, Error)]
pub enum RequestError {
    /// The request never produced an HTTP response (connection refused,
    /// timeout, TLS failure, body read error).
    #[error("Request to {method} {url} failed. Exception while making request: {source}")]
    Transport {
        method: Method,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server rejected the call because a rate limit was exceeded.
    #[error("Request to {method} {url} failed. Exceeded rate limit")]
    RateLimitExceeded {
        method: Method,
        url: String,
        /// Time to wait before the next attempt, when the server said.
        retry_after: Option<Duration>,
    },

    /// A 4xx response other than 429. Retrying will not help.
    #[error(
        "Request to {method} {url} failed. Unexpected response code: {status}. Response body: {body}"
    )]
    NonRetryable {
        method: Method,
        url: String,
        status: u16,
        body: String,
    },

    /// Any other unsuccessful response code. A retry may succeed.
    #[error(
        "Request to {method} {url} failed. Unexpected response code: {status}. Response body: {body}"
    )]
    Retryable {
        method: Method,
        url: String,
        status: u16,
        body: String,
    },

    /// The call succeeded but the body did not match the expected model.
    #[error("Request to {method} {url} failed. Could not decode response body: {source}")]
    InvalidResponse {
        method: Method,
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Request to {method} {url} failed. Invalid URL: {source}")]
    InvalidUrl {
        method: Method,
        url: String,
        #[source]
        source: url::ParseError,
    },
}

impl RequestError {
    #[must_use]
    pub fn method(&self) -> &Method {
        match self {
            Self::Transport { method, .. }
            | Self::RateLimitExceeded { method, .. }
            | Self::NonRetryable { method, .. }
            | Self::Retryable { method, .. }
            | Self::InvalidResponse { method, .. }
            | Self::InvalidUrl { method, .. } => method,
        }
    }

    #[must_use]
    pub fn url(&self) -> &str {
        match self {
            Self::Transport { url, .. }
            | Self::RateLimitExceeded { url, .. }
            | Self::NonRetryable { url, .. }
            | Self::Retryable { url, .. }
            | Self::InvalidResponse { url, .. }
            | Self::InvalidUrl { url, .. } => url,
        }
    }

    /// HTTP status of the response, if one was received.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RateLimitExceeded { .. } => Some(429),
            Self::NonRetryable { status, .. } | Self::Retryable { status, .. } => Some(*status),
            Self::Transport { .. }
            | Self::InvalidResponse { .. }
            | Self::InvalidUrl { .. } => None,
        }
    }

    /// Whether a later attempt of the same call might succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. } | Self::RateLimitExceeded { .. } | Self::Retryable { .. }
        )
    }

    #[must_use]
    pub const fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimitExceeded { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}
